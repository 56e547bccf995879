//! Request handlers, one module per resource.

pub mod auth;
pub mod blob;
pub mod file;
pub mod folder;
pub mod health;
pub mod notification;
pub mod search;
pub mod share;
pub mod trash;

/// `Content-Disposition` value with the file name made header-safe.
pub(crate) fn content_disposition(kind: &str, file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{kind}; filename=\"{safe}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_escapes_name() {
        assert_eq!(
            content_disposition("attachment", "a\"b\r\n.txt"),
            "attachment; filename=\"a_b__.txt\""
        );
    }
}

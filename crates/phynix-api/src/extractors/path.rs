//! Typed path parameter helpers.

use uuid::Uuid;

use phynix_core::error::AppError;

/// Parses a UUID from a path segment.
pub fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s).map_err(|_| AppError::validation(format!("Invalid UUID: {s}")))
}

#[cfg(test)]
mod tests {
    use phynix_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_parse_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(&id.to_string()).unwrap(), id);
        assert_eq!(parse_uuid("abc").unwrap_err().kind, ErrorKind::Validation);
    }
}

//! Request validation helpers shared by the services.

use uuid::Uuid;
use validator::Validate;

use phynix_core::error::AppError;
use phynix_core::result::AppResult;

/// Run `validator` rules on a request and flatten failures into one message.
pub fn validate_request<T: Validate>(request: &T) -> AppResult<()> {
    request.validate().map_err(|errors| {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let reason = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field} {reason}")
            })
            .collect();
        fields.sort();
        AppError::validation(format!("Invalid request: {}", fields.join(", ")))
    })
}

/// Parse an identifier supplied by a client.
pub fn parse_id(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::validation(format!("Invalid {what} ID: {raw}")))
}

#[cfg(test)]
mod tests {
    use phynix_core::error::ErrorKind;
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Invite {
        #[validate(email(message = "must be a valid email address"))]
        email: String,
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = validate_request(&Invite {
            email: "nope".into(),
        })
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("email must be a valid email address"));
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert_eq!(parse_id("xyz", "folder").unwrap_err().kind, ErrorKind::Validation);
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&format!(" {id} "), "file").unwrap(), id);
    }
}

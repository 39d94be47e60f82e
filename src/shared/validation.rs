//! Validation Utilities

use validator::ValidationErrors;

use super::error::{FieldError, SignalError};

/// Collapse field errors into a single human readable message.
fn summarize(errors: &ValidationErrors) -> String {
    let mut field_errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    field_errors.sort_by(|a, b| a.field.cmp(&b.field));

    field_errors
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| "Validation failed".into())
}

/// Convert validation errors on an inbound payload to a `MalformedEvent`.
pub fn malformed_event(errors: ValidationErrors) -> SignalError {
    SignalError::MalformedEvent(summarize(&errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "roomId is required"))]
        room_id: String,
    }

    #[test]
    fn test_malformed_event_uses_field_message() {
        let errors = Payload {
            room_id: String::new(),
        }
        .validate()
        .unwrap_err();

        assert_eq!(
            malformed_event(errors),
            SignalError::MalformedEvent("roomId is required".into())
        );
    }
}

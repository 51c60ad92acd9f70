use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::{AppError, VALIDATION_FAILED_MESSAGE};
use validator::Validate;

/// Structural validation of a bound payload. Usable on its own, outside the
/// request pipeline.
pub fn validate_body<T: Validate>(value: &T) -> Result<(), AppError> {
    value.validate().map_err(AppError::ValidationError)
}

/// Trim surrounding whitespace from a display name. Blank names fail the
/// same way as any other validation error.
pub fn non_blank_name(value: &str) -> Result<&str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        tracing::info!("Rejecting blank name");
        return Err(AppError::bad_request(VALIDATION_FAILED_MESSAGE));
    }
    Ok(trimmed)
}

/// JSON body extractor that rejects malformed or invalid payloads with 400.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::info!(error = %e, "Request body is not valid JSON for this endpoint");
            AppError::bad_request(VALIDATION_FAILED_MESSAGE)
        })?;

        validate_body(&value)?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::{Credentials, RegisterUserRequest};
    use axum::http::StatusCode;

    #[test]
    fn test_validate_body_accepts_valid_payload() {
        let body = Credentials {
            email: "user@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(validate_body(&body).is_ok());
    }

    #[test]
    fn test_validate_body_rejects_bad_email() {
        let body = RegisterUserRequest {
            username: "u1".to_string(),
            email: "not-an-email".to_string(),
            password: "password123".to_string(),
        };
        let err = validate_body(&body).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_non_blank_name_trims_and_rejects_whitespace() {
        assert_eq!(non_blank_name("  eng ").unwrap(), "eng");

        for blank in ["", "   ", "\t\n"] {
            let err = non_blank_name(blank).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_validate_body_rejects_missing_password() {
        let body = Credentials {
            email: "user@example.com".to_string(),
            password: String::new(),
        };
        assert!(matches!(
            validate_body(&body),
            Err(AppError::ValidationError(_))
        ));
    }
}

use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::RegisterUserRequest;
use crate::models::{NewUser, UserResponse};
use crate::store::with_timeout;
use crate::utils::{hash_password, ValidatedJson};
use crate::AppState;

/// `POST /api/v1/users`
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let password_hash = hash_password(&req.password)?;
    let new_user = NewUser::new(req.username, req.email.trim().to_string(), password_hash);

    let user = with_timeout(
        state.config.store.timeout(),
        state.store.insert_user(&new_user),
    )
    .await
    .map_err(|e| {
        tracing::info!(error = %e, "User registration failed");
        AppError::from(e)
    })?;

    tracing::info!(user_id = user.id, user_uuid = %user.uuid, "User registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

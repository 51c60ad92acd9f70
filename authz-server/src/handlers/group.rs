use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::CreateGroupRequest;
use crate::middleware::CurrentUser;
use crate::models::Group;
use crate::utils::ValidatedJson;
use crate::AppState;

/// `POST /api/v1/users/group`
///
/// The new group is linked to the service and user the caller's token was
/// issued for.
pub async fn create_group(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    let group = state
        .groups
        .create_group_with_links(&req.name, user.service_id, user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(group)))
}

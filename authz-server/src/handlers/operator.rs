use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::dtos::CreateServiceRequest;
use crate::middleware::CurrentUser;
use crate::models::{NewService, ServiceResponse};
use crate::store::with_timeout;
use crate::utils::{non_blank_name, ValidatedJson};
use crate::AppState;

/// `POST /api/operators/service`
///
/// Registers a tenant service. The UUID and API key are generated here and
/// the key is only ever returned in this response.
pub async fn create_service(
    State(state): State<AppState>,
    CurrentUser(operator): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceResponse>), AppError> {
    let new_service = NewService::new(non_blank_name(&req.name)?.to_string());

    let service = with_timeout(
        state.config.store.timeout(),
        state.store.insert_service(&new_service),
    )
    .await?;

    tracing::info!(
        service_id = service.id,
        operator_id = operator.user_id,
        "Service registered"
    );

    Ok((StatusCode::CREATED, Json(ServiceResponse::from(service))))
}

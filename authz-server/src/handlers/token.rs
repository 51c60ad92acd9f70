use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

use crate::dtos::{Credentials, TokenQuery, TokenResponse};
use crate::models::{RequestContext, Scope};
use crate::services::parse_group_id;
use crate::utils::ValidatedJson;
use crate::AppState;

/// `POST /api/v1/token?type=&group_id=`
///
/// Operator tokens need only credentials. User tokens also need the calling
/// service's `Api-Key` header and may be scoped to one group.
pub async fn issue_token(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<TokenQuery>,
    ValidatedJson(credentials): ValidatedJson<Credentials>,
) -> Result<Json<TokenResponse>, AppError> {
    let scope = Scope::from_query(query.scope.as_deref())?;
    let group_id = parse_group_id(query.group_id.as_deref())?;

    let issued = state
        .tokens
        .issue(&ctx, scope, &credentials, group_id)
        .await?;

    Ok(Json(TokenResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires: issued.claims.expires,
    }))
}

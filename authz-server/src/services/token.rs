//! Token engine: issues and verifies HS256 tokens carrying identity and scope
//! claims.
//!
//! Every claim is a string: ids are decimal integers and `expires` is a
//! human-readable timestamp. A token is self-contained; verification only
//! needs the signing secret plus the store lookups that confirm the claimed
//! scope still holds.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::dtos::Credentials;
use crate::models::{AuthUser, RequestContext, Scope, User, OPERATOR_ROLE_ID};
use crate::services::policy::{ClaimedScope, PolicyResolver};
use crate::store::{with_timeout, CredentialStore};
use crate::utils::verify_password;

/// Layout of the `expires` claim, e.g. `2026-10-19 13:00:00.000000000 +0000 UTC`.
pub const EXPIRES_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f %z UTC";

const BEARER_PREFIX: &str = "Bearer ";

const CREDENTIALS_MISMATCH: &str = "Failed to email or password";

/// Claim set as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub user_uuid: String,
    pub expires: String,
    pub role_id: String,
    pub service_id: String,
    #[serde(default = "zero_claim")]
    pub policy_id: String,
}

fn zero_claim() -> String {
    "0".to_string()
}

/// Typed view of a claim set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClaimIds {
    user_id: i64,
    user_uuid: Uuid,
    role_id: i64,
    service_id: i64,
    policy_id: i64,
}

impl TokenClaims {
    fn new(
        user_id: i64,
        user_uuid: Uuid,
        expires: DateTime<Utc>,
        role_id: i64,
        service_id: i64,
        policy_id: i64,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            user_uuid: user_uuid.to_string().to_uppercase(),
            expires: expires.format(EXPIRES_FORMAT).to_string(),
            role_id: role_id.to_string(),
            service_id: service_id.to_string(),
            policy_id: policy_id.to_string(),
        }
    }

    fn ids(&self) -> Option<ClaimIds> {
        let id = |value: &str| value.parse::<i64>().ok().filter(|id| *id >= 0);

        Some(ClaimIds {
            user_id: id(&self.user_id)?,
            user_uuid: Uuid::parse_str(&self.user_uuid).ok()?,
            role_id: id(&self.role_id)?,
            service_id: id(&self.service_id)?,
            policy_id: id(&self.policy_id)?,
        })
    }

    /// `expires` as a timestamp, if it has the expected layout.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_str(&self.expires, EXPIRES_FORMAT)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A freshly signed token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// Strip the `Bearer ` scheme from an `Authorization` header value.
pub fn bearer_token(authorization: &str) -> Result<&str, AppError> {
    match authorization.trim().strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => {
            tracing::info!("Authorization header does not carry a Bearer token");
            Err(AppError::unauthorized("Unauthorized."))
        }
    }
}

/// Parse the `group_id` query value. Empty means no group scoping (0).
pub fn parse_group_id(value: Option<&str>) -> Result<i64, AppError> {
    match value.map(str::trim).unwrap_or("") {
        "" => Ok(0),
        raw => raw
            .parse::<i64>()
            .ok()
            .filter(|id| *id >= 0)
            .ok_or_else(|| AppError::bad_request("Group id is only integer of query parameter")),
    }
}

#[derive(Clone)]
pub struct TokenEngine {
    store: Arc<dyn CredentialStore>,
    resolver: PolicyResolver,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity: Duration,
    enforce_expiry: bool,
    store_timeout: std::time::Duration,
}

impl TokenEngine {
    pub fn new(
        config: &TokenConfig,
        store: Arc<dyn CredentialStore>,
        resolver: PolicyResolver,
        store_timeout: std::time::Duration,
    ) -> Result<Self, AppError> {
        if config.private_key_base64.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Token signing secret is empty"
            )));
        }

        // The configured value is used verbatim as the HMAC secret.
        let secret = config.private_key_base64.as_bytes();

        tracing::info!(
            validity_minutes = config.validity_minutes,
            enforce_expiry = config.enforce_expiry,
            "Token engine initialized with HS256"
        );

        Ok(Self {
            store,
            resolver,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validity: Duration::minutes(config.validity_minutes),
            enforce_expiry: config.enforce_expiry,
            store_timeout,
        })
    }

    /// Issue a token for `credentials` in the given scope.
    ///
    /// Operator tokens carry the operator role and no service or policy.
    /// User tokens carry the service identified by the request's API key and,
    /// when `group_id > 0`, the role and policy the user holds in that group.
    pub async fn issue(
        &self,
        ctx: &RequestContext,
        scope: Scope,
        credentials: &Credentials,
        group_id: i64,
    ) -> Result<IssuedToken, AppError> {
        match scope {
            Scope::Operator => self.issue_operator_token(credentials).await,
            Scope::User => self.issue_user_token(ctx, credentials, group_id).await,
        }
    }

    async fn issue_operator_token(&self, credentials: &Credentials) -> Result<IssuedToken, AppError> {
        let user = self.authenticate(credentials).await?;

        let operator_policy = self.resolver.operator_policy(user.id).await?;
        if operator_policy.is_none() {
            tracing::info!(user_id = user.id, "User holds no operator policy");
            return Err(AppError::bad_request("Can not issue token"));
        }

        let issued = self.sign(user.id, user.uuid, OPERATOR_ROLE_ID, 0, 0)?;
        tracing::info!(user_id = user.id, scope = "operator", "Token issued");
        Ok(issued)
    }

    async fn issue_user_token(
        &self,
        ctx: &RequestContext,
        credentials: &Credentials,
        group_id: i64,
    ) -> Result<IssuedToken, AppError> {
        let api_key = ctx.api_key.as_deref().unwrap_or_default();
        let service = if api_key.is_empty() {
            None
        } else {
            with_timeout(self.store_timeout, self.store.find_service_by_api_key(api_key)).await?
        };
        let service = service.ok_or_else(|| {
            tracing::info!("Api-Key does not match a registered service");
            AppError::bad_request("Not found registered services by Api-Key")
        })?;

        let user = self.authenticate(credentials).await?;

        // No group requested: service-level access only.
        if group_id == 0 {
            let issued = self.sign(user.id, user.uuid, 0, service.id, 0)?;
            tracing::info!(
                user_id = user.id,
                service_id = service.id,
                scope = "user",
                "Token issued"
            );
            return Ok(issued);
        }

        let grant = self.resolver.resolve(user.id, group_id).await?.ok_or_else(|| {
            tracing::info!(user_id = user.id, group_id, "User holds no policy in group");
            AppError::bad_request("Not found policy of the group")
        })?;

        let issued = self.sign(user.id, user.uuid, grant.role_id, service.id, grant.policy_id)?;
        tracing::info!(
            user_id = user.id,
            service_id = service.id,
            group_id,
            policy_id = grant.policy_id,
            scope = "user",
            "Token issued"
        );
        Ok(issued)
    }

    /// Look the user up by email and check the password. Both failures answer
    /// the same way.
    async fn authenticate(&self, credentials: &Credentials) -> Result<User, AppError> {
        let user = with_timeout(
            self.store_timeout,
            self.store.find_user_by_email(&credentials.email),
        )
        .await?;

        match user {
            Some(user) if verify_password(&credentials.password, &user.password) => Ok(user),
            _ => Err(AppError::bad_request(CREDENTIALS_MISMATCH)),
        }
    }

    fn sign(
        &self,
        user_id: i64,
        user_uuid: Uuid,
        role_id: i64,
        service_id: i64,
        policy_id: i64,
    ) -> Result<IssuedToken, AppError> {
        let expires = Utc::now() + self.validity;
        let claims = TokenClaims::new(user_id, user_uuid, expires, role_id, service_id, policy_id);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify the signature and shape of a raw token.
    ///
    /// Returns `None` for a bad signature, a malformed token, or a missing or
    /// non-conforming claim. `expires` is only checked when expiry
    /// enforcement is enabled.
    pub fn parse(&self, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = match decode::<TokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::info!(error = %e, "Failed to parse token");
                return None;
            }
        };

        if claims.ids().is_none() {
            tracing::info!("Token claims have an unexpected shape");
            return None;
        }

        if self.enforce_expiry {
            match claims.expires_at() {
                Some(expires) if expires > Utc::now() => {}
                _ => {
                    tracing::info!("Token is expired or has an unreadable expiry");
                    return None;
                }
            }
        }

        Some(claims)
    }

    /// Verify an `Authorization` header value for an operator endpoint.
    pub async fn verify_operator(&self, authorization: &str) -> Result<AuthUser, AppError> {
        self.verify(Scope::Operator, authorization).await
    }

    /// Verify an `Authorization` header value for a user endpoint.
    pub async fn verify_user(&self, authorization: &str) -> Result<AuthUser, AppError> {
        self.verify(Scope::User, authorization).await
    }

    /// Verify a bearer credential for `scope` and build the request's
    /// authorization record.
    pub async fn verify(&self, scope: Scope, authorization: &str) -> Result<AuthUser, AppError> {
        let token = bearer_token(authorization)?;

        let claims = self
            .parse(token)
            .ok_or_else(|| AppError::unauthorized("Failed to token."))?;
        let ids = claims
            .ids()
            .ok_or_else(|| AppError::unauthorized("Failed to token."))?;

        let claimed = ClaimedScope {
            user_id: ids.user_id,
            role_id: ids.role_id,
            service_id: ids.service_id,
        };
        if !self.resolver.holds(scope, claimed).await? {
            tracing::info!(
                user_id = ids.user_id,
                scope = scope.as_str(),
                "Claimed scope does not hold"
            );
            return Err(AppError::forbidden("Forbidden this token"));
        }

        let user = with_timeout(self.store_timeout, self.store.find_user_by_id(ids.user_id))
            .await?
            .filter(|user| user.uuid == ids.user_uuid)
            .ok_or_else(|| {
                tracing::info!(user_id = ids.user_id, "Token subject no longer exists");
                AppError::unauthorized("Failed to token.")
            })?;

        Ok(AuthUser {
            username: user.username,
            user_id: ids.user_id,
            user_uuid: ids.user_uuid,
            email: user.email,
            service_id: ids.service_id,
            role_id: ids.role_id,
            policy_id: ids.policy_id,
            expires: claims.expires,
        })
    }
}

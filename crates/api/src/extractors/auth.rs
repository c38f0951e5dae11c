use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use seatdesk_services::auth::AdminClaims;

use crate::{error::ApiError, state::AppState};

/// Team administrator authenticated by a bearer JWT. Every licence and
/// invitation query is scoped to `team_id`.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub admin_id: String,
    pub team_id: String,
    pub live: bool,
}

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let AdminClaims {
            admin_id,
            team_id,
            live,
            ..
        } = app_state.auth.verify_token(token)?;

        Ok(AdminUser {
            admin_id,
            team_id,
            live,
        })
    }
}

/// Helper trait for extracting AppState from composite state types
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

impl FromRef<AppState> for AppState {
    fn from_ref(input: &AppState) -> Self {
        input.clone()
    }
}

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::auth::FromRef;
use crate::{error::ApiError, state::AppState};

pub const CMS_KEY_HEADER: &str = "x-cms-key";

/// A call from the back office, authenticated by the shared key in
/// `X-Cms-Key`. An empty configured key rejects every call.
#[derive(Debug, Clone, Copy)]
pub struct CmsCaller;

impl<S> FromRequestParts<S> for CmsCaller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let expected = app_state.settings.licensing.cms_api_key.as_str();

        let presented = parts
            .headers
            .get(CMS_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing X-Cms-Key header".to_string()))?;

        if expected.is_empty() || presented != expected {
            return Err(ApiError::Unauthorized("Invalid back-office key".to_string()));
        }

        Ok(CmsCaller)
    }
}

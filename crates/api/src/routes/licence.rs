use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, NaiveDate, Utc};
use seatdesk_db::models::{Licence, LicenceStatus, Plan};
use seatdesk_services::dao::{PaginatedResult, PaginationParams};
use serde::Serialize;

use crate::{error::ApiError, extractors::auth::AdminUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct LicenceResponse {
    pub id: String,
    pub team_id: String,
    pub plan: Plan,
    /// Reads `expired` once the period has elapsed, whatever is stored.
    pub status: LicenceStatus,
    pub expire_date: NaiveDate,
    pub last_invitee_email: Option<String>,
    pub last_invitation_id: Option<String>,
    pub assignee_id: Option<String>,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Licence> for LicenceResponse {
    fn from(l: Licence) -> Self {
        Self {
            status: l.effective_status(Utc::now().date_naive()),
            id: l.id,
            team_id: l.team_id,
            plan: l.plan,
            expire_date: l.expire_date,
            last_invitee_email: l.last_invitee_email,
            last_invitation_id: l.last_invitation_id,
            assignee_id: l.assignee_id,
            order_id: l.order_id,
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<LicenceResponse>>, ApiError> {
    let page = state
        .licensing
        .grants
        .list_licences(&admin.team_id, params)
        .await?;

    Ok(Json(page.map(LicenceResponse::from)))
}

pub async fn get(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(licence_id): Path<String>,
) -> Result<Json<LicenceResponse>, ApiError> {
    let licence = state
        .licensing
        .grants
        .licence(&admin.team_id, &licence_id)
        .await?;

    Ok(Json(licence.into()))
}

/// Takes a granted licence back from its assignee.
pub async fn revoke(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(licence_id): Path<String>,
) -> Result<Json<LicenceResponse>, ApiError> {
    let licence = state
        .licensing
        .grants
        .revoke_granted_licence(&admin.team_id, &licence_id)
        .await?;

    Ok(Json(licence.into()))
}

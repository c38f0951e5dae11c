use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use seatdesk_db::models::{Assignee, Invitation, InvitationStatus, Membership};
use seatdesk_services::dao::{PaginatedResult, PaginationParams};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::licence::LicenceResponse;
use crate::{error::ApiError, extractors::auth::AdminUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    #[validate(length(min = 1, message = "Licence id is required"))]
    pub licence_id: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(max = 512))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: String,
    pub licence_id: String,
    pub team_id: String,
    pub email: String,
    pub description: Option<String>,
    pub status: InvitationStatus,
    pub expiration_days: i64,
    pub expires_at: DateTime<Utc>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invitation> for InvitationResponse {
    fn from(i: Invitation) -> Self {
        Self {
            expires_at: i.expires_at(),
            id: i.id,
            licence_id: i.licence_id,
            team_id: i.team_id,
            email: i.email,
            description: i.description,
            status: i.status,
            expiration_days: i.expiration_days,
            created_by: i.created_by,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub invitation: InvitationResponse,
    pub licence: LicenceResponse,
    pub assignee: Assignee,
}

#[derive(Debug, Serialize)]
pub struct VerifiedResponse {
    pub invitation: InvitationResponse,
    pub licence: LicenceResponse,
    pub assignee: Assignee,
    pub membership: Option<Membership>,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub invitation: InvitationResponse,
    pub licence: LicenceResponse,
    pub ftc_id: String,
    pub membership: Membership,
}

pub async fn list(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<InvitationResponse>>, ApiError> {
    let page = state
        .licensing
        .invitations
        .list_invitations(&admin.team_id, params)
        .await?;

    Ok(Json(page.map(InvitationResponse::from)))
}

pub async fn create(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    body.validate()?;

    let created = state
        .licensing
        .invitations
        .create_invitation(
            &admin.team_id,
            &admin.admin_id,
            &body.licence_id,
            &body.email,
            body.description,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            invitation: created.invitation.into(),
            licence: created.licence.into(),
            assignee: created.assignee,
        }),
    ))
}

pub async fn revoke(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(invitation_id): Path<String>,
) -> Result<Json<InvitationResponse>, ApiError> {
    let invitation = state
        .licensing
        .invitations
        .revoke_invitation(&admin.team_id, &invitation_id)
        .await?;

    Ok(Json(invitation.into()))
}

/// Public: the token in the path is the credential.
pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<VerifiedResponse>, ApiError> {
    let verified = state.licensing.invitations.verify_invitation(&token).await?;

    Ok(Json(VerifiedResponse {
        invitation: verified.invitation.into(),
        licence: verified.licence.into(),
        assignee: verified.assignee,
        membership: verified.membership,
    }))
}

/// Public: the token in the body is the credential.
pub async fn accept(
    State(state): State<AppState>,
    Json(body): Json<AcceptInvitationRequest>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    if body.token.trim().is_empty() {
        return Err(ApiError::Validation("Token is required".to_string()));
    }

    let accepted = state.licensing.grants.accept_invitation(body.token.trim()).await?;

    Ok(Json(AcceptedResponse {
        invitation: accepted.invitation.into(),
        licence: accepted.licence.into(),
        ftc_id: accepted.reader.ftc_id,
        membership: accepted.membership,
    }))
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids;

/// An offer of one licence to one email address.
///
/// Created when an admin invites a team member, `Accepted` once the
/// invitee claims the licence, `Revoked` when the admin withdraws it
/// first. Both of the latter are final.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invitation {
    #[serde(rename = "_id")]
    pub id: String,
    pub licence_id: String,
    pub team_id: String,
    pub created_by: String,
    pub email: String,
    pub description: Option<String>,
    pub token: String,
    #[serde(default)]
    pub status: InvitationStatus,
    pub expiration_days: i64,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    #[default]
    Created,
    Accepted,
    Revoked,
}

impl InvitationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, InvitationStatus::Created)
    }
}

pub const DEFAULT_EXPIRATION_DAYS: i64 = 7;

impl Invitation {
    pub const COLLECTION: &'static str = "invitations";

    pub fn new(
        licence_id: String,
        team_id: String,
        created_by: String,
        email: String,
        description: Option<String>,
        expiration_days: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ids::invitation_id(),
            licence_id,
            team_id,
            created_by,
            email,
            description,
            token: ids::invitation_token(),
            status: InvitationStatus::Created,
            expiration_days,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.expiration_days * 86_400)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_acceptable(&self) -> bool {
        self.status == InvitationStatus::Created && !self.is_expired()
    }

    pub fn is_revocable(&self) -> bool {
        self.status == InvitationStatus::Created
    }

    pub fn accepted(mut self) -> Self {
        self.status = InvitationStatus::Accepted;
        self.updated_at = Utc::now();
        self
    }

    pub fn revoked(mut self) -> Self {
        self.status = InvitationStatus::Revoked;
        self.updated_at = Utc::now();
        self
    }
}

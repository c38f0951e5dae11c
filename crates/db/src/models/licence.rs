use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{invitation::Invitation, plan::Plan};
use crate::ids;

/// One purchasable seat owned by a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Licence {
    #[serde(rename = "_id")]
    pub id: String,
    pub team_id: String,
    pub plan: Plan,
    #[serde(default)]
    pub status: LicenceStatus,
    pub expire_date: NaiveDate,
    pub last_invitee_email: Option<String>,
    pub last_invitation_id: Option<String>,
    pub assignee_id: Option<String>,
    pub order_id: Option<String>,
    pub created_by: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LicenceStatus {
    #[default]
    Available,
    Invited,
    Granted,
    Revoked,
    /// Never stored; see [`Licence::effective_status`].
    Expired,
}

impl Licence {
    pub const COLLECTION: &'static str = "licences";

    pub fn new(
        team_id: String,
        plan: Plan,
        expire_date: NaiveDate,
        order_id: Option<String>,
        created_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ids::licence_id(),
            team_id,
            plan,
            status: LicenceStatus::Available,
            expire_date,
            last_invitee_email: None,
            last_invitation_id: None,
            assignee_id: None,
            order_id,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == LicenceStatus::Available
    }

    /// Status as seen on `today`: a licence whose period has elapsed
    /// reads as expired whatever was persisted.
    pub fn effective_status(&self, today: NaiveDate) -> LicenceStatus {
        if self.expire_date < today {
            LicenceStatus::Expired
        } else {
            self.status
        }
    }

    /// Whether `invitation_id` is the invitation this licence is still
    /// waiting on.
    pub fn can_invitation_be_revoked(&self, invitation_id: &str) -> bool {
        self.status == LicenceStatus::Invited
            && self.last_invitation_id.as_deref() == Some(invitation_id)
    }

    /// Whether the licence can still be granted through `invitation_id`
    /// on `today`. An elapsed period rules it out even while the stored
    /// status is still invited.
    pub fn is_pending_invitation(&self, invitation_id: &str, today: NaiveDate) -> bool {
        self.effective_status(today) == LicenceStatus::Invited
            && self.last_invitation_id.as_deref() == Some(invitation_id)
    }

    pub fn invited(mut self, invitation: &Invitation) -> Self {
        self.status = LicenceStatus::Invited;
        self.last_invitation_id = Some(invitation.id.clone());
        self.last_invitee_email = Some(invitation.email.clone());
        self.updated_at = Utc::now();
        self
    }

    pub fn granted(mut self, assignee_id: String) -> Self {
        self.status = LicenceStatus::Granted;
        self.assignee_id = Some(assignee_id);
        self.updated_at = Utc::now();
        self
    }

    /// Back to a free seat with every link to an invitee removed.
    pub fn unlinked(mut self) -> Self {
        self.status = LicenceStatus::Available;
        self.assignee_id = None;
        self.last_invitation_id = None;
        self.last_invitee_email = None;
        self.updated_at = Utc::now();
        self
    }

    pub fn renewed(mut self, plan: Plan, expire_date: NaiveDate) -> Self {
        self.plan = plan;
        self.expire_date = expire_date;
        self.updated_at = Utc::now();
        self
    }
}

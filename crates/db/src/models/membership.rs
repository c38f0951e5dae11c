use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::plan::{Cycle, Tier};
use crate::ids;

/// A reader's entitlement record.
///
/// The legacy columns (`legacy_tier`, `legacy_expire`, `legacy_wx_id`)
/// are still read by older clients and must be kept in step with the
/// structured fields. Storage code normalizes on every read and write so
/// nothing above the store has to care which encoding a row came with.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Membership {
    pub membership_id: Option<String>,
    pub compound_id: Option<String>,
    pub ftc_id: Option<String>,
    pub union_id: Option<String>,
    pub legacy_wx_id: Option<String>,
    /// 10 for standard, 100 for premium.
    pub legacy_tier: Option<i64>,
    /// Unix seconds.
    pub legacy_expire: Option<i64>,
    pub tier: Option<Tier>,
    pub cycle: Option<Cycle>,
    pub expire_date: Option<NaiveDate>,
    #[serde(default)]
    pub auto_renew: bool,
    pub pay_method: Option<PayMethod>,
    pub stripe_subs_id: Option<String>,
    pub stripe_plan_id: Option<String>,
    pub subs_status: Option<String>,
    pub apple_subs_id: Option<String>,
    pub b2b_licence_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayMethod {
    Alipay,
    Wechat,
    Stripe,
    Apple,
    B2b,
}

impl Membership {
    pub const COLLECTION: &'static str = "memberships";

    pub fn has_compound_id(&self) -> bool {
        self.compound_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        if !self.has_compound_id() {
            return true;
        }

        // Auto-renewing subscriptions ignore the expire date.
        if self.auto_renew {
            return false;
        }

        match self.expire_date {
            Some(date) => date < today,
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_on(Utc::now().date_naive())
    }

    /// Whether any of the membership's identifiers equals `id`.
    pub fn is_identified_by(&self, id: &str) -> bool {
        [&self.compound_id, &self.ftc_id, &self.union_id]
            .into_iter()
            .any(|field| field.as_deref() == Some(id))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SnapshotReason {
    #[serde(rename = "b2b-grant")]
    B2bGrant,
    #[serde(rename = "b2b-revoke")]
    B2bRevoke,
    #[serde(rename = "b2b-renewal")]
    B2bRenewal,
}

/// Write-once copy of a membership taken right before it is changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberSnapshot {
    #[serde(rename = "_id")]
    pub id: String,
    pub reason: SnapshotReason,
    /// Identity the snapshot is filed under, present even when the
    /// membership itself did not exist yet.
    pub compound_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    pub membership: Membership,
}

impl MemberSnapshot {
    pub const COLLECTION: &'static str = "member_snapshots";

    pub fn new(reason: SnapshotReason, compound_id: String, membership: Membership) -> Self {
        Self {
            id: ids::snapshot_id(),
            reason,
            compound_id,
            created_at: Utc::now(),
            membership,
        }
    }
}

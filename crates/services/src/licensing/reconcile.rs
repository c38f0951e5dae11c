//! Pure transformations of [`Membership`] values. Nothing here performs
//! I/O; callers persist the returned value inside their transaction.

use chrono::{DateTime, NaiveDate};
use seatdesk_db::ids;
use seatdesk_db::models::{Assignee, Licence, Membership, PayMethod, Tier};

/// Brings the legacy and structured columns of a membership into
/// agreement. Idempotent. A membership without a compound id is
/// returned unchanged.
///
/// Legacy numeric columns holding `0` are treated as unset, which is
/// how revoked memberships are stored.
pub fn normalize(mut m: Membership) -> Membership {
    if !m.has_compound_id() {
        return m;
    }

    if m.ftc_id.is_none() && m.union_id.is_none() {
        if m.compound_id == m.legacy_wx_id {
            m.union_id = m.legacy_wx_id.clone();
        } else {
            m.ftc_id = m.compound_id.clone();
        }
    }

    let legacy_expire = m.legacy_expire.filter(|secs| *secs != 0);
    if m.expire_date.is_none() {
        if let Some(secs) = legacy_expire {
            m.expire_date = date_from_unix(secs);
        }
    }
    if legacy_expire.is_none() {
        if let Some(date) = m.expire_date {
            m.legacy_expire = Some(unix_from_date(date));
        }
    }

    let legacy_tier = m.legacy_tier.filter(|code| *code != 0);
    if m.tier.is_none() {
        if let Some(code) = legacy_tier {
            m.tier = Tier::from_legacy_code(code);
        }
    }
    if legacy_tier.is_none() {
        if let Some(tier) = m.tier {
            m.legacy_tier = Some(tier.legacy_code());
        }
    }

    m
}

/// The membership after `licence` is granted to `assignee`. A
/// membership without identity takes the assignee's ftc id.
pub fn with_licence_granted(mut m: Membership, licence: &Licence, assignee: &Assignee) -> Membership {
    if !m.has_compound_id() {
        m.membership_id = Some(ids::membership_id());
        m.compound_id = assignee.ftc_id.clone();
        m.ftc_id = assignee.ftc_id.clone();
    } else if m.is_expired() || m.membership_id.is_none() {
        m.membership_id = Some(ids::membership_id());
    }

    // Cleared so normalize rebuilds them from the licence.
    m.legacy_tier = None;
    m.legacy_expire = None;

    m.tier = Some(licence.plan.tier);
    m.cycle = Some(licence.plan.cycle);
    m.expire_date = Some(licence.expire_date);
    m.auto_renew = false;
    m.pay_method = Some(PayMethod::B2b);
    m.stripe_subs_id = None;
    m.stripe_plan_id = None;
    m.subs_status = None;
    m.apple_subs_id = None;
    m.b2b_licence_id = Some(licence.id.clone());

    normalize(m)
}

/// The membership after its B2B licence is taken back: identity kept,
/// entitlement gone.
pub fn with_licence_revoked(mut m: Membership) -> Membership {
    m.legacy_tier = Some(0);
    m.legacy_expire = Some(0);
    m.tier = None;
    m.cycle = None;
    m.expire_date = None;
    m.auto_renew = false;
    m.pay_method = None;
    m.stripe_subs_id = None;
    m.stripe_plan_id = None;
    m.subs_status = None;
    m.apple_subs_id = None;
    m.b2b_licence_id = None;
    m
}

/// The membership after the licence backing it is renewed.
pub fn with_licence_renewed(mut m: Membership, licence: &Licence) -> Membership {
    m.legacy_tier = None;
    m.legacy_expire = None;
    m.tier = Some(licence.plan.tier);
    m.cycle = Some(licence.plan.cycle);
    m.expire_date = Some(licence.expire_date);
    normalize(m)
}

fn date_from_unix(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

fn unix_from_date(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

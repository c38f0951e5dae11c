use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids;

/// A reader account. Invitees who have never signed up get one
/// created when they accept a licence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reader {
    #[serde(rename = "_id")]
    pub ftc_id: String,
    pub email: String,
    pub union_id: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Reader {
    pub const COLLECTION: &'static str = "readers";

    pub fn new(email: String) -> Self {
        Self {
            ftc_id: ids::reader_id(),
            email,
            union_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn assignee(&self) -> Assignee {
        Assignee {
            ftc_id: Some(self.ftc_id.clone()),
            union_id: self.union_id.clone(),
            email: self.email.clone(),
        }
    }
}

/// Who a licence is, or will be, granted to. `ftc_id` is empty while
/// the invitee has no account yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignee {
    pub ftc_id: Option<String>,
    pub union_id: Option<String>,
    pub email: String,
}

impl Assignee {
    pub fn unregistered(email: String) -> Self {
        Self {
            ftc_id: None,
            union_id: None,
            email,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.ftc_id.is_some()
    }
}

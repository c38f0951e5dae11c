use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Standard,
    Premium,
}

impl Tier {
    /// Numeric code used by the legacy `vip_type` column.
    pub fn legacy_code(self) -> i64 {
        match self {
            Tier::Standard => 10,
            Tier::Premium => 100,
        }
    }

    pub fn from_legacy_code(code: i64) -> Option<Self> {
        match code {
            10 => Some(Tier::Standard),
            100 => Some(Tier::Premium),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Cycle {
    Month,
    Year,
}

impl Cycle {
    /// Date one billing period after `from`.
    pub fn extend(self, from: NaiveDate) -> NaiveDate {
        let months = match self {
            Cycle::Month => Months::new(1),
            Cycle::Year => Months::new(12),
        };
        from.checked_add_months(months).unwrap_or(NaiveDate::MAX)
    }
}

/// What a licence entitles its assignee to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Plan {
    pub id: String,
    pub tier: Tier,
    pub cycle: Cycle,
}

/// An entry of the price catalogue a purchase transaction refers to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Price {
    #[serde(rename = "_id")]
    pub id: String,
    pub tier: Tier,
    pub cycle: Cycle,
    /// Amount in cents.
    pub unit_amount: i64,
    #[serde(default)]
    pub live: bool,
}

impl Price {
    pub const COLLECTION: &'static str = "prices";

    pub fn plan(&self) -> Plan {
        Plan {
            id: self.id.clone(),
            tier: self.tier,
            cycle: self.cycle,
        }
    }
}

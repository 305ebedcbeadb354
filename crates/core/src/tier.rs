//! Commercial access tiers.
//!
//! A component carries the minimum tier required to read its code; a user's
//! effective tier comes from their active license (or `free` without one).
//! Tiers are totally ordered, so gating is a plain comparison.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    Team,
    Enterprise,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Pro, Tier::Team, Tier::Enterprise];

    /// Parse from the database / query-string representation.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "team" => Ok(Self::Team),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(CoreError::Validation(format!(
                "Unknown tier '{other}'. Must be one of: free, pro, team, enterprise"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Team => "team",
            Self::Enterprise => "enterprise",
        }
    }

    /// Whether this tier is sold through checkout.
    pub fn is_purchasable(self) -> bool {
        self != Self::Free
    }

    /// Default number of seats granted by a license of this tier.
    pub fn default_seats(self) -> i32 {
        match self {
            Self::Free | Self::Pro => 1,
            Self::Team => 5,
            Self::Enterprise => 25,
        }
    }

    /// `true` when a holder of `self` may read content requiring `required`.
    pub fn can_access(self, required: Tier) -> bool {
        self >= required
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

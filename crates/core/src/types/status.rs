//! Status enums for seller accounts.

use serde::{Deserialize, Serialize};

/// Seller account status.
///
/// Listing filters that inspect fulfillment state only consider orders
/// belonging to active accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
}

impl AccountStatus {
    /// The wire/database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_representation() {
        assert_eq!(AccountStatus::Active.as_str(), "active");
        assert_eq!(AccountStatus::Inactive.as_str(), "inactive");
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::new_id;

/// A stop on the itinerary. Items join to a leg through their location string.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ItineraryLeg {
    #[serde(default = "new_id")]
    pub id: String,
    pub location: String,
    #[serde(default, alias = "checkIn")]
    pub check_in: Option<NaiveDate>,
    #[serde(default, alias = "checkOut")]
    pub check_out: Option<NaiveDate>,
    /// Synthesized from item references rather than created by the agent.
    #[serde(default, alias = "isPlaceholder")]
    pub is_placeholder: bool,
}

impl ItineraryLeg {
    pub fn placeholder(
        location: impl Into<String>,
        check_in: Option<NaiveDate>,
        check_out: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: new_id(),
            location: location.into(),
            check_in,
            check_out,
            is_placeholder: true,
        }
    }

    pub fn explicit(
        location: impl Into<String>,
        check_in: Option<NaiveDate>,
        check_out: Option<NaiveDate>,
    ) -> Self {
        Self {
            is_placeholder: false,
            ..Self::placeholder(location, check_in, check_out)
        }
    }
}

/// Fields an agent may change on a leg. Dates left out keep the current ones.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LegUpdate {
    pub location: String,
    #[serde(default)]
    pub check_in: Option<NaiveDate>,
    #[serde(default)]
    pub check_out: Option<NaiveDate>,
}

/// How many items a leg deletion took with it.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegRemoval {
    pub properties: usize,
    pub activities: usize,
    pub transportation: usize,
}

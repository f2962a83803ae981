//! Category to team routing

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Category;

/// Routing teams. One per category; the mapping is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    BillingTeam,
    TechSupport,
    DeliveryTeam,
    GeneralSupport,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::BillingTeam => "BillingTeam",
            Team::TechSupport => "TechSupport",
            Team::DeliveryTeam => "DeliveryTeam",
            Team::GeneralSupport => "GeneralSupport",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a category to its routing team.
///
/// Total over the four categories, so a fallback classification can never
/// produce an unroutable ticket.
pub fn route(category: Category) -> Team {
    match category {
        Category::Billing => Team::BillingTeam,
        Category::Technical => Team::TechSupport,
        Category::Delivery => Team::DeliveryTeam,
        Category::General => Team::GeneralSupport,
    }
}

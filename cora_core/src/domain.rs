//! Catalogue of specialist agent domains.
//!
//! Every domain maps to exactly one downstream agent; the domain name doubles
//! as the agent id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// General shopping assistance and product browsing.
    #[default]
    Cora,
    InteriorDesigner,
    InventoryAgent,
    CustomerLoyalty,
    CartManager,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown domain: {0}")]
pub struct DomainParseError(pub String);

impl Domain {
    pub const ALL: [Self; 5] = [
        Self::Cora,
        Self::InteriorDesigner,
        Self::InventoryAgent,
        Self::CustomerLoyalty,
        Self::CartManager,
    ];

    /// Identifier used in prompts, config files and classifier output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cora => "cora",
            Self::InteriorDesigner => "interior_designer",
            Self::InventoryAgent => "inventory_agent",
            Self::CustomerLoyalty => "customer_loyalty",
            Self::CartManager => "cart_manager",
        }
    }

    /// Human-readable name of the agent serving this domain.
    #[must_use]
    pub const fn agent_name(self) -> &'static str {
        match self {
            Self::Cora => "Cora Shopping Assistant",
            Self::InteriorDesigner => "Interior Design Specialist",
            Self::InventoryAgent => "Inventory Specialist",
            Self::CustomerLoyalty => "Customer Loyalty Specialist",
            Self::CartManager => "Cart Manager Specialist",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Cora => "General shopping assistance, product browsing",
            Self::InteriorDesigner => {
                "Room design, color schemes, furniture recommendations, image creation"
            }
            Self::InventoryAgent => "Product availability, stock levels, inventory checks",
            Self::CustomerLoyalty => "Discounts, promotions, loyalty programs, customer benefits",
            Self::CartManager => {
                "Shopping cart operations, adding/removing items, cart viewing, checkout assistance"
            }
        }
    }

    /// System prompt for the specialist agent serving this domain.
    #[must_use]
    pub fn persona_prompt(self) -> String {
        format!(
            "You are the {name} for the Zava shopping assistant. Your focus: {focus}.\n\
             Reply with a JSON object containing \"answer\" (text for the customer), \
             \"products\" (list of products mentioned, may be empty), \
             \"discount_percentage\", \"image_output\" and \"cart\" when relevant.",
            name = self.agent_name(),
            focus = self.description().to_lowercase(),
        )
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = DomainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| DomainParseError(s.to_string()))
    }
}

//! Stock factor rules, one module per evaluation layer.

mod adcom;
mod base;
mod cap;
mod citizen_petition;
mod clinical;
mod context;
mod crl;
mod designation;
mod dispute;
mod earnings_call;
mod manufacturing;
mod special;

use std::fmt;

use serde::{Deserialize, Serialize};

use super::registry::Factor;
use crate::config::constants::CalculatorConfig;

pub use cap::{active_ceiling, CapTier};
pub use context::InteractionFactor;

/// Evaluation stage. Declaration order is evaluation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Base,
    Designation,
    #[serde(rename = "adcom")]
    AdCom,
    Crl,
    Clinical,
    Manufacturing,
    Dispute,
    EarningsCall,
    CitizenPetition,
    Special,
    Context,
    Cap,
}

impl Layer {
    pub const ORDER: [Layer; 12] = [
        Layer::Base,
        Layer::Designation,
        Layer::AdCom,
        Layer::Crl,
        Layer::Clinical,
        Layer::Manufacturing,
        Layer::Dispute,
        Layer::EarningsCall,
        Layer::CitizenPetition,
        Layer::Special,
        Layer::Context,
        Layer::Cap,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Layer::Base => "base",
            Layer::Designation => "designation",
            Layer::AdCom => "adcom",
            Layer::Crl => "crl",
            Layer::Clinical => "clinical",
            Layer::Manufacturing => "manufacturing",
            Layer::Dispute => "dispute",
            Layer::EarningsCall => "earnings_call",
            Layer::CitizenPetition => "citizen_petition",
            Layer::Special => "special",
            Layer::Context => "context",
            Layer::Cap => "cap",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Layer::Base => "Base rate",
            Layer::Designation => "Designations",
            Layer::AdCom => "Advisory committee",
            Layer::Crl => "CRL history",
            Layer::Clinical => "Clinical",
            Layer::Manufacturing => "Manufacturing",
            Layer::Dispute => "Dispute resolution",
            Layer::EarningsCall => "Earnings call",
            Layer::CitizenPetition => "Citizen petition",
            Layer::Special => "Special",
            Layer::Context => "Interactions",
            Layer::Cap => "Caps and floors",
        }
    }

    /// Layers whose entries are bonuses or penalties rather than resets of the
    /// running probability.
    pub fn is_adjustment_layer(self) -> bool {
        !matches!(self, Layer::Base | Layer::Cap)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Stock factor set. Interaction rules come from the constants.
pub fn default_factors(config: &CalculatorConfig) -> Vec<Factor> {
    let mut factors = Vec::new();
    factors.extend(base::factors());
    factors.extend(designation::factors());
    factors.extend(adcom::factors());
    factors.extend(crl::factors());
    factors.extend(clinical::factors());
    factors.extend(manufacturing::factors());
    factors.extend(dispute::factors());
    factors.extend(earnings_call::factors());
    factors.extend(citizen_petition::factors());
    factors.extend(special::factors());
    factors.extend(context::factors(&config.interactions));
    factors.extend(cap::factors());
    factors
}

//! Scenarios the harness can drive a double through.

use serde::{Deserialize, Serialize};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Random calls land in the ledger in order
    LedgerOrder,

    /// Random attribute paths resolve to the same children on every visit
    AttributeMemo,

    /// Side-effect sequences with embedded errors drain, then exhaust
    SideEffectDrain,

    /// Contiguous windows of the ledger satisfy `assert_has_calls`
    HasCallsWindow,

    /// Identity overrides replace the native identity
    IdentitySpoof,

    /// Yield sources stop at the first error and are single-pass
    YieldDrain,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::LedgerOrder,
            ScenarioId::AttributeMemo,
            ScenarioId::SideEffectDrain,
            ScenarioId::HasCallsWindow,
            ScenarioId::IdentitySpoof,
            ScenarioId::YieldDrain,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::LedgerOrder => "ledger_order",
            ScenarioId::AttributeMemo => "attribute_memo",
            ScenarioId::SideEffectDrain => "side_effect_drain",
            ScenarioId::HasCallsWindow => "has_calls_window",
            ScenarioId::IdentitySpoof => "identity_spoof",
            ScenarioId::YieldDrain => "yield_drain",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::LedgerOrder => "random call script, ledger must replay it exactly",
            ScenarioId::AttributeMemo => "random attribute walks, children created once per key",
            ScenarioId::SideEffectDrain => "side-effect list with errors, then exhaustion",
            ScenarioId::HasCallsWindow => "ordered and any-order ledger windows",
            ScenarioId::IdentitySpoof => "identity override and prototype reassignment",
            ScenarioId::YieldDrain => "yield list with an error, drained twice",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ledger_order" | "ledgerorder" => Ok(ScenarioId::LedgerOrder),
            "attribute_memo" | "attributememo" => Ok(ScenarioId::AttributeMemo),
            "side_effect_drain" | "sideeffectdrain" => Ok(ScenarioId::SideEffectDrain),
            "has_calls_window" | "hascallswindow" => Ok(ScenarioId::HasCallsWindow),
            "identity_spoof" | "identityspoof" => Ok(ScenarioId::IdentitySpoof),
            "yield_drain" | "yielddrain" => Ok(ScenarioId::YieldDrain),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
    }

    #[test]
    fn test_unknown_scenario() {
        assert!("split_brain".parse::<ScenarioId>().is_err());
        assert_eq!("LedgerOrder".parse::<ScenarioId>(), Ok(ScenarioId::LedgerOrder));
    }
}

//! Named scenario presets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Parameters;
use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scenario {
    /// Slower growth, higher costs
    Conservative,
    /// Current model assumptions
    Base,
    /// Faster growth, better margins
    Aggressive,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Conservative, Scenario::Base, Scenario::Aggressive];

    pub fn parameters(self) -> Parameters {
        match self {
            Scenario::Conservative => Parameters {
                virtual_growth_mult: 0.8,
                micro_growth_mult: 0.7,
                mid_sized_growth_mult: 0.6,
                flagship_growth_mult: 1.0,
                cost_inflation: 1.1,
                flagship_capex: 150_000_000.0,
                ebitda_multiple: 12.0,
            },
            Scenario::Base => Parameters {
                virtual_growth_mult: 1.0,
                micro_growth_mult: 1.0,
                mid_sized_growth_mult: 1.0,
                flagship_growth_mult: 1.0,
                cost_inflation: 1.0,
                flagship_capex: 75_000_000.0,
                ebitda_multiple: 17.5,
            },
            Scenario::Aggressive => Parameters {
                virtual_growth_mult: 1.2,
                micro_growth_mult: 1.3,
                mid_sized_growth_mult: 1.2,
                flagship_growth_mult: 1.0,
                cost_inflation: 0.95,
                flagship_capex: 60_000_000.0,
                ebitda_multiple: 22.0,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Conservative => "conservative",
            Scenario::Base => "base",
            Scenario::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownScenario(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for scenario in Scenario::ALL {
            assert!(scenario.parameters().validate().is_ok(), "{scenario} preset invalid");
        }
    }

    #[test]
    fn test_parse_scenario() {
        assert_eq!("Aggressive".parse::<Scenario>().unwrap(), Scenario::Aggressive);
        assert!("optimistic".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_conservative_is_costlier() {
        let conservative = Scenario::Conservative.parameters();
        let base = Scenario::Base.parameters();
        assert!(conservative.cost_inflation > base.cost_inflation);
        assert!(conservative.flagship_capex > base.flagship_capex);
        assert!(conservative.ebitda_multiple < base.ebitda_multiple);
    }
}

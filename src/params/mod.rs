//! Scenario parameters consumed by the projection engine
//!
//! Parameters are a flat set of multipliers and values:
//! - Growth multiplier per segment
//! - Cost inflation on recurring per-student costs
//! - Capital cost per new flagship campus
//! - EBITDA valuation multiple

mod presets;

pub use presets::Scenario;

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use log::info;
use serde::{Deserialize, Serialize};

use crate::assumptions::Segment;
use crate::error::{ModelError, Result};

/// Parameters for one projection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    /// Multiplier on the virtual student trajectory (1.0 = no change)
    #[serde(default = "default_one")]
    pub virtual_growth_mult: f64,

    /// Multiplier on the microschool trajectory
    #[serde(default = "default_one")]
    pub micro_growth_mult: f64,

    /// Multiplier on the mid-sized campus trajectory
    #[serde(default = "default_one")]
    pub mid_sized_growth_mult: f64,

    /// Multiplier on the flagship campus trajectory
    #[serde(default = "default_one")]
    pub flagship_growth_mult: f64,

    /// Multiplier on recurring per-student costs
    #[serde(default = "default_one")]
    pub cost_inflation: f64,

    /// Capital cost of each new flagship campus (default: $75M)
    #[serde(default = "default_flagship_capex")]
    pub flagship_capex: f64,

    /// Multiple applied to final-year EBITDA for terminal value
    #[serde(default = "default_ebitda_multiple")]
    pub ebitda_multiple: f64,
}

fn default_one() -> f64 { 1.0 }
fn default_flagship_capex() -> f64 { 75_000_000.0 }
fn default_ebitda_multiple() -> f64 { 17.5 }

impl Default for Parameters {
    fn default() -> Self {
        Scenario::Base.parameters()
    }
}

impl Parameters {
    pub fn growth_multiplier(&self, segment: Segment) -> f64 {
        match segment {
            Segment::Virtual => self.virtual_growth_mult,
            Segment::Micro => self.micro_growth_mult,
            Segment::MidSized => self.mid_sized_growth_mult,
            Segment::Flagship => self.flagship_growth_mult,
        }
    }

    pub fn get(&self, key: ParameterKey) -> f64 {
        match key {
            ParameterKey::VirtualGrowthMult => self.virtual_growth_mult,
            ParameterKey::MicroGrowthMult => self.micro_growth_mult,
            ParameterKey::MidSizedGrowthMult => self.mid_sized_growth_mult,
            ParameterKey::FlagshipGrowthMult => self.flagship_growth_mult,
            ParameterKey::CostInflation => self.cost_inflation,
            ParameterKey::FlagshipCapex => self.flagship_capex,
            ParameterKey::EbitdaMultiple => self.ebitda_multiple,
        }
    }

    pub fn set(&mut self, key: ParameterKey, value: f64) {
        let slot = match key {
            ParameterKey::VirtualGrowthMult => &mut self.virtual_growth_mult,
            ParameterKey::MicroGrowthMult => &mut self.micro_growth_mult,
            ParameterKey::MidSizedGrowthMult => &mut self.mid_sized_growth_mult,
            ParameterKey::FlagshipGrowthMult => &mut self.flagship_growth_mult,
            ParameterKey::CostInflation => &mut self.cost_inflation,
            ParameterKey::FlagshipCapex => &mut self.flagship_capex,
            ParameterKey::EbitdaMultiple => &mut self.ebitda_multiple,
        };
        *slot = value;
    }

    /// Copy of these parameters with one value scaled by `multiplier`
    pub fn scaled(&self, key: ParameterKey, multiplier: f64) -> Self {
        let mut params = self.clone();
        params.set(key, self.get(key) * multiplier);
        params
    }

    /// Every value must be a positive finite number
    pub fn validate(&self) -> Result<()> {
        for key in ParameterKey::ALL {
            let value = self.get(key);
            if !value.is_finite() || value <= 0.0 {
                return Err(ModelError::InvalidParameter {
                    key: key.as_str(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Load parameters from a JSON file; absent keys take base-case values
pub fn load_parameters<P: AsRef<Path>>(path: P) -> Result<Parameters> {
    let path = path.as_ref();
    let params: Parameters = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    params.validate()?;
    info!("Loaded parameters from {}", path.display());
    Ok(params)
}

/// Names of the recognized parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterKey {
    VirtualGrowthMult,
    MicroGrowthMult,
    MidSizedGrowthMult,
    FlagshipGrowthMult,
    CostInflation,
    FlagshipCapex,
    EbitdaMultiple,
}

impl ParameterKey {
    pub const ALL: [ParameterKey; 7] = [
        ParameterKey::VirtualGrowthMult,
        ParameterKey::MicroGrowthMult,
        ParameterKey::MidSizedGrowthMult,
        ParameterKey::FlagshipGrowthMult,
        ParameterKey::CostInflation,
        ParameterKey::FlagshipCapex,
        ParameterKey::EbitdaMultiple,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParameterKey::VirtualGrowthMult => "virtualGrowthMult",
            ParameterKey::MicroGrowthMult => "microGrowthMult",
            ParameterKey::MidSizedGrowthMult => "midSizedGrowthMult",
            ParameterKey::FlagshipGrowthMult => "flagshipGrowthMult",
            ParameterKey::CostInflation => "costInflation",
            ParameterKey::FlagshipCapex => "flagshipCapex",
            ParameterKey::EbitdaMultiple => "ebitdaMultiple",
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterKey {
    type Err = ModelError;

    /// Accepts camelCase or snake_case names
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s.chars().filter(|c| *c != '_' && *c != '-').collect();
        ParameterKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ModelError::UnknownParameter(s.to_string()))
    }
}

//! Link element variants.
//!
//! Each `(link_type, input_type)` pair maps to one entry of [`VARIANTS`]: the
//! parameters it requires and the pure formula that turns them into a gain in
//! dB. Pairs missing from the table are rejected before any formula runs.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{EngineError, EngineResult};
use super::link_calculations::{
    AtmosphericConditions, antenna_efficiency_gain, atmospheric_attenuation, free_space_loss, free_space_loss_geometric,
    gaussian_beam_gain,
};
use crate::common::catalog::ElementCatalog;
use crate::common::configuration::{Element, Parameters};

/// Formula family of a link element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
    /// Fixed, known gain or loss (cable, filter, pointing loss, ...).
    Generic,
    /// Transmitting antenna.
    Tx,
    /// Receiving antenna.
    Rx,
    /// Free-space propagation.
    FreeSpace,
    /// Attenuation by atmospheric gases.
    Atmospheric,
}

impl LinkType {
    pub const ALL: [LinkType; 5] = [LinkType::Generic, LinkType::Tx, LinkType::Rx, LinkType::FreeSpace, LinkType::Atmospheric];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Generic => "GENERIC",
            LinkType::Tx => "TX",
            LinkType::Rx => "RX",
            LinkType::FreeSpace => "FREE_SPACE",
            LinkType::Atmospheric => "ATMOSPHERIC",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LinkType::ALL
            .into_iter()
            .find(|link_type| link_type.as_str() == s)
            .ok_or_else(|| EngineError::UnknownLinkType(s.to_string()))
    }
}

/// Which inputs define an element's gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InputType {
    /// The gain/loss is given directly in dB.
    #[serde(rename = "gain_loss")]
    GainLoss,
    #[serde(rename = "parameter_set_1")]
    ParameterSet1,
    #[serde(rename = "parameter_set_2")]
    ParameterSet2,
}

impl InputType {
    pub const ALL: [InputType; 3] = [InputType::GainLoss, InputType::ParameterSet1, InputType::ParameterSet2];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::GainLoss => "gain_loss",
            InputType::ParameterSet1 => "parameter_set_1",
            InputType::ParameterSet2 => "parameter_set_2",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InputType::ALL
            .into_iter()
            .find(|input_type| input_type.as_str() == s)
            .ok_or_else(|| EngineError::UnknownInputType(s.to_string()))
    }
}

/// One calculation: the parameters it needs, in order, and its formula.
pub struct Variant {
    pub link_type: LinkType,
    pub input_type: InputType,
    pub required: &'static [&'static str],
    formula: Option<Formula>,
}

/// Gain in dB from the required parameters, or why the model does not apply.
type Formula = fn(&[f64]) -> Result<f64, &'static str>;

fn antenna_efficiency(p: &[f64]) -> Result<f64, &'static str> {
    Ok(antenna_efficiency_gain(p[0], p[1], p[2]))
}

fn gaussian_beam(p: &[f64]) -> Result<f64, &'static str> {
    Ok(gaussian_beam_gain(p[0], p[1]))
}

fn free_space_direct(p: &[f64]) -> Result<f64, &'static str> {
    Ok(free_space_loss(p[0], p[1]))
}

fn free_space_geometric(p: &[f64]) -> Result<f64, &'static str> {
    free_space_loss_geometric(p[0], p[1], p[2], p[3])
        .ok_or("no line of sight between ground station and spacecraft at this angle and these altitudes")
}

fn atmospheric(p: &[f64]) -> Result<f64, &'static str> {
    let conditions = AtmosphericConditions {
        air_temperature: p[0],
        air_pressure: p[1],
        water_vapor_density: p[2],
        wavelength: p[3],
    };
    atmospheric_attenuation(&conditions, p[4]).ok_or("elevation_angle must be above 0 and at most 90 degrees")
}

const fn given(link_type: LinkType) -> Variant {
    Variant {
        link_type,
        input_type: InputType::GainLoss,
        required: &[],
        formula: None,
    }
}

/// Every supported `(link_type, input_type)` pair.
pub static VARIANTS: [Variant; 11] = [
    given(LinkType::Generic),
    given(LinkType::Tx),
    Variant {
        link_type: LinkType::Tx,
        input_type: InputType::ParameterSet1,
        required: &["antenna_efficiency", "antenna_diameter", "wavelength"],
        formula: Some(antenna_efficiency),
    },
    Variant {
        link_type: LinkType::Tx,
        input_type: InputType::ParameterSet2,
        required: &["waist_radius", "wavelength"],
        formula: Some(gaussian_beam),
    },
    given(LinkType::Rx),
    Variant {
        link_type: LinkType::Rx,
        input_type: InputType::ParameterSet1,
        required: &["antenna_efficiency", "antenna_diameter", "wavelength"],
        formula: Some(antenna_efficiency),
    },
    given(LinkType::FreeSpace),
    Variant {
        link_type: LinkType::FreeSpace,
        input_type: InputType::ParameterSet1,
        required: &["distance", "wavelength"],
        formula: Some(free_space_direct),
    },
    Variant {
        link_type: LinkType::FreeSpace,
        input_type: InputType::ParameterSet2,
        required: &["sc_altitude", "gs_altitude", "angle", "wavelength"],
        formula: Some(free_space_geometric),
    },
    given(LinkType::Atmospheric),
    Variant {
        link_type: LinkType::Atmospheric,
        input_type: InputType::ParameterSet1,
        required: &["air_temperature", "air_pressure", "water_vapor_content", "wavelength", "elevation_angle"],
        formula: Some(atmospheric),
    },
];

/// Find the variant for a pair, if one exists.
pub fn lookup(link_type: LinkType, input_type: InputType) -> Option<&'static Variant> {
    VARIANTS.iter().find(|v| v.link_type == link_type && v.input_type == input_type)
}

/// Find the variant for an element, or fail with an attributable error.
pub fn resolve(element: &Element) -> EngineResult<&'static Variant> {
    lookup(element.link_type, element.input_type).ok_or_else(|| EngineError::UnsupportedVariant {
        element: element.name.clone(),
        link_type: element.link_type.to_string(),
        input_type: element.input_type.to_string(),
    })
}

impl Variant {
    /// Compute the element's gain in dB.
    ///
    /// With `gain_loss` as input type the given value is returned unchanged
    /// (possibly `None`, which aggregation later reports). Otherwise every
    /// required parameter must be present in `parameters`, which are
    /// expected in base SI units; absent parameters count as an empty set.
    /// Inputs outside the model's domain and infinite or NaN results are
    /// errors, never gains.
    pub fn evaluate(&self, element: &str, gain_loss: Option<f64>, parameters: Option<&Parameters>) -> EngineResult<Option<f64>> {
        let Some(formula) = self.formula else {
            return Ok(gain_loss);
        };

        let empty = Parameters::new();
        let parameters = parameters.unwrap_or(&empty);
        let values = self
            .required
            .iter()
            .map(|name| {
                parameters.get(*name).copied().ok_or_else(|| EngineError::MissingParameter {
                    element: element.to_string(),
                    parameter: name.to_string(),
                })
            })
            .collect::<EngineResult<Vec<f64>>>()?;

        let gain = formula(&values).map_err(|reason| EngineError::InvalidInput {
            element: element.to_string(),
            reason: reason.to_string(),
        })?;
        if !gain.is_finite() {
            return Err(EngineError::NonFiniteGain {
                element: element.to_string(),
                gain,
            });
        }
        debug!("{} ({} {}): {:.4} dB", element, self.link_type, self.input_type, gain);
        Ok(Some(gain))
    }
}

/// Check that the catalog documents every parameter each variant requires.
pub fn check_catalog(catalog: &ElementCatalog) -> EngineResult<()> {
    for variant in VARIANTS.iter().filter(|v| v.formula.is_some()) {
        for parameter in variant.required {
            if catalog.parameter(variant.link_type, variant.input_type, parameter).is_none() {
                return Err(EngineError::Catalog(format!(
                    "{} {} is missing parameter \"{}\"",
                    variant.link_type, variant.input_type, parameter
                )));
            }
        }
    }
    Ok(())
}

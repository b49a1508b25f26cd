//! Element reference catalog.
//!
//! For every link type and input type the catalog lists the parameters with
//! their display units, a description and an optional valid range. Parameter
//! values in a configuration are always written in the catalog's units.

use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::variants::{InputType, LinkType, check_catalog};

const BUILTIN_REFERENCE: &str = include_str!("element_reference.toml");

/// The only parameter that may stand in for another one.
const SUBSTITUTE_PARAMETER: &str = "frequency";
const SUBSTITUTED_PARAMETER: &str = "wavelength";

/// Closed or open interval a parameter value must lie in.
///
/// Written in interval notation, e.g. `"[0, 1]"`, `"(0, inf)"` or `"[-90, 270]"`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
}

impl ValidRange {
    pub fn contains(&self, value: f64) -> bool {
        let above = if self.min_inclusive { value >= self.min } else { value > self.min };
        let below = if self.max_inclusive { value <= self.max } else { value < self.max };
        above && below
    }
}

fn parse_bound(text: &str) -> Result<f64, String> {
    match text.trim() {
        "inf" | "+inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        other => other.parse::<f64>().map_err(|_| format!("invalid range bound \"{}\"", other)),
    }
}

impl TryFrom<String> for ValidRange {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        let trimmed = text.trim();
        let min_inclusive = match trimmed.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(format!("range \"{}\" must start with '[' or '('", text)),
        };
        let max_inclusive = match trimmed.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(format!("range \"{}\" must end with ']' or ')'", text)),
        };

        let inner = &trimmed[1..trimmed.len() - 1];
        let (min, max) = inner
            .split_once(',')
            .ok_or_else(|| format!("range \"{}\" must have two bounds", text))?;
        let min = parse_bound(min)?;
        let max = parse_bound(max)?;
        if min > max {
            return Err(format!("range \"{}\" has its lower bound above the upper bound", text));
        }

        Ok(ValidRange {
            min,
            max,
            min_inclusive,
            max_inclusive,
        })
    }
}

impl fmt::Display for ValidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min.is_finite() {
            write!(f, "{} {} ", self.min, if self.min_inclusive { "<=" } else { "<" })?;
        }
        f.write_str("Value")?;
        if self.max.is_finite() {
            write!(f, " {} {}", if self.max_inclusive { "<=" } else { "<" }, self.max)?;
        }
        Ok(())
    }
}

/// Reference data for one parameter of one parameter set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParameterReference {
    pub units: String,
    pub description: String,
    #[serde(default)]
    pub range: Option<ValidRange>,
    /// Name of the parameter this one may be given instead of.
    #[serde(default)]
    pub substitutes: Option<String>,
}

/// Parameters of one parameter set, by name.
pub type ParameterSet = BTreeMap<String, ParameterReference>;

#[derive(Deserialize)]
struct RawLinkEntry {
    #[serde(default)]
    overall_description: Option<String>,
    #[serde(flatten)]
    input_types: BTreeMap<String, ParameterSet>,
}

#[derive(Debug, Clone, Default)]
struct LinkEntry {
    overall_description: Option<String>,
    input_types: BTreeMap<InputType, ParameterSet>,
}

/// Parameter reference for all link elements.
#[derive(Debug, Clone, Default)]
pub struct ElementCatalog {
    entries: BTreeMap<LinkType, LinkEntry>,
}

impl ElementCatalog {
    /// Parse a catalog from TOML and check it against the known variants.
    ///
    /// # Parameters
    ///
    /// * `text` - TOML with one `[LINK_TYPE.input_type.parameter]` table per parameter
    ///
    /// # Returns
    ///
    /// The catalog, or [`EngineError::Catalog`] when the document is malformed, names an
    /// unknown link/input type, misuses `substitutes`, or lacks a parameter some
    /// calculation requires.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let raw: BTreeMap<String, RawLinkEntry> = toml::from_str(text).map_err(|e| EngineError::Catalog(e.to_string()))?;

        let mut entries = BTreeMap::new();
        for (link_name, raw_entry) in raw {
            let link_type: LinkType = link_name.parse().map_err(|e: EngineError| EngineError::Catalog(e.to_string()))?;
            let mut input_types = BTreeMap::new();
            for (input_name, parameters) in raw_entry.input_types {
                let input_type: InputType = input_name.parse().map_err(|e: EngineError| EngineError::Catalog(e.to_string()))?;
                validate_substitutes(link_type, input_type, &parameters)?;
                input_types.insert(input_type, parameters);
            }
            entries.insert(
                link_type,
                LinkEntry {
                    overall_description: raw_entry.overall_description,
                    input_types,
                },
            );
        }

        let catalog = ElementCatalog { entries };
        check_catalog(&catalog)?;
        Ok(catalog)
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> EngineResult<Self> {
        Self::from_toml_str(BUILTIN_REFERENCE)
    }

    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read element reference: {}", path.display()))?;
        let catalog = Self::from_toml_str(&text).with_context(|| format!("Failed to load element reference: {}", path.display()))?;
        Ok(catalog)
    }

    pub fn parameter_set(&self, link_type: LinkType, input_type: InputType) -> Option<&ParameterSet> {
        self.entries.get(&link_type)?.input_types.get(&input_type)
    }

    pub fn parameter(&self, link_type: LinkType, input_type: InputType, name: &str) -> Option<&ParameterReference> {
        self.parameter_set(link_type, input_type)?.get(name)
    }

    pub fn get_unit(&self, link_type: LinkType, input_type: InputType, name: &str) -> Option<&str> {
        self.parameter(link_type, input_type, name).map(|p| p.units.as_str())
    }

    pub fn get_description(&self, link_type: LinkType, input_type: InputType, name: &str) -> Option<&str> {
        self.parameter(link_type, input_type, name).map(|p| p.description.as_str())
    }

    pub fn get_valid_range(&self, link_type: LinkType, input_type: InputType, name: &str) -> Option<&ValidRange> {
        self.parameter(link_type, input_type, name)?.range.as_ref()
    }

    /// Names of the parameters a set is normally given with, skipping
    /// alternatives such as `frequency`.
    pub fn parameter_names(&self, link_type: LinkType, input_type: InputType) -> Vec<&str> {
        self.parameter_set(link_type, input_type)
            .map(|set| {
                set.iter()
                    .filter(|(_, reference)| reference.substitutes.is_none())
                    .map(|(name, _)| name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The parameter that may be given instead of `target`, if the set has one.
    pub fn substitute_for(&self, link_type: LinkType, input_type: InputType, target: &str) -> Option<(&str, &ParameterReference)> {
        self.parameter_set(link_type, input_type)?
            .iter()
            .find(|(_, reference)| reference.substitutes.as_deref() == Some(target))
            .map(|(name, reference)| (name.as_str(), reference))
    }

    pub fn overall_description(&self, link_type: LinkType) -> Option<&str> {
        self.entries.get(&link_type)?.overall_description.as_deref()
    }

    /// Link types the catalog documents.
    pub fn link_types(&self) -> impl Iterator<Item = LinkType> + '_ {
        self.entries.keys().copied()
    }

    /// Input types documented for `link_type`.
    pub fn input_types(&self, link_type: LinkType) -> Vec<InputType> {
        self.entries
            .get(&link_type)
            .map(|entry| entry.input_types.keys().copied().collect())
            .unwrap_or_default()
    }
}

fn validate_substitutes(link_type: LinkType, input_type: InputType, parameters: &ParameterSet) -> EngineResult<()> {
    for (name, reference) in parameters {
        let Some(target) = reference.substitutes.as_deref() else {
            continue;
        };
        if name != SUBSTITUTE_PARAMETER || target != SUBSTITUTED_PARAMETER {
            return Err(EngineError::Catalog(format!(
                "{} {}: only \"{}\" may substitute \"{}\", found \"{}\" substituting \"{}\"",
                link_type, input_type, SUBSTITUTE_PARAMETER, SUBSTITUTED_PARAMETER, name, target
            )));
        }
        if !parameters.contains_key(target) {
            return Err(EngineError::Catalog(format!(
                "{} {}: \"{}\" substitutes \"{}\", which the set does not have",
                link_type, input_type, name, target
            )));
        }
    }
    Ok(())
}

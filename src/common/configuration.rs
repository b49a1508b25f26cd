//! Link configuration loading, validation and saving.
//!
//! A configuration document has three sections:
//! - `settings`: free-form case metadata, passed through untouched
//! - `general_values`: input power, receiver threshold and the computed totals
//! - `elements`: element name -> element, in document order
//!
//! Documents are JSON or YAML. Both are parsed to a [`serde_json::Value`] and
//! checked structurally before being deserialized, so a missing section is
//! reported by name instead of as a generic parse failure.

use anyhow::Context;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use super::catalog::{ElementCatalog, ValidRange};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::variants::{InputType, LinkType};

/// Sections every configuration must have.
pub const REQUIRED_SECTIONS: [&str; 3] = ["elements", "general_values", "settings"];

/// Fields of `general_values` that must be given.
pub const REQUIRED_GENERAL_VALUES: [&str; 2] = ["input_power", "rx_sys_threshold"];

/// Parameter name -> value.
pub type Parameters = BTreeMap<String, f64>;

/// Element names are compared case-insensitively.
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

fn empty_parameters_as_none<'de, D>(deserializer: D) -> Result<Option<Parameters>, D::Error>
where
    D: Deserializer<'de>,
{
    let parameters = Option::<Parameters>::deserialize(deserializer)?;
    Ok(parameters.filter(|p| !p.is_empty()))
}

/// One stage of the link chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Key of the element in the `elements` section.
    #[serde(skip)]
    pub name: String,
    pub link_type: LinkType,
    pub input_type: InputType,
    /// Presentation order. Older documents call it `idx`.
    #[serde(alias = "idx", default)]
    pub order_index: i64,
    /// Gain in dB. Given for `gain_loss` elements, computed for the rest.
    #[serde(default)]
    pub gain_loss: Option<f64>,
    #[serde(default, deserialize_with = "empty_parameters_as_none")]
    pub parameters: Option<Parameters>,
}

impl Element {
    /// A blank element whose parameters are the catalog's parameter names set to 0.
    ///
    /// `gain_loss` elements start with a gain of 0 dB and no parameters.
    pub fn empty(link_type: LinkType, input_type: InputType, catalog: &ElementCatalog) -> Self {
        let (gain_loss, parameters) = if input_type == InputType::GainLoss {
            (Some(0.0), None)
        } else {
            let parameters: Parameters = catalog
                .parameter_names(link_type, input_type)
                .into_iter()
                .map(|name| (name.to_string(), 0.0))
                .collect();
            (None, Some(parameters).filter(|p| !p.is_empty()))
        };

        Element {
            name: String::new(),
            link_type,
            input_type,
            order_index: 0,
            gain_loss,
            parameters,
        }
    }
}

/// Elements in document order. Serialized as a map keyed by element name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Elements(Vec<Element>);

impl Elements {
    pub fn new(elements: Vec<Element>) -> Self {
        Elements(elements)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|e| same_name(&e.name, name))
    }
}

impl Deref for Elements {
    type Target = [Element];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Elements {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Serialize for Elements {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for element in &self.0 {
            map.serialize_entry(&element.name, element)?;
        }
        map.end()
    }
}

struct ElementsVisitor;

impl<'de> Visitor<'de> for ElementsVisitor {
    type Value = Elements;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of element names to elements")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Elements::default())
    }

    fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut elements: Vec<Element> = Vec::new();

        while let Some((name, mut element)) = map.next_entry::<String, Element>()? {
            if elements.iter().any(|e| same_name(&e.name, &name)) {
                return Err(de::Error::custom(format!("duplicate element name \"{}\"", name)));
            }
            element.name = name;
            elements.push(element);
        }

        Ok(Elements(elements))
    }
}

impl<'de> Deserialize<'de> for Elements {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ElementsVisitor)
    }
}

/// Link-wide values, in dBm (powers) and dB (gain, margin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralValues {
    pub input_power: f64,
    pub rx_sys_threshold: f64,
    /// Received power, `input_power + total_gain`.
    #[serde(default)]
    pub output_power: Option<f64>,
    #[serde(default)]
    pub total_gain: Option<f64>,
    #[serde(default)]
    pub total_margin: Option<f64>,
}

/// A parameter value outside the range the catalog documents for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeViolation {
    pub element: String,
    pub parameter: String,
    pub value: f64,
    pub range: ValidRange,
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "element \"{}\": {} = {} is outside the valid range {}",
            self.element, self.parameter, self.value, self.range
        )
    }
}

/// A complete link budget case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub settings: Value,
    pub general_values: GeneralValues,
    pub elements: Elements,
}

/// Structural checks on a parsed document.
///
/// Reports the first problem found: a missing section, a missing required
/// general value, an unknown link/input type tag, or two element names that
/// differ only in case.
pub fn validate_document(document: &Value) -> EngineResult<()> {
    let root = document
        .as_object()
        .ok_or_else(|| EngineError::Parse("the document must be a mapping of sections".to_string()))?;

    for section in REQUIRED_SECTIONS {
        if !root.contains_key(section) {
            return Err(EngineError::MissingSection(section.to_string()));
        }
    }

    let general_values = &root["general_values"];
    for field in REQUIRED_GENERAL_VALUES {
        if general_values.get(field).is_none_or(Value::is_null) {
            return Err(EngineError::MissingField {
                section: "general_values".to_string(),
                field: field.to_string(),
            });
        }
    }

    let elements = match &root["elements"] {
        Value::Null => return Ok(()),
        Value::Object(elements) => elements,
        _ => return Err(EngineError::Parse("\"elements\" must be a mapping of element names".to_string())),
    };

    let mut seen: Vec<&str> = Vec::new();
    for (name, element) in elements {
        if seen.iter().any(|other| same_name(other, name)) {
            return Err(EngineError::DuplicateElement(name.clone()));
        }
        seen.push(name);

        let section = format!("elements.{}", name);
        let tag = |field: &str| -> EngineResult<String> {
            element
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| EngineError::MissingField {
                    section: section.clone(),
                    field: field.to_string(),
                })
        };
        tag("link_type")?.parse::<LinkType>()?;
        tag("input_type")?.parse::<InputType>()?;
    }

    Ok(())
}

impl Configuration {
    /// Validate and deserialize a parsed document.
    pub fn from_value(document: Value) -> EngineResult<Self> {
        validate_document(&document)?;
        serde_json::from_value(document).map_err(|e| EngineError::Parse(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> EngineResult<Self> {
        let document: Value = serde_json::from_str(text).map_err(|e| EngineError::Parse(e.to_string()))?;
        Self::from_value(document)
    }

    pub fn from_yaml_str(text: &str) -> EngineResult<Self> {
        let document: Value = serde_yaml::from_str(text).map_err(|e| EngineError::Parse(e.to_string()))?;
        Self::from_value(document)
    }

    pub fn to_json_string(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Parse(e.to_string()))
    }

    pub fn to_yaml_string(&self) -> EngineResult<String> {
        serde_yaml::to_string(self).map_err(|e| EngineError::Parse(e.to_string()))
    }

    /// Elements sorted by `order_index`; equal indices keep document order.
    pub fn ordered_elements(&self) -> Vec<&Element> {
        let mut ordered: Vec<&Element> = self.elements.iter().collect();
        ordered.sort_by_key(|e| e.order_index);
        ordered
    }

    pub fn get_element(&self, name: &str) -> Option<&Element> {
        self.elements.position(name).map(|i| &self.elements[i])
    }

    pub fn get_element_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements.position(name).map(|i| &mut self.elements[i])
    }

    pub fn contains_element(&self, name: &str) -> bool {
        self.elements.position(name).is_some()
    }

    /// Order index that places a new element after all existing ones.
    pub fn next_order_index(&self) -> i64 {
        self.elements.iter().map(|e| e.order_index).max().map_or(1, |max| max + 1)
    }

    /// Append `element` under `name`, keeping its order index.
    pub fn add_element(&mut self, name: &str, mut element: Element) -> EngineResult<()> {
        if self.contains_element(name) {
            return Err(EngineError::DuplicateElement(name.to_string()));
        }
        element.name = name.to_string();
        self.elements.0.push(element);
        Ok(())
    }

    /// Append a blank element (see [`Element::empty`]) after all existing ones.
    pub fn add_empty_element(
        &mut self,
        name: &str,
        link_type: LinkType,
        input_type: InputType,
        catalog: &ElementCatalog,
    ) -> EngineResult<()> {
        let mut element = Element::empty(link_type, input_type, catalog);
        element.order_index = self.next_order_index();
        self.add_element(name, element)
    }

    /// Rename an element. Changing only the case of a name is allowed.
    pub fn rename_element(&mut self, old_name: &str, new_name: &str) -> EngineResult<()> {
        let index = self
            .elements
            .position(old_name)
            .ok_or_else(|| EngineError::ElementNotFound(old_name.to_string()))?;

        let taken = self
            .elements
            .iter()
            .enumerate()
            .any(|(i, e)| i != index && same_name(&e.name, new_name));
        if taken {
            return Err(EngineError::DuplicateElement(new_name.to_string()));
        }

        self.elements[index].name = new_name.to_string();
        Ok(())
    }

    pub fn remove_element(&mut self, name: &str) -> EngineResult<Element> {
        let index = self
            .elements
            .position(name)
            .ok_or_else(|| EngineError::ElementNotFound(name.to_string()))?;
        Ok(self.elements.0.remove(index))
    }

    /// Parameters whose value lies outside the catalog's valid range.
    ///
    /// Parameters the catalog does not know, or knows without a range, are
    /// not reported.
    pub fn range_violations(&self, catalog: &ElementCatalog) -> Vec<RangeViolation> {
        let mut violations = Vec::new();
        for element in self.ordered_elements() {
            let Some(parameters) = &element.parameters else {
                continue;
            };
            for (name, value) in parameters {
                let Some(range) = catalog.get_valid_range(element.link_type, element.input_type, name) else {
                    continue;
                };
                if !range.contains(*value) {
                    violations.push(RangeViolation {
                        element: element.name.clone(),
                        parameter: name.clone(),
                        value: *value,
                        range: *range,
                    });
                }
            }
        }
        violations
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load a configuration from a `.json`, `.yaml` or `.yml` file.
///
/// Files with any other extension are read as JSON.
pub fn load_configuration(path: &Path) -> anyhow::Result<Configuration> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))?;

    let configuration = if is_yaml(path) {
        Configuration::from_yaml_str(&text)
    } else {
        Configuration::from_json_str(&text)
    }
    .with_context(|| format!("Invalid link configuration: {}", path.display()))?;

    Ok(configuration)
}

/// Save a configuration as YAML or JSON, chosen by the file extension.
///
/// A path without a `.json`/`.yaml`/`.yml` extension gets `.json` appended.
///
/// # Returns
///
/// The path that was written.
pub fn save_configuration(configuration: &Configuration, path: &Path) -> anyhow::Result<PathBuf> {
    let (path, text) = if is_yaml(path) {
        (path.to_path_buf(), configuration.to_yaml_string()?)
    } else if is_json(path) {
        (path.to_path_buf(), configuration.to_json_string()?)
    } else {
        let mut appended = OsString::from(path.as_os_str());
        appended.push(".json");
        (PathBuf::from(appended), configuration.to_json_string()?)
    };

    fs::write(&path, text).with_context(|| format!("Failed to write file: {}", path.display()))?;
    Ok(path)
}

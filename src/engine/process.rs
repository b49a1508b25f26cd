//! Link budget computation.
//!
//! [`compute`] works on a copy of the configuration:
//! 1. parameters are converted from their catalog units to base SI, with a
//!    given `frequency` replaced by the equivalent `wavelength`
//! 2. every element's gain is evaluated by its variant
//! 3. gains are summed and the margin derived
//! 4. parameters are converted back, restoring `frequency` where it was given
//!
//! The caller's configuration is never modified.

use super::error::{EngineError, EngineResult, UnitError};
use super::units::{freq_to_wavelength, to_base_si, to_prefixed_si, wavelength_to_freq};
use super::variants::{self, InputType};
use crate::common::catalog::ElementCatalog;
use crate::common::configuration::{Configuration, Element};

const WAVELENGTH: &str = "wavelength";

/// Elements whose wavelength was derived from a given frequency, by element
/// position, with the name of the frequency parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitutions(Vec<(usize, String)>);

impl Substitutions {
    fn for_element(&self, index: usize) -> Option<&str> {
        self.0.iter().find(|(i, _)| *i == index).map(|(_, name)| name.as_str())
    }
}

/// Compute every element's gain, the total gain, output power and margin.
///
/// # Parameters
///
/// * `configuration` - The link configuration, parameters in catalog units
/// * `catalog` - Units of every parameter
///
/// # Returns
///
/// A copy of `configuration` with each element's `gain_loss` and the
/// `general_values` totals set. Its parameters equal the input parameters.
pub fn compute(configuration: &Configuration, catalog: &ElementCatalog) -> EngineResult<Configuration> {
    let mut results = configuration.clone();

    let substitutions = to_base_units(&mut results, catalog)?;
    fill_results(&mut results)?;
    sum_results(&mut results)?;
    to_display_units(&mut results, catalog, &substitutions)?;

    log::info!(
        "Computed {} elements: total gain {:.2} dB, margin {:.2} dB",
        results.elements.len(),
        results.general_values.total_gain.unwrap_or_default(),
        results.general_values.total_margin.unwrap_or_default()
    );
    Ok(results)
}

fn unit_error(element: &Element, parameter: &str, source: UnitError) -> EngineError {
    EngineError::Unit {
        element: element.name.clone(),
        parameter: parameter.to_string(),
        source,
    }
}

/// Unit a parameter is converted with, or `None` for parameters the
/// element's variant does not use and the catalog does not list.
fn parameter_unit<'c>(catalog: &'c ElementCatalog, element: &Element, name: &str) -> EngineResult<Option<&'c str>> {
    if let Some(unit) = catalog.get_unit(element.link_type, element.input_type, name) {
        return Ok(Some(unit));
    }

    let variant = variants::resolve(element)?;
    if variant.required.iter().any(|required| *required == name) {
        return Err(EngineError::UnknownParameter {
            element: element.name.clone(),
            parameter: name.to_string(),
        });
    }
    Ok(None)
}

/// Replace a given frequency by the wavelength in base SI units.
///
/// Returns the name of the replaced parameter.
fn substitute_frequency(element: &mut Element, catalog: &ElementCatalog) -> EngineResult<Option<String>> {
    let Some((name, reference)) = catalog.substitute_for(element.link_type, element.input_type, WAVELENGTH) else {
        return Ok(None);
    };
    let Some(parameters) = element.parameters.as_ref() else {
        return Ok(None);
    };
    let Some(&frequency) = parameters.get(name) else {
        return Ok(None);
    };

    if parameters.contains_key(WAVELENGTH) {
        return Err(EngineError::ConflictingParameters {
            element: element.name.clone(),
            first: name.to_string(),
            second: WAVELENGTH.to_string(),
        });
    }

    let hertz = to_base_si(frequency, &reference.units).map_err(|e| unit_error(element, name, e))?;
    if hertz <= 0.0 {
        return Err(unit_error(element, name, UnitError::NonPositive(frequency)));
    }

    let Some(parameters) = element.parameters.as_mut() else {
        return Ok(None);
    };
    parameters.remove(name);
    parameters.insert(WAVELENGTH.to_string(), freq_to_wavelength(hertz));
    log::debug!("{}: {} {} {} -> {} m", element.name, name, frequency, reference.units, parameters[WAVELENGTH]);
    Ok(Some(name.to_string()))
}

/// Convert all parameters to base SI units in place.
///
/// `gain_loss` elements are left untouched. Parameters the catalog does not
/// list are passed through unless the element's variant requires them.
pub fn to_base_units(configuration: &mut Configuration, catalog: &ElementCatalog) -> EngineResult<Substitutions> {
    let mut substitutions = Substitutions::default();

    for (index, element) in configuration.elements.iter_mut().enumerate() {
        if element.input_type == InputType::GainLoss || element.parameters.is_none() {
            continue;
        }

        if let Some(name) = substitute_frequency(element, catalog)? {
            substitutions.0.push((index, name));
        }

        let substituted = substitutions.for_element(index).is_some();
        let mut converted = Vec::new();
        for (name, value) in element.parameters.iter().flatten() {
            // the derived wavelength is already in meters
            if substituted && name == WAVELENGTH {
                continue;
            }
            let Some(unit) = parameter_unit(catalog, element, name)? else {
                continue;
            };
            let base = to_base_si(*value, unit).map_err(|e| unit_error(element, name, e))?;
            converted.push((name.clone(), base));
        }

        if let Some(parameters) = element.parameters.as_mut() {
            parameters.extend(converted);
        }
    }

    Ok(substitutions)
}

/// Convert all parameters from base SI back to their catalog units in place.
///
/// Inverse of [`to_base_units`]; substituted wavelengths become frequencies
/// again.
pub fn to_display_units(configuration: &mut Configuration, catalog: &ElementCatalog, substitutions: &Substitutions) -> EngineResult<()> {
    for (index, element) in configuration.elements.iter_mut().enumerate() {
        if element.input_type == InputType::GainLoss || element.parameters.is_none() {
            continue;
        }

        let substituted = substitutions.for_element(index);
        let mut converted = Vec::new();
        for (name, value) in element.parameters.iter().flatten() {
            // the wavelength is turned back into the given frequency below
            if substituted.is_some() && name == WAVELENGTH {
                continue;
            }
            let Some(unit) = parameter_unit(catalog, element, name)? else {
                continue;
            };
            let display = to_prefixed_si(*value, unit).map_err(|e| unit_error(element, name, e))?;
            converted.push((name.clone(), display));
        }

        let Some(parameters) = element.parameters.as_mut() else {
            continue;
        };
        parameters.extend(converted);

        if let Some(name) = substituted {
            let Some(unit) = catalog.get_unit(element.link_type, element.input_type, name) else {
                continue;
            };
            if let Some(wavelength) = parameters.remove(WAVELENGTH) {
                let frequency = to_prefixed_si(wavelength_to_freq(wavelength), unit).map_err(|source| EngineError::Unit {
                    element: element.name.clone(),
                    parameter: name.to_string(),
                    source,
                })?;
                parameters.insert(name.to_string(), frequency);
            }
        }
    }
    Ok(())
}

/// Evaluate every element's variant and store the gain on the element.
///
/// Parameters must already be in base SI units.
pub fn fill_results(configuration: &mut Configuration) -> EngineResult<()> {
    for element in configuration.elements.iter_mut() {
        let variant = variants::resolve(element)?;
        element.gain_loss = variant.evaluate(&element.name, element.gain_loss, element.parameters.as_ref())?;
    }
    Ok(())
}

/// Sum the element gains and derive the received power and margin.
///
/// # Formula
///
/// ```text
/// total_gain   = Σ gain_loss
/// output_power = input_power + total_gain
/// total_margin = rx_sys_threshold − (input_power + total_gain)
/// ```
///
/// Fails with [`EngineError::IncompleteResults`] naming the first element
/// without a gain.
pub fn sum_results(configuration: &mut Configuration) -> EngineResult<()> {
    let mut total_gain = 0.0;
    for element in configuration.elements.iter() {
        let gain = element
            .gain_loss
            .ok_or_else(|| EngineError::IncompleteResults(element.name.clone()))?;
        total_gain += gain;
    }

    let general = &mut configuration.general_values;
    general.total_gain = Some(total_gain);
    general.output_power = Some(general.input_power + total_gain);
    general.total_margin = Some(general.rx_sys_threshold - (general.input_power + total_gain));
    log::debug!(
        "Input {} dBm, threshold {} dBm, total gain {} dB",
        general.input_power,
        general.rx_sys_threshold,
        total_gain
    );
    Ok(())
}

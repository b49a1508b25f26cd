//! Error types for the calculation engine.
//!
//! Every failure is surfaced to the caller; nothing is recovered or retried
//! inside the engine because all computations are deterministic.

use thiserror::Error;

/// Failure while converting a value between prefixed and base SI units.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    /// Units such as `m/s` or `kg m^-3` are not decomposed.
    #[error("conversion of composite units is not supported: \"{0}\"")]
    Composite(String),

    #[error("\"{0}\" is not a recognized unit")]
    Unknown(String),

    /// Frequency and wavelength must be strictly positive to be inverted.
    #[error("cannot derive wavelength/frequency from non-positive value {0}")]
    NonPositive(f64),
}

/// Errors produced while validating, normalizing, or computing a link budget.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration missing required section: \"{0}\"")]
    MissingSection(String),

    #[error("configuration section \"{section}\" missing required field \"{field}\"")]
    MissingField { section: String, field: String },

    #[error("element name \"{0}\" already exists (names are case-insensitive)")]
    DuplicateElement(String),

    #[error("no element named \"{0}\"")]
    ElementNotFound(String),

    #[error("unknown link type \"{0}\"")]
    UnknownLinkType(String),

    #[error("unknown input type \"{0}\"")]
    UnknownInputType(String),

    #[error("element \"{element}\": no calculation for link type {link_type} with input type {input_type}")]
    UnsupportedVariant {
        element: String,
        link_type: String,
        input_type: String,
    },

    #[error("element \"{element}\", parameter \"{parameter}\": {source}")]
    Unit {
        element: String,
        parameter: String,
        #[source]
        source: UnitError,
    },

    #[error("element \"{element}\": parameter \"{parameter}\" has no entry in the element reference")]
    UnknownParameter { element: String, parameter: String },

    #[error("element \"{element}\": parameters \"{first}\" and \"{second}\" cannot both be given")]
    ConflictingParameters {
        element: String,
        first: String,
        second: String,
    },

    #[error("element \"{element}\": missing required parameter \"{parameter}\"")]
    MissingParameter { element: String, parameter: String },

    /// The parameters lie outside the domain the element's model is defined on.
    #[error("element \"{element}\": {reason}")]
    InvalidInput { element: String, reason: String },

    /// Zero distances or wavelengths drive a gain to infinity.
    #[error("element \"{element}\": gain is not a finite number ({gain})")]
    NonFiniteGain { element: String, gain: f64 },

    #[error("element \"{0}\" has no gain/loss value, cannot compute the total gain")]
    IncompleteResults(String),

    #[error("invalid configuration document: {0}")]
    Parse(String),

    #[error("invalid element reference: {0}")]
    Catalog(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

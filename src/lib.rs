//! RF link budget toolbox.
//!
//! Computes the gain or loss of every stage of a communication link
//! (antennas, free-space path, atmosphere, fixed gains), sums them and
//! derives the margin against the receiver threshold.

pub mod common;
pub mod engine;

pub use common::catalog::ElementCatalog;
pub use common::configuration::{Configuration, Element, GeneralValues, load_configuration, save_configuration};
pub use engine::error::{EngineError, EngineResult, UnitError};
pub use engine::process::{compute, fill_results, sum_results};
pub use engine::variants::{InputType, LinkType};

//! Data the engine works on: link configurations, the element reference
//! catalog and runner settings.

pub mod app_config;
pub mod catalog;
pub mod configuration;

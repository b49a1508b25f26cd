use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::{LevelFilter, debug, info, warn};
use std::path::{Path, PathBuf};

use link_budget_toolbox::common::app_config::AppConfig;
use link_budget_toolbox::common::catalog::ElementCatalog;
use link_budget_toolbox::common::configuration::{Configuration, load_configuration};
use link_budget_toolbox::compute;
use link_budget_toolbox::engine::link_calculations::dbm_to_watt;

/// Link budget toolbox - compute the gains and margin of a link configuration
#[derive(Parser, Debug)]
#[command(name = "link-budget-toolbox")]
#[command(version, about, long_about = None)]
struct Args {
    /// Log the crate at debug level, overriding log-level in link_budget.toml
    #[arg(long)]
    debug: bool,

    /// Link configuration (.json, .yaml or .yml)
    config: PathBuf,
}

fn load_catalog(settings: &AppConfig) -> anyhow::Result<ElementCatalog> {
    match &settings.catalog {
        Some(path) => {
            info!("Using element reference: {}", path.display());
            ElementCatalog::load(path)
        }
        None => ElementCatalog::builtin().context("Built-in element reference is invalid"),
    }
}

fn print_results(config_path: &Path, results: &Configuration) {
    let general = &results.general_values;

    println!("Link budget: {}", config_path.display());
    println!();
    println!(
        "{:<28}{:>10.2} dBm  ({:.4e} W)",
        "Input Power:",
        general.input_power,
        dbm_to_watt(general.input_power)
    );
    println!(
        "{:<28}{:>10.2} dBm  ({:.4e} W)",
        "Receiver System Threshold:",
        general.rx_sys_threshold,
        dbm_to_watt(general.rx_sys_threshold)
    );
    println!();

    println!("{:<24}{:<13}{:<17}{:>12}", "Element", "Link type", "Input type", "Gain [dB]");
    for element in results.ordered_elements() {
        let gain = element.gain_loss.map_or_else(|| "-".to_string(), |g| format!("{:.2}", g));
        println!(
            "{:<24}{:<13}{:<17}{:>12}",
            element.name,
            element.link_type.as_str(),
            element.input_type.as_str(),
            gain
        );
    }
    println!();

    if let (Some(total_gain), Some(output_power), Some(margin)) = (general.total_gain, general.output_power, general.total_margin) {
        println!("{:<28}{:>10.2} dB", "Total Gain:", total_gain);
        println!("{:<28}{:>10.2} dBm", "Output Power:", output_power);
        println!("{:<28}{:>10.2} dB", "Margin:", margin);
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = AppConfig::for_configuration(&args.config).map_err(anyhow::Error::msg)?;

    // Logging setup
    let crate_level = if args.debug {
        LevelFilter::Debug
    } else {
        settings.level_filter().unwrap_or(LevelFilter::Info)
    };
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("link_budget_toolbox"), crate_level)
        .init();

    if settings.log_level.is_some() && settings.level_filter().is_none() {
        warn!("Ignoring unknown log-level in {}", AppConfig::path_for(&args.config).display());
    }

    let catalog = load_catalog(&settings)?;
    let configuration = load_configuration(&args.config)?;
    info!("Loaded configuration file: {:?}", args.config);
    debug!("{} elements", configuration.elements.len());

    for violation in configuration.range_violations(&catalog) {
        warn!("{}", violation);
    }

    let results = compute(&configuration, &catalog).with_context(|| format!("Failed to compute {}", args.config.display()))?;
    print_results(&args.config, &results);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_required() {
        assert!(Args::try_parse_from(["link-budget-toolbox"]).is_err());
        assert!(Args::try_parse_from(["link-budget-toolbox", "--verbose", "case.json"]).is_err());
    }

    #[test]
    fn debug_flag_and_path() {
        let args = Args::try_parse_from(["link-budget-toolbox", "--debug", "cases/leo.yaml"]).unwrap();
        assert!(args.debug);
        assert_eq!(args.config, PathBuf::from("cases/leo.yaml"));

        let args = Args::try_parse_from(["link-budget-toolbox", "case.json"]).unwrap();
        assert!(!args.debug);
    }
}

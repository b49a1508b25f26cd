//! End-to-end link budgets computed from the configuration files in
//! `tests/fixtures`.

use link_budget_toolbox::common::configuration::{Configuration, load_configuration, save_configuration};
use link_budget_toolbox::engine::link_calculations::slant_distance;
use link_budget_toolbox::{ElementCatalog, EngineError, compute};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn catalog() -> ElementCatalog {
    ElementCatalog::builtin().unwrap()
}

fn gain(results: &Configuration, name: &str) -> f64 {
    results
        .get_element(name)
        .and_then(|e| e.gain_loss)
        .unwrap_or_else(|| panic!("no gain for {name}"))
}

fn assert_close(expected: f64, actual: f64, tol: f64) {
    assert!((expected - actual).abs() < tol, "expected {expected}, got {actual}");
}

#[test]
fn reference_budget_from_json_and_yaml() {
    for name in ["reference_config.json", "reference_config.yaml"] {
        let configuration = load_configuration(&fixture(name)).unwrap();
        let results = compute(&configuration, &catalog()).unwrap();

        assert_close(-66.72664804890425, gain(&results, "Free Space"), 1e-9);
        assert_close(-31.026102676197887, gain(&results, "GS RX Ant"), 1e-9);
        assert_eq!(gain(&results, "SC TX Ant"), 10.0);

        let general = &results.general_values;
        assert_close(-87.75275072510215, general.total_gain.unwrap(), 1e-9);
        assert_close(28.752750725102146, general.total_margin.unwrap(), 1e-9);
        assert_close(-22.75275072510215, general.output_power.unwrap(), 1e-9);
    }
}

#[test]
fn json_and_yaml_fixtures_agree() {
    let json = load_configuration(&fixture("reference_config.json")).unwrap();
    let yaml = load_configuration(&fixture("reference_config.yaml")).unwrap();
    assert_eq!(json, yaml);

    let names: Vec<&str> = json.ordered_elements().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["GS RX Ant", "SC TX Ant", "Free Space"]);
}

#[test]
fn parameters_survive_computation() {
    let configuration = load_configuration(&fixture("leo_downlink.yaml")).unwrap();
    let results = compute(&configuration, &catalog()).unwrap();

    for (before, after) in configuration.elements.iter().zip(results.elements.iter()) {
        assert_eq!(before.name, after.name);
        match (&before.parameters, &after.parameters) {
            (Some(before), Some(after)) => {
                assert_eq!(before.keys().collect::<Vec<_>>(), after.keys().collect::<Vec<_>>());
                for (key, value) in before {
                    assert_close(*value, after[key], 1e-9 * value.abs().max(1.0));
                }
            }
            (None, None) => {}
            other => panic!("parameters changed shape for {}: {other:?}", before.name),
        }
    }
    assert_eq!(results.settings["mission"], "demo");
}

#[test]
fn leo_downlink_with_frequencies() {
    let configuration = load_configuration(&fixture("leo_downlink.yaml")).unwrap();
    let results = compute(&configuration, &catalog()).unwrap();

    assert_close(-149.83858798890844, gain(&results, "Slant Path"), 1e-6);
    assert_close(20.162264124068248, gain(&results, "GS RX Ant"), 1e-6);

    let atmosphere = gain(&results, "Atmosphere");
    assert!(atmosphere < 0.0 && atmosphere > -1.0, "unexpected UHF attenuation {atmosphere}");

    let sum: f64 = results.elements.iter().filter_map(|e| e.gain_loss).sum();
    let general = &results.general_values;
    assert_close(sum, general.total_gain.unwrap(), 1e-9);
    assert_eq!(general.total_margin, Some(-120.0 - (30.0 + general.total_gain.unwrap())));
}

#[test]
fn missing_section_is_reported() {
    let err = load_configuration(&fixture("missing_section.json")).unwrap_err();
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::MissingSection(section)) => assert_eq!(section, "settings"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn incomplete_gain_chain_is_reported() {
    let configuration = load_configuration(&fixture("incomplete_gain.json")).unwrap();
    match compute(&configuration, &catalog()) {
        Err(EngineError::IncompleteResults(name)) => assert_eq!(name, "Pointing Loss"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let configuration = load_configuration(&fixture("reference_config.json")).unwrap();
    let results = compute(&configuration, &catalog()).unwrap();

    for name in ["results.yaml", "results.json", "results"] {
        let written = save_configuration(&results, &dir.path().join(name)).unwrap();
        if name == "results" {
            assert_eq!(written, dir.path().join("results.json"));
        }
        let reloaded = load_configuration(&written).unwrap();
        assert_eq!(reloaded, results);
        assert_eq!(reloaded.get_element("SC TX Ant").unwrap().parameters, None);
    }
}

#[test]
fn geometric_free_space_boundaries() {
    let template = load_configuration(&fixture("reference_config.json")).unwrap();
    for angle in [90.0, -90.0, 270.0] {
        let mut configuration = template.clone();
        let element = configuration.get_element_mut("Free Space").unwrap();
        element.parameters.as_mut().unwrap().insert("angle".to_string(), angle);

        let results = compute(&configuration, &catalog()).unwrap();
        let loss = gain(&results, "Free Space");
        assert!(loss.is_finite(), "angle {angle} gave {loss}");
    }

    assert_eq!(slant_distance(300.0, 0.0, 90.0), Some(300.0));
    assert_eq!(slant_distance(300.0, 0.0, -90.0), Some(2.0 * 6_371_000.0 + 300.0));
    assert_eq!(slant_distance(300.0, 0.0, -90.0), slant_distance(300.0, 0.0, 270.0));
}

#[test]
fn non_physical_inputs_fail_with_typed_errors() {
    let template = load_configuration(&fixture("leo_downlink.yaml")).unwrap();
    // (element, parameter, value)
    let cases = [
        ("Slant Path", "gs_altitude", 600_000.0),
        ("Atmosphere", "elevation_angle", 0.0),
        ("Atmosphere", "elevation_angle", -10.0),
        ("GS RX Ant", "antenna_diameter", 0.0),
    ];

    for (name, parameter, value) in cases {
        let mut configuration = template.clone();
        let element = configuration.get_element_mut(name).unwrap();
        element.parameters.as_mut().unwrap().insert(parameter.to_string(), value);

        match compute(&configuration, &catalog()) {
            Err(EngineError::InvalidInput { element, .. }) | Err(EngineError::NonFiniteGain { element, .. }) => {
                assert_eq!(element, name, "{parameter} = {value}")
            }
            other => panic!("{name}: {parameter} = {value} gave {other:?}"),
        }
    }
}

#[test]
fn zero_distance_and_wavelength_fail() {
    let template = load_configuration(&fixture("reference_config.json")).unwrap();
    let cases = [("Free Space", "sc_altitude", 0.0), ("GS RX Ant", "wavelength", 0.0)];

    for (name, parameter, value) in cases {
        let mut configuration = template.clone();
        let element = configuration.get_element_mut(name).unwrap();
        element.parameters.as_mut().unwrap().insert(parameter.to_string(), value);
        if name == "Free Space" {
            element.parameters.as_mut().unwrap().insert("angle".to_string(), 90.0);
        }

        assert!(
            matches!(compute(&configuration, &catalog()), Err(EngineError::NonFiniteGain { element, .. }) if element == name),
            "{name}: {parameter} = {value}"
        );
    }
}

#[test]
fn computation_is_repeatable_on_one_configuration() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut configuration = load_configuration(&fixture("reference_config.json")).unwrap();
    let catalog = catalog();

    for _ in 0..50 {
        let input_power = rng.gen_range(-30.0..70.0);
        let threshold = rng.gen_range(-150.0..10.0);
        configuration.general_values.input_power = input_power;
        configuration.general_values.rx_sys_threshold = threshold;

        let first = compute(&configuration, &catalog).unwrap();
        let second = compute(&configuration, &catalog).unwrap();
        assert_eq!(first, second);

        let total = first.general_values.total_gain.unwrap();
        assert_eq!(first.general_values.total_margin, Some(threshold - (input_power + total)));
    }
}

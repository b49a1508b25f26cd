//! Physical link calculations.
//!
//! Contains the closed-form models behind every link element:
//! - Parabolic antenna peak gain from aperture efficiency and diameter
//! - Gaussian-beam (optical) antenna gain from the beam waist radius
//! - Free-space path loss, with slant range derived from orbital geometry
//! - Atmospheric gas attenuation (ITU-R P.676 annex 2 approximation)
//! - Decibel and power-level conversions
//!
//! Units:
//! - All inputs are unprefixed SI (meters, kelvin, pascal, kg/m³) except
//!   angles, which are in degrees.
//! - Every returned gain is in dB. Losses are negative gains.

use std::f64::consts::PI;

use super::units::wavelength_to_freq;

/// Mean Earth radius used as the shared reference sphere for altitudes [m].
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Angles closer than this to a special-cased elevation are treated as equal [deg].
const ANGLE_EPSILON: f64 = 1e-9;

/// Express a linear power ratio in decibels.
///
/// ```text
/// G(dB) = 10 × log₁₀(G)
/// ```
///
/// A ratio of zero yields -∞ and a negative ratio yields NaN; callers supply
/// physical ratios, which are always positive.
pub fn to_db(ratio: f64) -> f64 {
    10.0 * ratio.log10()
}

/// Convert power from watts to dBm.
///
/// # Formula
///
/// ```text
/// P(dBm) = 30 + 10 × log₁₀(P(W))
/// ```
///
/// # Examples
///
/// ```text
/// 1 W     → 30 dBm
/// 1 mW    → 0 dBm
/// 100 W   → 50 dBm
/// ```
pub fn watt_to_dbm(watt: f64) -> f64 {
    30.0 + to_db(watt)
}

/// Convert power from dBm to watts. Inverse of [`watt_to_dbm`].
///
/// ```text
/// P(W) = 10^((P(dBm) - 30) / 10)
/// ```
pub fn dbm_to_watt(dbm: f64) -> f64 {
    10f64.powf((dbm - 30.0) / 10.0)
}

/// Peak gain of a circular aperture antenna, in dB.
///
/// # Formula
///
/// ```text
/// G = η × (π × D / λ)²
/// ```
///
/// Where:
/// - `η`: aperture efficiency, 0..=1
/// - `D`: antenna diameter [m]
/// - `λ`: wavelength [m]
pub fn antenna_efficiency_gain(efficiency: f64, diameter: f64, wavelength: f64) -> f64 {
    let peak_gain = efficiency * (PI * diameter / wavelength).powi(2);
    to_db(peak_gain)
}

/// Gain of a Gaussian-beam transmitter (laser terminal), in dB.
///
/// # Formula
///
/// ```text
/// G = 2 × (2π × w₀ / λ)²
/// ```
///
/// Where `w₀` is the beam waist radius [m] and `λ` the wavelength [m].
pub fn gaussian_beam_gain(waist_radius: f64, wavelength: f64) -> f64 {
    let gain = 2.0 * (2.0 * PI * waist_radius / wavelength).powi(2);
    to_db(gain)
}

/// Free-space path loss over a straight path, as a (negative) gain in dB.
///
/// # Formula
///
/// ```text
/// Ls = (λ / (4π × S))²
/// ```
///
/// Where `S` is the distance between transmitter and receiver [m].
pub fn free_space_loss(distance: f64, wavelength: f64) -> f64 {
    let loss = (wavelength / (4.0 * PI * distance)).powi(2);
    to_db(loss)
}

/// Slant range between a ground station and a spacecraft [m].
///
/// Both altitudes are measured above the shared reference sphere
/// ([`EARTH_RADIUS`]); `elevation_angle` is the elevation of the spacecraft
/// above the ground station's horizon, in degrees.
///
/// The triangle origin / ground station / spacecraft is solved with the sine
/// rule. The angle at the ground station is `90° + elevation` (or
/// `270° - elevation` past zenith). Alignments with the origin have no
/// triangle and are handled explicitly:
/// - `90°`: spacecraft straight overhead, `S = |r_sc - r_gs|`
/// - `-90°` or `270°`: path passes through the origin, `S = r_sc + r_gs`
///
/// Returns `None` when no such triangle exists, e.g. a spacecraft below the
/// ground station's altitude seen above its horizon, or an angle outside
/// `[-90°, 270°]`.
pub fn slant_distance(sc_altitude: f64, gs_altitude: f64, elevation_angle: f64) -> Option<f64> {
    let r_sc = sc_altitude + EARTH_RADIUS;
    let r_gs = gs_altitude + EARTH_RADIUS;

    if (elevation_angle - 90.0).abs() < ANGLE_EPSILON {
        return Some((r_sc - r_gs).abs());
    }
    if (elevation_angle + 90.0).abs() < ANGLE_EPSILON || (elevation_angle - 270.0).abs() < ANGLE_EPSILON {
        return Some(r_sc + r_gs);
    }

    let gs_angle = if elevation_angle < 90.0 { 90.0 + elevation_angle } else { 270.0 - elevation_angle };
    let sine_ratio = r_sc / gs_angle.to_radians().sin();
    let sc_sine = r_gs / sine_ratio;
    if !(0.0..=1.0).contains(&sc_sine) {
        return None;
    }

    let sc_angle = sc_sine.asin().to_degrees();
    let origin_angle = 180.0 - gs_angle - sc_angle;
    if origin_angle < 0.0 {
        return None;
    }
    Some(sine_ratio * origin_angle.to_radians().sin())
}

/// Free-space path loss between a ground station and a spacecraft, in dB.
///
/// Combines [`slant_distance`] and [`free_space_loss`]; `None` when the
/// geometry has no slant range.
pub fn free_space_loss_geometric(sc_altitude: f64, gs_altitude: f64, elevation_angle: f64, wavelength: f64) -> Option<f64> {
    slant_distance(sc_altitude, gs_altitude, elevation_angle).map(|distance| free_space_loss(distance, wavelength))
}

/// Surface conditions for the atmospheric gas attenuation model.
#[derive(Debug, Clone, Copy)]
pub struct AtmosphericConditions {
    /// Surface air temperature [K].
    pub air_temperature: f64,
    /// Surface air pressure [Pa].
    pub air_pressure: f64,
    /// Surface water-vapour density [kg/m³].
    pub water_vapor_density: f64,
    /// Carrier wavelength [m].
    pub wavelength: f64,
}

/// Quantities in the units the ITU-R approximation is written in.
struct ReducedConditions {
    /// Frequency [GHz].
    f: f64,
    /// Water-vapour density [g/m³].
    rho: f64,
    /// Pressure ratio against 1013 hPa.
    rp: f64,
    /// Temperature ratio against 288 K.
    rt: f64,
}

impl AtmosphericConditions {
    /// Carrier frequency [GHz].
    pub fn frequency_ghz(&self) -> f64 {
        wavelength_to_freq(self.wavelength) * 1e-9
    }

    fn reduced(&self) -> ReducedConditions {
        let t = self.air_temperature - 273.15; // [°C]
        let p = self.air_pressure * 1e-2; // [hPa]
        let rho = self.water_vapor_density * 1e3; // [g/m³]

        let vapour_pressure = rho * (t + 273.15) / 216.7; // [hPa]
        let total_pressure = p + vapour_pressure;

        ReducedConditions {
            f: self.frequency_ghz(),
            rho,
            rp: total_pressure / 1013.0,
            rt: 288.0 / (273.0 + t),
        }
    }
}

fn phi(rp: f64, rt: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    rp.powf(a) * rt.powf(b) * (c * (1.0 - rp) + d * (1.0 - rt)).exp()
}

fn g(f: f64, fi: f64) -> f64 {
    1.0 + ((f - fi) / (f + fi)).powi(2)
}

/// Zenith attenuation by dry air [dB], valid up to 54 GHz.
///
/// Specific attenuation `γ₀` [dB/km] multiplied by the equivalent dry-air
/// height `h₀` [km].
pub fn dry_air_attenuation(conditions: &AtmosphericConditions) -> f64 {
    let ReducedConditions { f, rp, rt, .. } = conditions.reduced();

    let xi1 = phi(rp, rt, 0.0717, -1.8132, 0.0156, -1.6515);
    let xi2 = phi(rp, rt, 0.5146, -4.6368, -0.1921, -5.7416);
    let xi3 = phi(rp, rt, 0.3414, -6.5851, 0.2130, -8.5854);

    let gamma0 = ((7.2 * rt.powf(2.8)) / (f.powi(2) + 0.34 * rp.powi(2) * rt.powf(1.6))
        + (0.62 * xi3) / ((54.0 - f).powf(1.16 * xi1) + 0.83 * xi2))
        * f.powi(2)
        * rp.powi(2)
        * 1e-3;

    let t1 = 4.64 / (1.0 + 0.066 * rp.powf(-2.3)) * (-((f - 59.7) / (2.87 + 12.4 * (-7.9 * rp).exp())).powi(2)).exp();
    let t2 = 0.14 * (2.12 * rp).exp() / ((f - 118.75).powi(2) + 0.031 * (2.2 * rp).exp());
    let t3 = 0.0114 / (1.0 + 0.14 * rp.powf(-2.6)) * f * (-0.0247 + 0.0001 * f + 1.61e-6 * f.powi(2))
        / (1.0 - 0.0169 * f + 4.1e-5 * f.powi(2) + 3.2e-7 * f.powi(3));
    let h0 = 6.1 / (1.0 + 0.17 * rp.powf(1.1)) * (1.0 + t1 + t2 + t3);

    h0 * gamma0
}

/// Zenith attenuation by water vapour [dB], valid up to 350 GHz.
///
/// Specific attenuation `γw` [dB/km] multiplied by the equivalent wet-air
/// height `hw` [km].
pub fn wet_air_attenuation(conditions: &AtmosphericConditions) -> f64 {
    let ReducedConditions { f, rho, rp, rt } = conditions.reduced();

    let eta1 = 0.955 * rp * rt.powf(0.68) + 0.006 * rho;
    let eta2 = 0.735 * rp * rt.powf(0.5) + 0.0353 * rt.powi(4) * rho;
    let line = |strength: f64, eta: f64, exponent: f64, centre: f64, width: f64| {
        strength * eta * (exponent * (1.0 - rt)).exp() / ((f - centre).powi(2) + width * eta.powi(2))
    };

    let gamma1 = g(f, 22.0) * line(3.98, eta1, 2.23, 22.235, 9.42) + line(11.96, eta1, 0.7, 183.31, 11.14);
    let gamma2 = line(0.081, eta1, 6.44, 321.226, 6.29) + line(3.66, eta1, 1.6, 325.153, 9.22);
    let gamma3 = line(25.37, eta1, 1.09, 380.0, 0.0) + line(17.4, eta1, 1.46, 448.0, 0.0);
    let gamma4 = g(f, 557.0) * line(844.6, eta1, 0.17, 557.0, 0.0) + g(f, 752.0) * line(290.0, eta1, 0.41, 752.0, 0.0);
    let gamma5 = g(f, 1780.0) * line(8.3328e4, eta2, 0.99, 1780.0, 0.0);
    let gamma_w = (gamma1 + gamma2 + gamma3 + gamma4 + gamma5) * f.powi(2) * rt.powf(2.5) * rho * 1e-4;

    let sigma_w = 1.013 / (1.0 + (-8.6 * (rp - 0.57)).exp());
    let t1 = (1.39 * sigma_w) / ((f - 22.235).powi(2) + 2.56 * sigma_w);
    let t2 = (3.37 * sigma_w) / ((f - 183.31).powi(2) + 4.69 * sigma_w);
    let t3 = (1.58 * sigma_w) / ((f - 325.1).powi(2) + 2.89 * sigma_w);
    let hw = 1.66 * (1.0 + t1 + t2 + t3);

    gamma_w * hw
}

/// Slant-path attenuation by atmospheric gases, as a (negative) gain in dB.
///
/// # Formula
///
/// ```text
/// A = -(A_dry + A_wet) / sin(θ)
/// ```
///
/// Where `θ` is the elevation angle in degrees. The cosecant path-length
/// scaling is a flat-Earth approximation and diverges towards the horizon.
///
/// Returns `None` unless `0° < θ <= 90°`.
pub fn atmospheric_attenuation(conditions: &AtmosphericConditions, elevation_angle: f64) -> Option<f64> {
    if !(elevation_angle > 0.0 && elevation_angle <= 90.0) {
        return None;
    }
    let zenith = dry_air_attenuation(conditions) + wet_air_attenuation(conditions);
    Some(-zenith / elevation_angle.to_radians().sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::units::{SPEED_OF_LIGHT, freq_to_wavelength};

    fn assert_close(expected: f64, actual: f64, tol: f64) {
        assert!((expected - actual).abs() < tol, "expected {expected}, got {actual}");
    }

    fn sea_level(wavelength: f64) -> AtmosphericConditions {
        AtmosphericConditions {
            air_temperature: 288.15,
            air_pressure: 101_300.0,
            water_vapor_density: 7.5e-3,
            wavelength,
        }
    }

    #[test]
    fn efficiency_gain_reference_dish() {
        assert_close(-31.026102676197887, antenna_efficiency_gain(0.8, 1.0, 100.0), 1e-9);
        // 1 m optical aperture at 1550 nm
        assert_close(126.136, antenna_efficiency_gain(1.0, 1.0, 1550e-9), 1e-3);
    }

    #[test]
    fn gaussian_beam_gain_optical_terminal() {
        assert_close(103.021, gaussian_beam_gain(24.7e-3, 1550e-9), 1e-3);
    }

    #[test]
    fn free_space_loss_is_negative_and_grows_with_distance() {
        let near = free_space_loss(1500.0, 10.0);
        let far = free_space_loss(15_000.0, 10.0);
        assert_close(-65.50602246155555, near, 1e-9);
        assert!(far < near);
        assert_close(20.0, near - far, 1e-9);
    }

    #[test]
    fn free_space_loss_uhf_pass() {
        let wavelength = SPEED_OF_LIGHT / 437e6;
        assert_close(-147.558, free_space_loss(1303.28e3, wavelength), 1e-3);
    }

    #[test]
    fn slant_distance_low_elevation() {
        assert_close(1726.3249147380145, slant_distance(300.0, 0.0, 10.0).unwrap(), 1e-6);
        assert_close(1_694_567.22, slant_distance(500e3, 0.0, 10.0).unwrap(), 1e-2);
    }

    #[test]
    fn slant_distance_aligned_with_origin() {
        assert_eq!(slant_distance(500e3, 0.0, 90.0), Some(500e3));
        assert_eq!(slant_distance(0.0, 500e3, 90.0), Some(500e3));
        let through_origin = 2.0 * EARTH_RADIUS + 500e3;
        assert_eq!(slant_distance(500e3, 0.0, -90.0), Some(through_origin));
        assert_eq!(slant_distance(500e3, 0.0, 270.0), Some(through_origin));
        for angle in [90.0, -90.0, 270.0] {
            assert!(slant_distance(500e3, 0.0, angle).unwrap().is_finite());
        }
    }

    #[test]
    fn slant_distance_without_triangle() {
        // ground station above the spacecraft, looking up
        assert_eq!(slant_distance(0.0, 500e3, 10.0), None);
        assert_eq!(free_space_loss_geometric(0.0, 500e3, 10.0, 0.3), None);
        assert_eq!(slant_distance(500e3, 0.0, 300.0), None);
        assert_eq!(slant_distance(500e3, 0.0, -120.0), None);
        // barely above the spacecraft's altitude, looking just above the horizon
        assert_eq!(slant_distance(0.0, 70e3, 10.0), None);
        // looking down at a lower spacecraft still closes
        assert!(slant_distance(0.0, 500e3, -30.0).is_some_and(f64::is_finite));
    }

    #[test]
    fn slant_distance_symmetric_about_zenith() {
        let before = slant_distance(500e3, 0.0, 60.0).unwrap();
        let after = slant_distance(500e3, 0.0, 120.0).unwrap();
        assert_close(before, after, 1e-6);
    }

    #[test]
    fn geometric_loss_reference_scenario() {
        assert_close(-66.72664804890425, free_space_loss_geometric(300.0, 0.0, 10.0, 10.0).unwrap(), 1e-9);
    }

    #[test]
    fn atmospheric_attenuation_x_band() {
        let conditions = sea_level(freq_to_wavelength(10e9));
        assert_close(10.0, conditions.frequency_ghz(), 1e-9);
        assert_close(0.042010, dry_air_attenuation(&conditions), 1e-5);
        assert_close(0.011181, wet_air_attenuation(&conditions), 1e-5);
        assert_close(-0.306320, atmospheric_attenuation(&conditions, 10.0).unwrap(), 1e-5);
        assert_close(-0.053192, atmospheric_attenuation(&conditions, 90.0).unwrap(), 1e-5);
    }

    #[test]
    fn atmospheric_attenuation_peaks_at_water_line() {
        let x_band = atmospheric_attenuation(&sea_level(freq_to_wavelength(10e9)), 30.0).unwrap();
        let water_line = atmospheric_attenuation(&sea_level(freq_to_wavelength(22.235e9)), 30.0).unwrap();
        assert_close(-1.043192, water_line, 1e-5);
        assert!(water_line < x_band);
    }

    #[test]
    fn atmospheric_attenuation_negligible_at_hf() {
        let loss = atmospheric_attenuation(&sea_level(SPEED_OF_LIGHT / 2e6), 10.0).unwrap();
        assert!(loss <= 0.0 && loss > -1e-4);
    }

    #[test]
    fn atmospheric_attenuation_needs_positive_elevation() {
        let conditions = sea_level(freq_to_wavelength(22.235e9));
        for angle in [0.0, -10.0, 90.5, 180.0] {
            assert_eq!(atmospheric_attenuation(&conditions, angle), None, "elevation {angle}");
        }
    }

    #[test]
    fn dbm_watt_conversion_roundtrip() {
        assert_close(30.0, watt_to_dbm(1.0), 1e-12);
        assert_close(0.0, watt_to_dbm(1e-3), 1e-12);
        for dbm in [-100.0, -30.0, 0.0, 30.0, 65.0] {
            assert_close(dbm, watt_to_dbm(dbm_to_watt(dbm)), 1e-9);
        }
    }
}

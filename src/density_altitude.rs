//! Density altitude from station readings.
//!
//! Two closed-form models are provided. Neither sanitises its inputs: meteorologically
//! impossible readings (negative pressure, say) produce NaN, which is passed on as a value.

/// Standard temperature lapse rate (K/m)
const LAPSE_RATE: f64 = 0.0065;
/// Sea level standard temperature (K)
const T_SEA_LEVEL_K: f64 = 288.15;
/// Sea level standard pressure (inHg)
const P_SEA_LEVEL_INHG: f64 = 29.92;
/// Gravitational acceleration (m/s²)
const G_ACCEL: f64 = 9.80665;
/// Molar mass of dry air (kg/mol)
const M_AIR: f64 = 0.028964;
/// Universal gas constant (J/(mol·K))
const R_GAS: f64 = 8.3144598;

const FEET_PER_METER: f64 = 3.28084;
const MB_PER_INHG: f64 = 33.8639;
/// Ratio of molar masses of water vapor and dry air
const EPSILON: f64 = 0.622;

pub fn fahrenheit_to_kelvin(temp_f: f64) -> f64 {
    (temp_f - 32.0) * (5.0 / 9.0) + 273.15
}

fn fahrenheit_to_celsius(temp_f: f64) -> f64 {
    (temp_f - 32.0) * (5.0 / 9.0)
}

/// Density altitude (ft) assuming dry air and standard atmosphere lapse rates.
///
/// Implements the barometric form
/// `h = (T0/L) * (1 - ((P/P0) / (T/T0))^k) * ft_per_m` with `k = 1 / (gM/(LR) - 1)`.
pub fn dry_air(temp_f: f64, press_inhg: f64) -> f64 {
    let press_ratio = press_inhg / P_SEA_LEVEL_INHG;
    let temp_ratio = fahrenheit_to_kelvin(temp_f) / T_SEA_LEVEL_K;

    let k = 1.0 / ((G_ACCEL * M_AIR) / (LAPSE_RATE * R_GAS) - 1.0);

    (T_SEA_LEVEL_K / LAPSE_RATE) * (1.0 - (press_ratio / temp_ratio).powf(k)) * FEET_PER_METER
}

/// Saturation vapor pressure (mb) at the given dew point (°C).
fn vapor_pressure_mb(dew_point_c: f64) -> f64 {
    6.11 * 10f64.powf((7.5 * dew_point_c) / (237.7 + dew_point_c))
}

/// Density altitude (ft) including humidity through a virtual temperature correction.
pub fn wet_air(temp_f: f64, press_inhg: f64, dew_point_f: f64) -> f64 {
    let vapor_press = vapor_pressure_mb(fahrenheit_to_celsius(dew_point_f));
    let press_mb = press_inhg * MB_PER_INHG;

    let virtual_temp_k =
        fahrenheit_to_kelvin(temp_f) / (1.0 - (vapor_press / press_mb) * (1.0 - EPSILON));
    let virtual_temp_r = virtual_temp_k * 1.8;

    145_366.0 * (1.0 - ((17.326 * press_inhg) / virtual_temp_r).powf(0.235))
}

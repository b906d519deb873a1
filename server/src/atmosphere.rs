//! Rough standard-atmosphere estimates from altitude (km).

const SEA_LEVEL_PRESSURE_HPA: f64 = 1013.25;
const SCALE_HEIGHT_KM: f64 = 7.5;
const TROPOPAUSE_KM: f64 = 11.0;
const STRATOPAUSE_LOWER_KM: f64 = 20.0;
const TROPOPAUSE_TEMP_C: f64 = -56.5;

pub fn pressure_hpa(altitude_km: f64) -> f64 {
    SEA_LEVEL_PRESSURE_HPA * (-altitude_km / SCALE_HEIGHT_KM).exp()
}

/// Linear lapse in the troposphere, isothermal up to 20 km, then warming
/// at 1 °C per km.
pub fn temperature_c(altitude_km: f64) -> f64 {
    if altitude_km < TROPOPAUSE_KM {
        15.0 - 6.5 * altitude_km
    } else if altitude_km < STRATOPAUSE_LOWER_KM {
        TROPOPAUSE_TEMP_C
    } else {
        TROPOPAUSE_TEMP_C + (altitude_km - STRATOPAUSE_LOWER_KM)
    }
}

//! Absolute humidity conversion
//!
//! The SGP30 compensates its IAQ output for water vapour when fed the
//! absolute humidity in mg/m³. It is derived from relative humidity and
//! temperature with a saturation vapour density table and integer-only
//! interpolation.

use crate::sample::Climate;
use crate::traits::SensorError;

/// Saturation vapour density lookup table
///
/// Table format: (temperature_x100, density_mg_per_m3)
/// Generated from the Magnus formula:
/// - rho = 216.7 * 6.112 * exp(17.62 * T / (243.12 + T)) / (273.15 + T) g/m³
///
/// Temperature range: -20°C to 70°C
const SATURATION_TABLE: &[(i32, u32)] = &[
    (-2000, 1_078),
    (-1500, 1_611),
    (-1000, 2_364),
    (-500, 3_412),
    (0, 4_849),
    (500, 6_792),
    (1000, 9_383),
    (1500, 12_797),
    (2000, 17_243),
    (2500, 22_968),
    (3000, 30_264),
    (3500, 39_471),
    (4000, 50_983),
    (4500, 65_250),
    (5000, 82_785),
    (5500, 104_168),
    (6000, 130_048),
    (6500, 161_150),
    (7000, 198_277),
];

/// Saturation vapour density in mg/m³ at the given temperature (0.01 °C)
pub fn saturation_density_mg_m3(celsius_x100: i32) -> Result<u32, SensorError> {
    let first = SATURATION_TABLE[0];
    let last = SATURATION_TABLE[SATURATION_TABLE.len() - 1];
    if celsius_x100 < first.0 || celsius_x100 > last.0 {
        return Err(SensorError::OutOfRange);
    }

    for pair in SATURATION_TABLE.windows(2) {
        let (t_low, d_low) = pair[0];
        let (t_high, d_high) = pair[1];

        if celsius_x100 >= t_low && celsius_x100 <= t_high {
            // density = d_low + (d_high - d_low) * (t - t_low) / (t_high - t_low)
            let d_range = (d_high - d_low) as i64;
            let t_range = (t_high - t_low) as i64;
            let t_offset = (celsius_x100 - t_low) as i64;
            return Ok(d_low + (d_range * t_offset / t_range) as u32);
        }
    }

    Err(SensorError::OutOfRange)
}

/// Absolute humidity in mg/m³
///
/// Relative humidity is clamped to 0..=100 %RH; the Si7021 can report
/// slightly outside that range.
pub fn absolute_humidity_mg_m3(climate: &Climate) -> Result<u32, SensorError> {
    let saturation = saturation_density_mg_m3(climate.celsius_x100)?;
    let rh = climate.rh_x100.clamp(0, 10_000) as u64;
    Ok((saturation as u64 * rh / 10_000) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn climate(rh_x100: i32, celsius_x100: i32) -> Climate {
        Climate {
            rh_x100,
            celsius_x100,
        }
    }

    #[test]
    fn test_table_points() {
        assert_eq!(saturation_density_mg_m3(2500), Ok(22_968));
        assert_eq!(saturation_density_mg_m3(-2000), Ok(1_078));
        assert_eq!(saturation_density_mg_m3(7000), Ok(198_277));
    }

    #[test]
    fn test_interpolation() {
        assert_eq!(saturation_density_mg_m3(2250), Ok(20_105));
        // Monotonic across the table
        let mut previous = 0;
        for t in (-2000..=7000).step_by(37) {
            let d = saturation_density_mg_m3(t).unwrap();
            assert!(d >= previous);
            previous = d;
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            saturation_density_mg_m3(-2001),
            Err(SensorError::OutOfRange)
        );
        assert_eq!(saturation_density_mg_m3(7001), Err(SensorError::OutOfRange));
    }

    #[test]
    fn test_absolute_humidity() {
        assert_eq!(absolute_humidity_mg_m3(&climate(5000, 2500)), Ok(11_484));
        assert_eq!(absolute_humidity_mg_m3(&climate(10_000, 2000)), Ok(17_243));
        assert_eq!(absolute_humidity_mg_m3(&climate(0, 2000)), Ok(0));
    }

    #[test]
    fn test_rh_clamped() {
        assert_eq!(absolute_humidity_mg_m3(&climate(-300, 2500)), Ok(0));
        assert_eq!(absolute_humidity_mg_m3(&climate(10_450, 2500)), Ok(22_968));
    }
}

//! Conversion of echo durations into distances.

use libm::sqrt;

/// Microseconds sound needs to travel one centimeter (about 340 m/s).
pub const MICROSECONDS_PER_CM: f64 = 29.388;

/// Microseconds sound needs to travel one inch.
pub const MICROSECONDS_PER_INCH: f64 = 74.647;

/// Duration reported for an unknown channel selector.
pub const INVALID_CHANNEL_DURATION: f64 = -1.0;

/// The distance unit to use for measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum DistanceUnit {
    Centimeters,
    Inches,
}

/// The temperature unit to use for compensated measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

/// Distance to the obstacle for an echo lasting `microseconds`.
/// The echo covers the way out and back, hence the division by two.
pub fn microseconds_to_centimeters(microseconds: f64) -> f64 {
    microseconds / MICROSECONDS_PER_CM / 2.0
}

pub fn microseconds_to_inches(microseconds: f64) -> f64 {
    microseconds / MICROSECONDS_PER_INCH / 2.0
}

/// Convert an echo duration using the fixed speed of sound.
pub fn convert(microseconds: f64, unit: DistanceUnit) -> f64 {
    match unit {
        DistanceUnit::Centimeters => microseconds_to_centimeters(microseconds),
        DistanceUnit::Inches => microseconds_to_inches(microseconds),
    }
}

/// Speed of sound in meters per second, adjusted for the air temperature.
pub fn speed_of_sound(temperature: f64, unit: TemperatureUnit) -> f64 {
    let celsius = match unit {
        TemperatureUnit::Celsius => temperature,
        TemperatureUnit::Fahrenheit => (temperature - 32.0) * 5.0 / 9.0,
    };
    331.5 * sqrt(1.0 + (celsius / 273.15))
}

/// Convert an echo duration using a temperature adjusted speed of sound.
pub fn convert_compensated(
    microseconds: f64,
    unit: DistanceUnit,
    temperature: f64,
    temperature_unit: TemperatureUnit,
) -> f64 {
    let duration_secs = microseconds / 1_000_000.0;
    let centimeters = speed_of_sound(temperature, temperature_unit) * 100.0 * duration_secs / 2.0;
    match unit {
        DistanceUnit::Centimeters => centimeters,
        DistanceUnit::Inches => centimeters / 2.54,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libm::round;

    #[test]
    fn centimeters_for_one_meter_echo() {
        // 1m out and back at 29.388us/cm
        assert!((microseconds_to_centimeters(5877.6) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_is_zero_distance() {
        assert_eq!(microseconds_to_centimeters(0.0), 0.0);
        assert_eq!(microseconds_to_inches(0.0), 0.0);
    }

    #[test]
    fn unit_ratio_is_constant() {
        let expected = MICROSECONDS_PER_INCH / MICROSECONDS_PER_CM;
        for d in [1.0, 58.0, 580.0, 5_877.6, 23_200.0, 38_000.0] {
            let ratio = microseconds_to_centimeters(d) / microseconds_to_inches(d);
            assert!((ratio - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn sentinel_duration_converts_to_small_negative_distance() {
        let cm = microseconds_to_centimeters(INVALID_CHANNEL_DURATION);
        assert!((cm - (-0.017)).abs() < 0.001);
        assert!(microseconds_to_inches(INVALID_CHANNEL_DURATION) < 0.0);
    }

    #[test]
    fn convert_dispatches_on_unit() {
        assert_eq!(convert(580.0, DistanceUnit::Centimeters), microseconds_to_centimeters(580.0));
        assert_eq!(convert(580.0, DistanceUnit::Inches), microseconds_to_inches(580.0));
    }

    #[test]
    fn speed_of_sound_temperature_adjusted() {
        assert_eq!(round(speed_of_sound(0.0, TemperatureUnit::Celsius)), round(331.5));
        assert_eq!(round(speed_of_sound(20.0, TemperatureUnit::Celsius)), round(343.42));
        assert_eq!(round(speed_of_sound(40.0, TemperatureUnit::Celsius)), round(354.94));
    }

    #[test]
    fn can_use_fahrenheit() {
        assert_eq!(round(speed_of_sound(32.0, TemperatureUnit::Fahrenheit)), round(331.5));
    }

    #[test]
    fn compensated_distance_for_10ms_echo() {
        let cm = convert_compensated(10_000.0, DistanceUnit::Centimeters, 20.0, TemperatureUnit::Celsius);
        assert_eq!(round(cm), round(171.7));
        let inches = convert_compensated(10_000.0, DistanceUnit::Inches, 20.0, TemperatureUnit::Celsius);
        assert_eq!(round(inches), round(67.6));
    }
}

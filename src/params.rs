//! # Plugin Parameters
//!
//! The controls are grouped the way the delay is specified:
//!
//! - **Mode** picks one of three groups: Samples, Distance or Time.
//!   Only the active group affects the delay.
//! - **Distance** has a coarse Meters control, a fine Centimeters control
//!   and the air Temperature, which sets the speed of sound.
//! - **Dry**, **Wet** and **Output** are independent gains. They are
//!   stored as linear multipliers and displayed in dB.
//!
//! IDs are saved in host projects and presets. Never change them.
//!
//! No smoothers are attached. The engine reads one snapshot per block and
//! applies it as-is, so automation moves the read head in whole-sample
//! steps at block boundaries.

use nih_plug::prelude::*;

use crate::dsp::resolver::{
    DelayParams, DelaySetting, CENTIMETERS_MAX, METERS_MAX, SAMPLES_MAX, TEMPERATURE_MAX,
    TEMPERATURE_MIN, TIME_MAX_SECONDS,
};

/// Highest gain any of the three gain controls reaches.
const GAIN_MAX_DB: f32 = 12.0;

/// Which control group sets the delay.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayMode {
    #[id = "samples"]
    #[name = "Samples"]
    Samples,

    #[id = "distance"]
    #[name = "Distance"]
    Distance,

    #[id = "time"]
    #[name = "Time"]
    Time,
}

#[derive(Params)]
pub struct CompDelayParams {
    /// Output equals input when on. Registered as the host's bypass so a
    /// DAW's own bypass button drives it; the delay line keeps running.
    #[id = "bypass"]
    pub bypass: BoolParam,

    #[id = "out"]
    pub output_gain: FloatParam,

    #[id = "dry"]
    pub dry_gain: FloatParam,

    #[id = "wet"]
    pub wet_gain: FloatParam,

    #[id = "mode"]
    pub mode: EnumParam<DelayMode>,

    #[id = "samp"]
    pub samples: IntParam,

    #[id = "m"]
    pub meters: FloatParam,

    #[id = "cm"]
    pub centimeters: FloatParam,

    /// Air temperature in °C. Also used by the distance meter in every
    /// mode.
    #[id = "temp"]
    pub temperature: FloatParam,

    /// Delay time in milliseconds.
    #[id = "time"]
    pub time_ms: FloatParam,
}

impl CompDelayParams {
    /// Read every control once into an immutable snapshot for the engine.
    pub fn snapshot(&self) -> DelayParams {
        let delay = match self.mode.value() {
            DelayMode::Samples => DelaySetting::Samples {
                samples: self.samples.value(),
            },
            DelayMode::Distance => DelaySetting::Distance {
                meters: self.meters.value(),
                centimeters: self.centimeters.value(),
            },
            DelayMode::Time => DelaySetting::Time {
                seconds: self.time_ms.value() / 1000.0,
            },
        };

        DelayParams {
            delay,
            temperature: self.temperature.value(),
            dry_gain: self.dry_gain.value(),
            wet_gain: self.wet_gain.value(),
            output_gain: self.output_gain.value(),
            bypass: self.bypass.value(),
        }
    }
}

/// A linear gain control from silence up to [`GAIN_MAX_DB`], shown in dB.
fn gain_param(name: &str, default: f32, min: f32) -> FloatParam {
    FloatParam::new(
        name,
        default,
        FloatRange::Skewed {
            min,
            max: util::db_to_gain(GAIN_MAX_DB),
            factor: FloatRange::gain_skew_factor(-60.0, GAIN_MAX_DB),
        },
    )
    .with_unit(" dB")
    .with_value_to_string(formatters::v2s_f32_gain_to_db(2))
    .with_string_to_value(formatters::s2v_f32_gain_to_db())
}

impl Default for CompDelayParams {
    fn default() -> Self {
        Self {
            bypass: BoolParam::new("Bypass", false).make_bypass(),

            // Output never goes fully silent; it starts at unity.
            output_gain: gain_param("Output", util::db_to_gain(0.0), util::db_to_gain(0.0)),

            // Dry is off by default: the usual job is to replace the
            // signal with its delayed copy, not to blend them.
            dry_gain: gain_param("Dry Amount", 0.0, 0.0),
            wet_gain: gain_param("Wet Amount", util::db_to_gain(0.0), 0.0),

            mode: EnumParam::new("Mode", DelayMode::Samples),

            samples: IntParam::new(
                "Samples",
                0,
                IntRange::Linear {
                    min: 0,
                    max: SAMPLES_MAX,
                },
            )
            .with_unit(" smp"),

            meters: FloatParam::new(
                "Meters",
                0.0,
                FloatRange::Linear {
                    min: 0.0,
                    max: METERS_MAX,
                },
            )
            .with_unit(" m")
            .with_step_size(0.01),

            centimeters: FloatParam::new(
                "Centimeters",
                0.0,
                FloatRange::Linear {
                    min: 0.0,
                    max: CENTIMETERS_MAX,
                },
            )
            .with_unit(" cm")
            .with_step_size(0.1),

            temperature: FloatParam::new(
                "Temperature",
                20.0,
                FloatRange::Linear {
                    min: TEMPERATURE_MIN,
                    max: TEMPERATURE_MAX,
                },
            )
            .with_unit(" °C")
            .with_step_size(0.1),

            time_ms: FloatParam::new(
                "Time",
                0.0,
                FloatRange::Skewed {
                    min: 0.0,
                    max: TIME_MAX_SECONDS * 1000.0,
                    // More knob travel for the short delays used for alignment.
                    factor: FloatRange::skew_factor(-2.0),
                },
            )
            .with_unit(" ms")
            .with_step_size(0.01),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_matches_engine_defaults() {
        let params = CompDelayParams::default();
        assert_eq!(params.snapshot(), DelayParams::default());
    }

    #[test]
    fn test_gain_ranges_reach_silence_and_plus_12_db() {
        let params = CompDelayParams::default();
        // Normalized 0.0 is the bottom of the range.
        assert_eq!(params.dry_gain.preview_plain(0.0), 0.0);
        assert!((params.wet_gain.preview_plain(1.0) - util::db_to_gain(12.0)).abs() < 1e-4);
        assert!((params.output_gain.preview_plain(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_control_ranges() {
        let params = CompDelayParams::default();
        assert_eq!(params.samples.preview_plain(1.0), SAMPLES_MAX);
        assert!((params.meters.preview_plain(1.0) - METERS_MAX).abs() < 1e-3);
        assert!((params.temperature.preview_plain(0.0) - TEMPERATURE_MIN).abs() < 1e-3);
        assert!((params.time_ms.preview_plain(1.0) - 1000.0).abs() < 1e-2);
    }

    fn linear(name: &str, value: f32, min: f32, max: f32) -> FloatParam {
        FloatParam::new(name, value, FloatRange::Linear { min, max })
    }

    #[test]
    fn test_distance_mode_snapshot_carries_meters_and_centimeters() {
        let params = CompDelayParams {
            mode: EnumParam::new("Mode", DelayMode::Distance),
            meters: linear("Meters", 3.0, 0.0, METERS_MAX),
            centimeters: linear("Centimeters", 27.5, 0.0, CENTIMETERS_MAX),
            temperature: linear("Temperature", -5.0, TEMPERATURE_MIN, TEMPERATURE_MAX),
            ..CompDelayParams::default()
        };

        let snapshot = params.snapshot();
        assert_eq!(
            snapshot.delay,
            DelaySetting::Distance {
                meters: 3.0,
                centimeters: 27.5,
            }
        );
        assert_eq!(snapshot.temperature, -5.0);
    }

    #[test]
    fn test_time_mode_snapshot_converts_ms_to_seconds() {
        let params = CompDelayParams {
            mode: EnumParam::new("Mode", DelayMode::Time),
            time_ms: linear("Time", 250.0, 0.0, TIME_MAX_SECONDS * 1000.0),
            // Values of inactive groups must not leak into the setting.
            meters: linear("Meters", 12.0, 0.0, METERS_MAX),
            ..CompDelayParams::default()
        };

        assert_eq!(params.snapshot().delay, DelaySetting::Time { seconds: 0.25 });
    }

    #[test]
    fn test_samples_mode_snapshot_ignores_other_groups() {
        let params = CompDelayParams {
            samples: IntParam::new(
                "Samples",
                137,
                IntRange::Linear {
                    min: 0,
                    max: SAMPLES_MAX,
                },
            ),
            time_ms: linear("Time", 500.0, 0.0, TIME_MAX_SECONDS * 1000.0),
            ..CompDelayParams::default()
        };

        assert_eq!(
            params.snapshot().delay,
            DelaySetting::Samples { samples: 137 }
        );
    }
}

//! # Delay Resolver
//!
//! Turns whatever the user dialed in (a sample count, a physical distance
//! or a time) into one whole number of samples. Everything downstream,
//! including the meters, works from that integer.
//!
//! ## Distance to Samples
//!
//! Sound travels through air at a speed that depends on temperature. The
//! usual linear approximation around 0 °C is:
//!
//! ```text
//! c = 331.3 + 0.606 * T      (m/s, T in °C)
//! ```
//!
//! At 20 °C that is 343.42 m/s, so one meter of extra distance is
//! `1 / 343.42 ≈ 2.912 ms`, or about 139.8 samples at 48 kHz, which
//! rounds to 140.
//!
//! ## Rounding
//!
//! The engine never does fractional reads. Requested delays are rounded
//! half-to-nearest (`f32::round`, which for the non-negative values seen
//! here rounds halves up), then clamped to the configured maximum.

/// Speed of sound at 0 °C, in m/s.
pub const SPEED_OF_SOUND_AT_ZERO: f32 = 331.3;

/// Change in the speed of sound per °C, in m/s.
pub const SPEED_OF_SOUND_PER_DEGREE: f32 = 0.606;

/// Floor for the speed of sound so extreme negative temperatures can't
/// make the distance conversion divide by zero or go negative.
pub const MIN_SPEED_OF_SOUND: f32 = 1.0;

// Control ranges. The engine sizes its default delay line from these so
// that every reachable setting fits; the plugin's parameters use them as
// their bounds.

/// Largest sample count the Samples control offers.
pub const SAMPLES_MAX: i32 = 10_000;
/// Largest value of the coarse distance control, in m.
pub const METERS_MAX: f32 = 200.0;
/// Largest value of the fine distance control, in cm.
pub const CENTIMETERS_MAX: f32 = 100.0;
/// Temperature range in °C. The coldest end gives the slowest sound and
/// therefore the longest distance delay.
pub const TEMPERATURE_MIN: f32 = -60.0;
pub const TEMPERATURE_MAX: f32 = 60.0;
/// Longest delay the Time control offers, in seconds.
pub const TIME_MAX_SECONDS: f32 = 1.0;

/// How the delay is specified. Exactly one mode is active at a time; the
/// values of inactive modes simply aren't part of the setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DelaySetting {
    /// A raw sample count.
    Samples { samples: i32 },
    /// Extra distance between source and receiver. `meters` and
    /// `centimeters` add up; the temperature used for the conversion is
    /// carried by [`DelayParams`] since metering needs it in every mode.
    Distance { meters: f32, centimeters: f32 },
    /// A time in seconds.
    Time { seconds: f32 },
}

impl Default for DelaySetting {
    fn default() -> Self {
        Self::Samples { samples: 0 }
    }
}

/// One immutable snapshot of every control the engine reads.
///
/// The audio thread takes exactly one of these per block, so a block can
/// never see the mode from one update and the distance from another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayParams {
    pub delay: DelaySetting,
    /// Air temperature in °C. Used by Distance mode and by the distance
    /// meter in all modes.
    pub temperature: f32,
    /// Linear gain of the unprocessed path.
    pub dry_gain: f32,
    /// Linear gain of the delayed path.
    pub wet_gain: f32,
    /// Linear gain applied to the dry + wet sum.
    pub output_gain: f32,
    /// Output equals input while set. The delay line keeps running.
    pub bypass: bool,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            delay: DelaySetting::default(),
            temperature: 20.0,
            dry_gain: 0.0,
            wet_gain: 1.0,
            output_gain: 1.0,
            bypass: false,
        }
    }
}

/// Speed of sound in air at `temperature` °C, in m/s, never below
/// [`MIN_SPEED_OF_SOUND`].
pub fn speed_of_sound(temperature: f32) -> f32 {
    let temperature = finite_or_zero(temperature);
    (SPEED_OF_SOUND_AT_ZERO + SPEED_OF_SOUND_PER_DEGREE * temperature).max(MIN_SPEED_OF_SOUND)
}

/// The delay the user asked for, in seconds, before any rounding or
/// clamping. Negative and non-finite inputs count as zero.
pub fn requested_delay_seconds(params: &DelayParams, sample_rate: f32) -> f32 {
    match params.delay {
        DelaySetting::Samples { samples } => samples.max(0) as f32 / sample_rate,
        DelaySetting::Distance {
            meters,
            centimeters,
        } => {
            let distance = non_negative(meters) + non_negative(centimeters) / 100.0;
            distance / speed_of_sound(params.temperature)
        }
        DelaySetting::Time { seconds } => non_negative(seconds),
    }
}

/// Resolve the active setting into a whole number of samples in
/// `0..=max_delay_samples`.
///
/// Pure: the same inputs always give the same result. Requests beyond the
/// maximum saturate.
pub fn resolve_delay_samples(
    params: &DelayParams,
    sample_rate: f32,
    max_delay_samples: usize,
) -> usize {
    let samples = match params.delay {
        // Already whole; skip the float round trip so large counts stay exact.
        DelaySetting::Samples { samples } => samples.max(0) as usize,
        _ => {
            let exact = requested_delay_seconds(params, sample_rate) * sample_rate;
            // `as usize` saturates, and maps NaN to 0.
            exact.round() as usize
        }
    };

    samples.min(max_delay_samples)
}

/// Clamp to `>= 0`, treating NaN as 0. `f32::max` returns the non-NaN
/// operand, so `NaN.max(0.0) == 0.0`.
fn non_negative(value: f32) -> f32 {
    finite_or_zero(value).max(0.0)
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const SR: f32 = 48000.0;
    const MAX: usize = 48000;

    fn with_delay(delay: DelaySetting) -> DelayParams {
        DelayParams {
            delay,
            ..DelayParams::default()
        }
    }

    #[test]
    fn test_speed_of_sound_at_room_temperature() {
        assert_relative_eq!(speed_of_sound(20.0), 343.42, max_relative = 1e-6);
        assert_relative_eq!(speed_of_sound(0.0), 331.3, max_relative = 1e-6);
    }

    #[test]
    fn test_speed_of_sound_never_drops_to_zero() {
        // 331.3 + 0.606 * -1000 would be -274.7 m/s.
        assert_eq!(speed_of_sound(-1000.0), MIN_SPEED_OF_SOUND);
        assert_eq!(speed_of_sound(f32::NEG_INFINITY), SPEED_OF_SOUND_AT_ZERO);
        assert_eq!(speed_of_sound(f32::NAN), SPEED_OF_SOUND_AT_ZERO);
    }

    #[test]
    fn test_time_mode_one_millisecond() {
        let params = with_delay(DelaySetting::Time { seconds: 0.001 });
        assert_eq!(resolve_delay_samples(&params, SR, MAX), 48);
    }

    #[test]
    fn test_distance_mode_one_meter_at_20c() {
        let params = DelayParams {
            delay: DelaySetting::Distance {
                meters: 1.0,
                centimeters: 0.0,
            },
            temperature: 20.0,
            ..DelayParams::default()
        };
        // 48000 / 343.42 = 139.77 → 140
        assert_eq!(resolve_delay_samples(&params, SR, MAX), 140);
    }

    #[test]
    fn test_meters_and_centimeters_add_up() {
        let split = with_delay(DelaySetting::Distance {
            meters: 1.0,
            centimeters: 50.0,
        });
        let whole = with_delay(DelaySetting::Distance {
            meters: 1.5,
            centimeters: 0.0,
        });
        assert_eq!(
            resolve_delay_samples(&split, SR, MAX),
            resolve_delay_samples(&whole, SR, MAX)
        );
    }

    #[test]
    fn test_colder_air_means_longer_delay() {
        let setting = DelaySetting::Distance {
            meters: 10.0,
            centimeters: 0.0,
        };
        let cold = DelayParams {
            delay: setting,
            temperature: -20.0,
            ..DelayParams::default()
        };
        let warm = DelayParams {
            delay: setting,
            temperature: 40.0,
            ..DelayParams::default()
        };
        assert!(resolve_delay_samples(&cold, SR, MAX) > resolve_delay_samples(&warm, SR, MAX));
    }

    #[test]
    fn test_samples_mode_clamps_to_max() {
        let params = with_delay(DelaySetting::Samples { samples: 5000 });
        assert_eq!(resolve_delay_samples(&params, SR, 1000), 1000);
    }

    #[test]
    fn test_negative_and_nan_inputs_resolve_to_zero() {
        for delay in [
            DelaySetting::Samples { samples: -5 },
            DelaySetting::Time { seconds: -1.0 },
            DelaySetting::Time { seconds: f32::NAN },
            DelaySetting::Distance {
                meters: -3.0,
                centimeters: -40.0,
            },
        ] {
            assert_eq!(resolve_delay_samples(&with_delay(delay), SR, MAX), 0);
        }
    }

    #[test]
    fn test_non_finite_time_is_zero_but_huge_time_saturates() {
        let params = with_delay(DelaySetting::Time {
            seconds: f32::INFINITY,
        });
        // Non-finite counts as zero rather than "as long as possible".
        assert_eq!(resolve_delay_samples(&params, SR, MAX), 0);

        let params = with_delay(DelaySetting::Time { seconds: 1.0e9 });
        assert_eq!(resolve_delay_samples(&params, SR, MAX), MAX);
    }

    #[test]
    fn test_rounds_to_nearest_not_truncates() {
        // 0.5 samples and 1.4 samples at 1 Hz.
        let half = with_delay(DelaySetting::Time { seconds: 0.5 });
        assert_eq!(resolve_delay_samples(&half, 1.0, 10), 1);

        let below = with_delay(DelaySetting::Time { seconds: 1.4 });
        assert_eq!(resolve_delay_samples(&below, 1.0, 10), 1);

        let above = with_delay(DelaySetting::Time { seconds: 1.6 });
        assert_eq!(resolve_delay_samples(&above, 1.0, 10), 2);
    }

    #[test]
    fn test_requested_seconds_is_unrounded() {
        let params = with_delay(DelaySetting::Samples { samples: 480 });
        assert_relative_eq!(requested_delay_seconds(&params, SR), 0.01);

        let params = with_delay(DelaySetting::Time { seconds: 0.0123 });
        assert_relative_eq!(requested_delay_seconds(&params, SR), 0.0123);
    }

    proptest! {
        #[test]
        fn prop_zero_distance_is_zero_delay(temperature in -500.0f32..500.0) {
            let params = DelayParams {
                delay: DelaySetting::Distance { meters: 0.0, centimeters: 0.0 },
                temperature,
                ..DelayParams::default()
            };
            prop_assert_eq!(resolve_delay_samples(&params, SR, MAX), 0);
        }

        #[test]
        fn prop_resolution_is_idempotent(
            meters in 0.0f32..200.0,
            centimeters in 0.0f32..100.0,
            temperature in -60.0f32..60.0,
        ) {
            let params = DelayParams {
                delay: DelaySetting::Distance { meters, centimeters },
                temperature,
                ..DelayParams::default()
            };
            let first = resolve_delay_samples(&params, SR, MAX);
            prop_assert_eq!(resolve_delay_samples(&params, SR, MAX), first);
            prop_assert!(first <= MAX);
        }

        #[test]
        fn prop_samples_mode_is_exact_below_max(samples in 0i32..48000) {
            let params = with_delay(DelaySetting::Samples { samples });
            prop_assert_eq!(resolve_delay_samples(&params, SR, MAX), samples as usize);
        }
    }
}

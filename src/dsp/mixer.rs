//! # Dry/Wet Mixer
//!
//! ```text
//! output = output_gain * (dry_gain * dry + wet_gain * wet)
//! ```
//!
//! Unlike a crossfading "mix" knob, dry and wet have independent gains:
//! for phase alignment you usually want only the wet (delayed) path, but
//! summing both is handy for hearing comb filtering while adjusting.
//!
//! Bypass returns the dry input untouched, ignoring every gain. It is an
//! output-stage switch only; the caller keeps feeding the delay line.

use super::resolver::DelayParams;

/// Gain stage for one block. All gains are linear multipliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mixer {
    dry_gain: f32,
    wet_gain: f32,
    output_gain: f32,
    bypass: bool,
}

impl Mixer {
    /// Build the gain stage from a parameter snapshot. Negative and
    /// non-finite gains are treated as silence.
    pub fn new(params: &DelayParams) -> Self {
        Self {
            dry_gain: sanitize_gain(params.dry_gain),
            wet_gain: sanitize_gain(params.wet_gain),
            output_gain: sanitize_gain(params.output_gain),
            bypass: params.bypass,
        }
    }

    /// Combine one dry and one wet sample.
    #[inline]
    pub fn process(&self, dry: f32, wet: f32) -> f32 {
        if self.bypass {
            return dry;
        }
        self.output_gain * (self.dry_gain * dry + self.wet_gain * wet)
    }
}

fn sanitize_gain(gain: f32) -> f32 {
    if gain.is_finite() {
        gain.max(0.0)
    } else {
        0.0
    }
}

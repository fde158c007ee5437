//! # Compensation Delay Engine
//!
//! Ties the DSP blocks together:
//!
//! ```text
//! Input ──┬────────────────────────────────────── dry ──┐
//!         │                                             ▼
//!         └──► [Delay Line] ──────────────────── wet ──► [Mixer] ──► Output
//!                   ▲
//!       resolve_delay_samples(params)  ──► applied delay ──► [Meters]
//! ```
//!
//! ## Threads
//!
//! - The **audio thread** owns the [`CompDelay`] and calls one of the
//!   block entry points. At the top of each block it takes one parameter
//!   snapshot, resolves the delay, and updates the meters. Nothing in the
//!   block path allocates, locks or logs.
//! - **Control threads** hold a [`ParamHandle`] and publish complete
//!   [`DelayParams`] values. The audio thread sees either the old snapshot
//!   or the new one, never a mix of fields.
//! - Changing the sample rate or capacity goes through
//!   [`CompDelay::reconfigure()`], which allocates and must be called
//!   outside the audio callback.

use std::sync::Arc;

use arc_swap::ArcSwap;
use nih_plug::{nih_debug_assert_eq, nih_log};

use crate::dsp::delay_line::DelayLine;
use crate::dsp::metering::{self, DelayMeters, Metrics};
use crate::dsp::mixer::Mixer;
use crate::dsp::resolver::{
    self, DelayParams, CENTIMETERS_MAX, METERS_MAX, SAMPLES_MAX, TEMPERATURE_MIN,
    TIME_MAX_SECONDS,
};
use crate::error::ConfigError;

/// Hard ceiling on the delay line length: ten minutes at 192 kHz.
pub const MAX_DELAY_SAMPLES_LIMIT: usize = 192_000 * 600;

/// Construction-time configuration. Fixed for the lifetime of a delay
/// line; change it with [`CompDelay::reconfigure()`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Longest delay the engine will apply. Longer requests saturate.
    pub max_delay_samples: usize,
}

impl EngineConfig {
    /// A configuration whose capacity covers every value the plugin's
    /// controls can reach at `sample_rate`.
    ///
    /// The longest distance delay happens at the coldest temperature,
    /// where sound is slowest.
    pub fn for_sample_rate(sample_rate: f32) -> Self {
        let slowest = resolver::speed_of_sound(TEMPERATURE_MIN);
        let distance_seconds = (METERS_MAX + CENTIMETERS_MAX / 100.0) / slowest;
        let longest_seconds = distance_seconds.max(TIME_MAX_SECONDS);

        let from_seconds = if sample_rate.is_finite() && sample_rate > 0.0 {
            (longest_seconds * sample_rate).ceil() as usize
        } else {
            0
        };

        Self {
            sample_rate,
            max_delay_samples: from_seconds.max(SAMPLES_MAX as usize),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.max_delay_samples > MAX_DELAY_SAMPLES_LIMIT {
            return Err(ConfigError::MaxDelayTooLarge {
                requested: self.max_delay_samples,
                limit: MAX_DELAY_SAMPLES_LIMIT,
            });
        }
        Ok(())
    }
}

/// Lock-free handoff of parameter snapshots from control threads.
///
/// Cloning is cheap and every clone refers to the same slot.
#[derive(Clone)]
pub struct ParamHandle {
    current: Arc<ArcSwap<DelayParams>>,
}

impl ParamHandle {
    pub fn new(params: DelayParams) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(params)),
        }
    }

    /// Replace the whole snapshot. Allocates, so call it from a control
    /// thread.
    pub fn publish(&self, params: DelayParams) {
        self.current.store(Arc::new(params));
    }

    /// Read-modify-write the snapshot. Concurrent updates are retried, so
    /// `f` may run more than once.
    pub fn update(&self, f: impl Fn(&mut DelayParams)) {
        self.current.rcu(|current| {
            let mut next = **current;
            f(&mut next);
            next
        });
    }

    /// Copy out the current snapshot.
    pub fn snapshot(&self) -> DelayParams {
        **self.current.load()
    }
}

impl Default for ParamHandle {
    fn default() -> Self {
        Self::new(DelayParams::default())
    }
}

/// The mono compensation delay.
pub struct CompDelay {
    config: EngineConfig,
    delay_line: DelayLine,
    params: ParamHandle,
    mixer: Mixer,
    /// Snapshot applied by the last `begin_block()`.
    last_params: DelayParams,
    metrics: Metrics,
    meters: Arc<DelayMeters>,
}

impl CompDelay {
    /// Allocate a delay line for `config` with its own meters. Not
    /// real-time safe.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_meters(config, Arc::new(DelayMeters::default()))
    }

    /// Like [`new()`](Self::new), but publish metering into an existing
    /// cell. Handles to `meters` taken before this call keep seeing the
    /// engine's values, including across [`reconfigure()`](Self::reconfigure).
    pub fn with_meters(
        config: EngineConfig,
        meters: Arc<DelayMeters>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let params = ParamHandle::default();
        let mut engine = Self {
            config,
            delay_line: DelayLine::new(config.max_delay_samples),
            mixer: Mixer::new(&params.snapshot()),
            last_params: params.snapshot(),
            params,
            metrics: Metrics::default(),
            meters,
        };
        let initial = engine.last_params;
        engine.begin_block(&initial);

        nih_log!(
            "Compensation delay ready: {} Hz, up to {} samples ({:.3} s)",
            config.sample_rate,
            config.max_delay_samples,
            config.max_delay_samples as f32 / config.sample_rate
        );

        Ok(engine)
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Handle for publishing parameters from other threads.
    pub fn params(&self) -> ParamHandle {
        self.params.clone()
    }

    /// Shared meters, updated once per block.
    pub fn meters(&self) -> Arc<DelayMeters> {
        self.meters.clone()
    }

    /// Metrics of the most recent block.
    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    /// Delay currently applied, in samples.
    pub fn applied_delay_samples(&self) -> usize {
        self.delay_line.delay()
    }

    /// Swap in a new sample rate and capacity. Allocates a fresh, silent
    /// delay line, so call it outside the audio callback. The last applied
    /// snapshot is re-resolved against the new configuration.
    ///
    /// On error the engine is left untouched.
    pub fn reconfigure(&mut self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;

        self.config = config;
        self.delay_line = DelayLine::new(config.max_delay_samples);
        let params = self.last_params;
        self.begin_block(&params);

        nih_log!(
            "Compensation delay reconfigured: {} Hz, up to {} samples, applying {}",
            config.sample_rate,
            config.max_delay_samples,
            self.delay_line.delay()
        );

        Ok(())
    }

    /// Silence the history, e.g. when the host stops the transport. The
    /// applied delay and meters stay as they are.
    pub fn reset(&mut self) {
        self.delay_line.clear();
    }

    /// Apply a parameter snapshot: resolve the delay, rebuild the gain
    /// stage and refresh the meters. Called once per block by the block
    /// entry points; call it directly when driving
    /// [`process_sample()`](Self::process_sample) yourself.
    ///
    /// # Why once per block, not once per sample?
    ///
    /// The parameters come from another thread. Reading them once and
    /// working from that copy for the whole block guarantees the mode, the
    /// distance and the temperature all belong to the same update. It is
    /// also cheaper: resolving involves a division and a rounding that
    /// would be wasted work when nothing changed.
    pub fn begin_block(&mut self, params: &DelayParams) {
        // Step 1: RESOLVE the snapshot into a whole number of samples.
        //
        // The resolver rounds to the nearest sample and clamps to the
        // configured maximum, so the result always fits the delay line.
        // Passing a bigger value would be a programming error and
        // `set_delay()` would panic.
        let applied = resolver::resolve_delay_samples(
            params,
            self.config.sample_rate,
            self.config.max_delay_samples,
        );

        // Step 2: MOVE the read head. No crossfade: the very next read
        // comes from the new position.
        self.delay_line.set_delay(applied);

        // Step 3: REBUILD the gain stage for this block.
        self.mixer = Mixer::new(params);
        self.last_params = *params;

        // Step 4: METER the delay actually applied.
        //
        // Everything is derived from `applied`, not from the knob values,
        // so the meters show the rounding. The distance meter always uses
        // the current temperature, even in Samples or Time mode.
        let speed = resolver::speed_of_sound(params.temperature);
        self.metrics = metering::report(applied, self.config.sample_rate, speed);
        self.meters.store(applied, self.config.sample_rate, speed);
    }

    /// Run one sample through the delay line and mixer using the state set
    /// by the last [`begin_block()`](Self::begin_block).
    ///
    /// # Bypass keeps the delay line running
    ///
    /// The input is written into the delay line *before* the mixer decides
    /// what to output, and that happens regardless of bypass. Bypass only
    /// changes which value leaves the mixer. Had we skipped the write while
    /// bypassed, the history would be full of stale audio (or silence) when
    /// bypass is turned off again, and the first `delay` samples after
    /// un-bypassing would be a click. Instead the wet path is already
    /// "warmed up" and picks up exactly where a never-bypassed run would be.
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let wet = self.delay_line.tick(input);
        self.mixer.process(input, wet)
    }

    /// Process one block with the latest snapshot from the
    /// [`ParamHandle`].
    ///
    /// `input` and `output` should be the same length. If `output` is
    /// shorter, every input sample is still written into the history (the
    /// delay line never skips a sample) and the outputs that don't fit are
    /// dropped. If `output` is longer, its tail is left untouched.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        nih_debug_assert_eq!(input.len(), output.len());

        let params = self.params.snapshot();
        self.begin_block(&params);

        for (i, &x) in input.iter().enumerate() {
            let y = self.process_sample(x);
            if let Some(out) = output.get_mut(i) {
                *out = y;
            }
        }
    }

    /// Process one block in place with an explicit snapshot. This is the
    /// entry point for hosts that manage parameters themselves.
    pub fn process_in_place_with(&mut self, params: &DelayParams, samples: &mut [f32]) {
        self.begin_block(params);

        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    #[cfg(test)]
    pub(crate) fn history(&self) -> &[f32] {
        self.delay_line.history()
    }
}

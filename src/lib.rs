//! # Comp Delay Mono — A Phase-Alignment Delay Plugin
//!
//! Delays a mono signal by a whole number of samples so that microphones
//! at different distances from a source line up in time. The delay can be
//! set in samples, as a distance (with the air temperature setting the
//! speed of sound) or as a time, and is always quantized to samples.
//! The meters report the quantized delay back in all three units.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬──────────────────────────────── × dry ──┐
//!         │                                         ▼
//!         └──► [Delay Line] ─────────────── × wet ──(+)── × output ──► Output
//!                                                  (bypass: Output = Input)
//! ```
//!
//! The engine in [`engine`] and [`dsp`] has no host types in its API and
//! can be driven by any host. The [`Plugin`] implementation below is a thin
//! adapter that feeds it from nih-plug parameters.

pub mod dsp;
pub mod engine;
pub mod error;
pub mod params;

use std::num::NonZeroU32;
use std::sync::Arc;

use nih_plug::prelude::*;

use dsp::metering::DelayMeters;
use engine::{CompDelay, EngineConfig};
use params::CompDelayParams;

pub use dsp::metering::Metrics;
pub use dsp::resolver::{DelayParams, DelaySetting};
pub use engine::ParamHandle;
pub use error::ConfigError;

/// Plugin state. The engine is created in `initialize()`, once the host
/// has told us the sample rate.
pub struct CompDelayMono {
    params: Arc<CompDelayParams>,
    engine: Option<CompDelay>,
    /// Meter values for an editor or host to read. Created once with the
    /// plugin and handed to every engine, so a clone taken before
    /// `initialize()` keeps showing live values.
    meters: Arc<DelayMeters>,
}

impl Default for CompDelayMono {
    fn default() -> Self {
        Self {
            params: Arc::new(CompDelayParams::default()),
            engine: None,
            meters: Arc::new(DelayMeters::default()),
        }
    }
}

impl CompDelayMono {
    /// Meters of the running engine. Valid for the plugin's whole lifetime.
    pub fn meters(&self) -> Arc<DelayMeters> {
        self.meters.clone()
    }

    /// Create the engine on first use, reconfigure it afterwards. Either
    /// way it reports into `self.meters`.
    fn configure_engine(&mut self, sample_rate: f32) -> Result<(), ConfigError> {
        let config = EngineConfig::for_sample_rate(sample_rate);

        match self.engine.as_mut() {
            Some(engine) => engine.reconfigure(config),
            None => {
                let engine = CompDelay::with_meters(config, self.meters.clone())?;
                self.engine = Some(engine);
                Ok(())
            }
        }
    }
}

impl Plugin for CompDelayMono {
    const NAME: &'static str = "Comp Delay Mono";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Mono only. Multi-channel alignment is done with one instance per
    // track.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(1),
        main_output_channels: NonZeroU32::new(1),
        aux_input_ports: &[],
        aux_output_ports: &[],
        names: PortNames::const_default(),
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Parameter changes land on block boundaries. The engine takes one
    // snapshot per block and never sees a half-applied update.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Allocate the delay line for the host's sample rate. Called off the
    /// audio thread, so this is the reconfiguration point for sample rate
    /// changes too.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        match self.configure_engine(buffer_config.sample_rate) {
            Ok(()) => true,
            Err(err) => {
                nih_error!("Cannot initialize Comp Delay Mono: {err}");
                false
            }
        }
    }

    /// The host stopped or re-started playback: drop the stale history.
    fn reset(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.reset();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        // Hosts must call initialize() first; until then pass audio through
        // untouched.
        let Some(engine) = self.engine.as_mut() else {
            return ProcessStatus::Normal;
        };

        // Step 1: Read every control once. The whole block uses this
        // snapshot, so a knob moved mid-block never splits the block
        // between two delays.
        let snapshot = self.params.snapshot();

        // Step 2: The layout is mono, so there is exactly one channel.
        let channels = buffer.as_slice();
        nih_debug_assert_eq!(channels.len(), 1);

        // Step 3: Process in place. The engine resolves the delay, writes
        // every input sample into the delay line and overwrites the slice
        // with the mix. Under bypass the slice keeps the dry input, but
        // the delay line is still fed, so switching bypass off resumes
        // with a full history instead of a gap of silence.
        if let Some(samples) = channels.first_mut() {
            engine.process_in_place_with(&snapshot, samples);
        }

        ProcessStatus::Normal
    }
}

impl ClapPlugin for CompDelayMono {
    const CLAP_ID: &'static str = "com.loveless-audio.comp-delay-mono";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Delay compensation for aligning microphones by samples, distance or time");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Mono,
        ClapFeature::Delay,
        ClapFeature::Utility,
    ];
}

impl Vst3Plugin for CompDelayMono {
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssCompDlyMono";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] = &[
        Vst3SubCategory::Fx,
        Vst3SubCategory::Delay,
        Vst3SubCategory::Mono,
    ];
}

nih_export_clap!(CompDelayMono);
nih_export_vst3!(CompDelayMono);

// AUv2 entry point for Logic Pro, wrapping the CLAP build.
clap_wrapper::export_auv2!();

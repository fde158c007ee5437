//! # Delay Metering
//!
//! The meters show the delay that is really applied, not the one that was
//! asked for. The applied delay is always a whole number of samples, so
//! the time and distance meters are derived from that integer:
//!
//! ```text
//! seconds  = samples / sample_rate
//! distance = seconds * speed_of_sound(temperature)
//! ```
//!
//! Dialing in 1 m at 20 °C and 48 kHz gives 140 samples, which the meters
//! report back as 2.9167 ms and 1.0016 m. The mismatch with the knob is the
//! quantization and is expected.

use std::hint;
use std::sync::atomic::{self, AtomicU32, AtomicUsize, Ordering};

use atomic_float::AtomicF32;

/// Delay actually in effect, in three units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub samples: usize,
    pub seconds: f32,
    pub distance_meters: f32,
    /// Speed of sound the distance was derived with, in m/s.
    pub speed_of_sound: f32,
}

/// Derive all meter values from the applied sample count.
///
/// This is the only place seconds and distance are computed, so two
/// `Metrics` built from the same three inputs are always identical.
pub fn report(applied_samples: usize, sample_rate: f32, speed_of_sound: f32) -> Metrics {
    let seconds = applied_samples as f32 / sample_rate;
    Metrics {
        samples: applied_samples,
        seconds,
        distance_meters: seconds * speed_of_sound,
        speed_of_sound,
    }
}

/// Meter values shared with other threads.
///
/// The audio thread calls [`store()`](Self::store) once per block; a UI or
/// host thread calls [`load()`](Self::load) whenever it repaints.
///
/// ## Why not one atomic per meter?
///
/// Because a reader could then catch a store halfway through and show the
/// sample count of one block next to the time of the previous one. Instead
/// only the three *inputs* of [`report()`] are stored, behind a sequence
/// counter (a "seqlock"):
///
/// 1. The writer bumps `sequence` to an odd number, writes the inputs,
///    then bumps it to the next even number.
/// 2. A reader notes `sequence`, reads the inputs, and checks `sequence`
///    again. If it was odd or changed in between, the read overlapped a
///    store and is retried.
///
/// The writer never waits, so the audio thread stays wait-free. Readers
/// spin only while a store is in flight, which is a handful of
/// instructions. Seconds and distance are derived in `load()` through
/// [`report()`], so the three meters always agree with each other.
///
/// There must be a single writer: the engine that owns this cell.
#[derive(Debug, Default)]
pub struct DelayMeters {
    sequence: AtomicU32,
    samples: AtomicUsize,
    sample_rate: AtomicF32,
    speed_of_sound: AtomicF32,
}

impl DelayMeters {
    /// Publish the inputs of one block's metrics.
    pub fn store(&self, samples: usize, sample_rate: f32, speed_of_sound: f32) {
        let sequence = self.sequence.load(Ordering::Relaxed);
        self.sequence
            .store(sequence.wrapping_add(1), Ordering::Relaxed);
        // Readers that see any of the writes below also see the odd count.
        atomic::fence(Ordering::Release);

        self.samples.store(samples, Ordering::Relaxed);
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
        self.speed_of_sound.store(speed_of_sound, Ordering::Relaxed);

        self.sequence
            .store(sequence.wrapping_add(2), Ordering::Release);
    }

    /// Read a consistent set of meter values. Before the first store this
    /// is all zeroes.
    pub fn load(&self) -> Metrics {
        loop {
            let before = self.sequence.load(Ordering::Acquire);
            if before & 1 == 1 {
                hint::spin_loop();
                continue;
            }

            let samples = self.samples.load(Ordering::Relaxed);
            let sample_rate = self.sample_rate.load(Ordering::Relaxed);
            let speed_of_sound = self.speed_of_sound.load(Ordering::Relaxed);

            atomic::fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) != before {
                hint::spin_loop();
                continue;
            }

            if sample_rate <= 0.0 {
                return Metrics::default();
            }
            return report(samples, sample_rate, speed_of_sound);
        }
    }
}

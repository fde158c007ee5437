//! # Delay Line (Ring Buffer)
//!
//! A fixed-size history of the most recent input samples. A "write head"
//! stores each incoming sample and a "read head" trails it by the applied
//! delay. The distance between the two heads is the delay.
//!
//! ## Per-Sample Order
//!
//! 1. [`write()`](DelayLine::write) the new input at `write_pos`.
//! 2. [`read()`](DelayLine::read) the sample `delay` steps behind it:
//!    `(write_pos + capacity - delay) % capacity`.
//! 3. [`advance()`](DelayLine::advance) the write head, wrapping to 0.
//!
//! ## Why Write Before Read?
//!
//! A feedback echo usually reads first and writes second, because its
//! shortest delay is one sample. A compensation delay must also be able to
//! apply *no* delay at all: two mics at the same distance need 0 samples.
//! Writing first means a delay of 0 reads back the sample just written,
//! so the wet path is then bit-identical to the dry path.
//!
//! ## Why `max_delay + 1` Slots?
//!
//! With write-before-read, the slot at `write_pos` already holds the
//! current sample, so the oldest sample still available sits `capacity - 1`
//! steps back. To reach back `max_delay` samples the buffer needs one slot
//! more than the delay:
//!
//! ```text
//! max_delay = 4, capacity = 5, write_pos = 2 (just wrote x[n])
//!
//!   slot:   0       1       2      3       4
//!         x[n-2]  x[n-1]  x[n]  x[n-4]  x[n-3]
//!                          ▲     ▲
//!                      delay 0   delay 4 (oldest)
//! ```
//!
//! ## Whole Samples Only
//!
//! Unlike a modulation delay there is no interpolation: the read head sits
//! exactly on a stored sample. That is what makes the delay *exact*:
//! `output[n] == input[n - delay]` with no filtering from blending two
//! neighbors. Changing the delay moves the read head instantly; nothing is
//! crossfaded, so a jump in delay is also a jump in the output.

use std::num::NonZeroUsize;

/// A ring buffer that delays a mono signal by a whole number of samples.
///
/// Allocated once at construction. Nothing here allocates afterwards, so
/// every method except `new()` is safe to call from the audio thread.
pub struct DelayLine {
    /// Stored samples, initially silence.
    buffer: Vec<f32>,

    /// Where the next incoming sample will be stored.
    write_pos: usize,

    /// Number of samples the read head trails the write head by.
    delay: usize,
}

impl DelayLine {
    /// Create a delay line that can delay by up to `max_delay` samples.
    ///
    /// # Why pre-allocate?
    ///
    /// The buffer is sized for the longest delay up front so that turning
    /// the delay knob never resizes it. Resizing would allocate, and an
    /// allocation on the audio thread can block on the allocator's lock
    /// and cause a dropout. Only the read offset changes at run time.
    pub fn new(max_delay: usize) -> Self {
        // `max_delay + 1` is never zero, so the modulo below is always defined.
        let capacity = NonZeroUsize::MIN.saturating_add(max_delay);
        Self {
            buffer: vec![0.0; capacity.get()],
            write_pos: 0,
            delay: 0,
        }
    }

    /// Number of slots in the ring.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Largest delay this line can apply.
    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 1
    }

    /// The delay currently applied, in samples.
    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Move the read head to `delay` samples behind the write head. Takes
    /// effect on the next [`read()`](Self::read).
    ///
    /// # Panics
    ///
    /// If `delay` exceeds [`max_delay()`](Self::max_delay). The resolver
    /// clamps to the configured maximum, so this only fires when the
    /// engine's maximum and this buffer disagree.
    pub fn set_delay(&mut self, delay: usize) {
        assert!(
            delay <= self.max_delay(),
            "delay of {delay} samples exceeds delay line capacity of {} samples",
            self.max_delay()
        );
        self.delay = delay;
    }

    /// Store a sample at the write head. Does not advance.
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
    }

    /// The sample written exactly `delay` steps ago.
    ///
    /// # How the index math works
    ///
    /// ```text
    /// read_index = (write_pos + capacity - delay) % capacity
    /// ```
    ///
    /// Adding `capacity` before subtracting keeps the `usize` from going
    /// negative; `delay <= capacity - 1` is guaranteed by
    /// [`set_delay()`](Self::set_delay). Example: `write_pos = 1`,
    /// `delay = 3`, `capacity = 5` gives `(1 + 5 - 3) % 5 = 3`, which is
    /// three steps behind slot 1 on a ring of five.
    pub fn read(&self) -> f32 {
        let capacity = self.buffer.len();
        let index = (self.write_pos + capacity - self.delay) % capacity;
        self.buffer[index]
    }

    /// Advance the write head by one sample.
    pub fn advance(&mut self) {
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Write, read and advance in one step. Returns the delayed sample.
    ///
    /// This is the only path the engine uses, so every input sample is
    /// recorded no matter what happens to the output afterwards (bypass,
    /// zero wet gain, and so on).
    #[inline]
    pub fn tick(&mut self, input: f32) -> f32 {
        self.write(input);
        let delayed = self.read();
        self.advance();
        delayed
    }

    /// Clear the history to silence and reset the write head. The applied
    /// delay is kept.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    #[cfg(test)]
    pub(crate) fn history(&self) -> &[f32] {
        &self.buffer
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_max_delay_plus_one() {
        let dl = DelayLine::new(100);
        assert_eq!(dl.capacity(), 101);
        assert_eq!(dl.max_delay(), 100);

        let dl = DelayLine::new(0);
        assert_eq!(dl.capacity(), 1);
        assert_eq!(dl.max_delay(), 0);
    }

    #[test]
    fn test_zero_delay_passes_input_through() {
        let mut dl = DelayLine::new(10);
        for x in [0.25, -0.5, 1.0] {
            assert_eq!(dl.tick(x), x);
        }
    }

    #[test]
    fn test_delay_of_n_returns_sample_from_n_steps_ago() {
        let mut dl = DelayLine::new(10);
        dl.set_delay(3);

        let out: Vec<f32> = (1..=6).map(|i| dl.tick(i as f32)).collect();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_full_length_delay() {
        // Reading max_delay back lands on the oldest slot, which has not
        // been overwritten yet.
        let mut dl = DelayLine::new(4);
        dl.set_delay(4);

        let out: Vec<f32> = (1..=10).map(|i| dl.tick(i as f32)).collect();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_wrapping() {
        let mut dl = DelayLine::new(3);
        dl.set_delay(1);

        // Ten ticks wrap a 4-slot ring twice.
        let mut last = 0.0;
        for i in 0..10 {
            last = dl.tick(i as f32);
        }
        assert_eq!(last, 8.0);
    }

    #[test]
    fn test_delay_change_is_instant() {
        let mut dl = DelayLine::new(10);
        for i in 1..=5 {
            dl.tick(i as f32);
        }

        dl.set_delay(2);
        // Input 6 is written, read head is 2 behind it: 4.
        assert_eq!(dl.tick(6.0), 4.0);

        dl.set_delay(0);
        assert_eq!(dl.tick(7.0), 7.0);
    }

    #[test]
    #[should_panic(expected = "exceeds delay line capacity")]
    fn test_delay_beyond_capacity_panics() {
        let mut dl = DelayLine::new(10);
        dl.set_delay(11);
    }

    #[test]
    fn test_clear_keeps_delay() {
        let mut dl = DelayLine::new(10);
        dl.set_delay(2);
        for i in 1..=5 {
            dl.tick(i as f32);
        }

        dl.clear();
        assert_eq!(dl.delay(), 2);
        assert!(dl.history().iter().all(|&s| s == 0.0));
        assert_eq!(dl.tick(1.0), 0.0);
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut dl = DelayLine::new(100);
        for delay in [0, 1, 50, 100] {
            dl.set_delay(delay);
            assert_eq!(dl.tick(0.0), 0.0);
        }
    }
}

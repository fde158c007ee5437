//! # DSP Building Blocks
//!
//! - **`resolver`**: turns samples, distance or time into a whole-sample
//!   delay.
//! - **`delay_line`**: a ring buffer that is written every sample and
//!   read back at the applied delay.
//! - **`mixer`**: dry/wet/output gains and bypass.
//! - **`metering`**: time, samples and distance derived from the applied
//!   delay.

pub mod delay_line;
pub mod metering;
pub mod mixer;
pub mod resolver;

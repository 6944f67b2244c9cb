//! ATmega328P peripheral emulation.
//!
//! Contains the hardware the metronome firmware uses:
//!
//! - [`SimTimer16`] — 16-bit Timer/Counter1 in CTC mode (the tempo timer)
//! - [`Timer8`] — 8-bit Timer/Counter0 (display multiplexing, `millis()`)
//! - [`Millis`] — Arduino-compatible millisecond clock fed by timer0 overflows
//! - [`ToneGen`] — Timer/Counter2 square-wave tone generator
//! - [`SoftTimer`] — Overflow-driven down-counter that ends each click

mod soft_timer;
mod timer16;
mod timer8;
mod tone;

pub use soft_timer::SoftTimer;
pub use timer16::SimTimer16;
pub use timer8::{Millis, Timer0Event, Timer8};
pub use tone::{ToneConfig, ToneGen, TIMER2_PRESCALERS};

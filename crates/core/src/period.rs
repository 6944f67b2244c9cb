//! Rational tock period synthesis.
//!
//! Timer1 counts at 1 MHz (8 MHz clock, prescaler 8). One beat is
//! [`TICKS_PER_BEAT`](crate::TICKS_PER_BEAT) tocks, so at 1 BPM a tock lasts
//! exactly [`TOCK_PERIOD_FOR_1_BPM`] counts and at `tempo` BPM it lasts
//! `TOCK_PERIOD_FOR_1_BPM / tempo` counts, which is rarely an integer.
//!
//! The quotient is split into a floor and a remainder. Out of every `tempo`
//! tocks, `remainder` are counted one count long and the rest at the floor:
//!
//! ```text
//! tempo = 120: floor = 8333, remainder = 40
//! |<- 40 tocks of 8334 counts ->|<------ 80 tocks of 8333 counts ------>|
//! 40 * 8334 + 80 * 8333 = 1_000_000
//! ```
//!
//! The long-run average is exact and no single tock is off by more than one
//! count. Timer top values are one less than the period, since the counter
//! resets to zero after matching.

/// Timer counts per tock at 1 BPM.
pub const TOCK_PERIOD_FOR_1_BPM: u32 = 1_000_000;

/// Largest value the 16-bit compare register can hold.
pub const TIMER_MAX_TOP: u16 = 0xFFFF;

/// Slowest tempo whose floor period still fits the timer:
/// `ceil(TOCK_PERIOD_FOR_1_BPM / (TIMER_MAX_TOP + 1))`.
pub const HARD_MIN_TEMPO: u8 = 16;

const _: () = assert!(TOCK_PERIOD_FOR_1_BPM / HARD_MIN_TEMPO as u32 <= TIMER_MAX_TOP as u32 + 1);
const _: () = assert!(TOCK_PERIOD_FOR_1_BPM / (HARD_MIN_TEMPO as u32 - 1) > TIMER_MAX_TOP as u32 + 1);

/// Period state shared between the control loop and the tock handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodState {
    /// Tock period in timer counts, rounded down
    pub floor: u32,
    /// `TOCK_PERIOD_FOR_1_BPM % tempo`; always less than the tempo
    pub remainder: u8,
    /// Counts tocks from 0 to tempo - 1, then wraps
    pub tock_count_mod_tempo: u8,
}

impl PeriodState {
    /// Derive the period for `tempo`, with the tock counter reset.
    ///
    /// Tempos below [`HARD_MIN_TEMPO`] saturate at the longest period the
    /// timer can count and get no correction.
    pub fn for_tempo(tempo: u8) -> Self {
        let (floor, remainder) = if tempo < HARD_MIN_TEMPO {
            (TIMER_MAX_TOP as u32 + 1, 0)
        } else {
            let tempo = u32::from(tempo);
            (TOCK_PERIOD_FOR_1_BPM / tempo, (TOCK_PERIOD_FOR_1_BPM % tempo) as u8)
        };
        PeriodState { floor, remainder, tock_count_mod_tempo: 0 }
    }

    /// Length in counts of the tock selected by `tock_count_mod_tempo`.
    pub fn current_period(&self) -> u32 {
        if self.tock_count_mod_tempo < self.remainder {
            self.floor + 1
        } else {
            self.floor
        }
    }

    /// Compare value for the current period.
    pub fn top_value(&self) -> u16 {
        (self.current_period() - 1).min(TIMER_MAX_TOP as u32) as u16
    }

    /// True on the two tocks of each cycle where the period changes length.
    pub fn at_switch_point(&self) -> bool {
        self.remainder > 0
            && (self.tock_count_mod_tempo == 0 || self.tock_count_mod_tempo == self.remainder)
    }

    /// Advance the tock counter, wrapping at `tempo`.
    pub fn advance(&mut self, tempo: u8) {
        self.tock_count_mod_tempo = self.tock_count_mod_tempo.wrapping_add(1);
        if self.tock_count_mod_tempo >= tempo {
            self.tock_count_mod_tempo = 0;
        }
    }
}

//! 16-bit Timer/Counter1 emulation, CTC mode only.
//!
//! The counter runs at `CLOCK_HZ / prescale` and counts `0..=top`. The count
//! after `top` clears the counter and raises the compare-match flag, so one
//! interrupt period is `top + 1` counts. A counter already past `top` runs on
//! to 0xFFFF, wraps, and only then reaches `top`.
//!
//! Counting is lazy: [`SimTimer16::update`] catches the counter up to a CPU
//! tick, and [`SimTimer16::next_match_tick`] tells the scheduler when the next
//! match is due.

use crate::hal::{InterruptState, TimerHardware};

pub struct SimTimer16 {
    /// CPU tick the counter was last brought up to. Always on a count edge.
    tick: u64,
    prescale: u32,
    running: bool,
    tcnt: u16,
    top: u16,
    /// Pending compare matches not yet delivered
    ocf: u32,
    /// I-bit as seen by this timer's interrupt
    interrupts_enabled: bool,
    /// Total compare matches since reset
    pub matches: u64,
    /// Matches that overflowed through 0xFFFF first
    pub wrapped_matches: u64,
}

impl SimTimer16 {
    pub fn new(prescale: u32) -> Self {
        SimTimer16 {
            tick: 0,
            prescale: prescale.max(1),
            running: false,
            tcnt: 0,
            top: 0xFFFF,
            ocf: 0,
            interrupts_enabled: true,
            matches: 0,
            wrapped_matches: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = SimTimer16::new(self.prescale);
    }

    pub fn prescale(&self) -> u32 {
        self.prescale
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Counts left until the next compare match.
    fn counts_to_match(&self) -> u32 {
        let tcnt = u32::from(self.tcnt);
        let top = u32::from(self.top);
        if tcnt <= top {
            top - tcnt + 1
        } else {
            (0x1_0000 - tcnt) + top + 1
        }
    }

    /// Catch the counter up to CPU tick `now`.
    pub fn update(&mut self, now: u64) {
        if !self.running {
            self.tick = now;
            return;
        }
        let elapsed = now.saturating_sub(self.tick);
        let mut counts = elapsed / u64::from(self.prescale);
        if counts == 0 {
            return;
        }
        self.tick += counts * u64::from(self.prescale);

        let first = u64::from(self.counts_to_match());
        if counts < first {
            self.tcnt = self.tcnt.wrapping_add(counts as u16);
            return;
        }
        if self.tcnt > self.top {
            self.wrapped_matches += 1;
        }
        counts -= first;
        let period = u64::from(self.top) + 1;
        let n = 1 + counts / period;
        self.ocf += n as u32;
        self.matches += n;
        self.tcnt = (counts % period) as u16;
    }

    /// CPU tick of the next compare match, or `None` while the clock is gated.
    pub fn next_match_tick(&self) -> Option<u64> {
        if !self.running {
            return None;
        }
        Some(self.tick + u64::from(self.counts_to_match()) * u64::from(self.prescale))
    }

    /// Take the pending compare interrupt, if one is pending and not masked.
    pub fn check_interrupt(&mut self) -> bool {
        if self.ocf > 0 && self.interrupts_enabled {
            self.ocf = 0;
            return true;
        }
        false
    }

    pub fn interrupt_pending(&self) -> bool {
        self.ocf > 0
    }
}

impl TimerHardware for SimTimer16 {
    fn set_top_value(&mut self, top: u16) {
        self.top = top;
    }

    fn top_value(&self) -> u16 {
        self.top
    }

    fn read_count(&self) -> u16 {
        self.tcnt
    }

    fn reset_count_to(&mut self, count: u16) {
        self.tcnt = count;
    }

    fn enable_clock(&mut self) {
        self.running = true;
    }

    fn disable_clock(&mut self) {
        self.running = false;
    }

    fn enter_critical(&mut self) -> InterruptState {
        let prior = InterruptState::new(self.interrupts_enabled);
        self.interrupts_enabled = false;
        prior
    }

    fn exit_critical(&mut self, prior: InterruptState) {
        self.interrupts_enabled = prior.was_enabled();
    }
}

//! 8-bit Timer/Counter0 emulation and the millisecond clock it drives.
//!
//! Timer0 stays in Normal mode with prescaler 64 so it overflows every 256
//! counts (2.048 ms at 8 MHz), which is what the Arduino `millis()`
//! bookkeeping expects. The two compare registers raise extra interrupts
//! partway through each cycle; the display multiplexer uses them as the
//! on and off edges of each digit.

/// Interrupt sources of timer0, in vector priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer0Event {
    CompareA,
    CompareB,
    Overflow,
}

pub struct Timer8 {
    /// CPU tick of the counter's current value. Always on a count edge.
    tick: u64,
    prescale: u32,
    /// Position within the cycle, 0..=255
    tcnt: u16,
    ocr_a: u8,
    ocr_b: u8,
    /// Compare B matched together with A and is still to be delivered
    pending_b: bool,
    /// Overflows since reset
    pub overflows: u64,
}

impl Timer8 {
    /// Compare values of 0 coincide with the overflow and are raised to 1.
    pub fn new(prescale: u32, ocr_a: u8, ocr_b: u8) -> Self {
        Timer8 {
            tick: 0,
            prescale: prescale.max(1),
            tcnt: 0,
            ocr_a: ocr_a.max(1),
            ocr_b: ocr_b.max(1),
            pending_b: false,
            overflows: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Timer8::new(self.prescale, self.ocr_a, self.ocr_b);
    }

    pub fn count(&self) -> u8 {
        self.tcnt as u8
    }

    /// CPU cycles between overflows.
    pub fn overflow_period(&self) -> u64 {
        256 * u64::from(self.prescale)
    }

    fn distance_to(&self, position: u16) -> u16 {
        if position > self.tcnt {
            position - self.tcnt
        } else {
            position + 256 - self.tcnt
        }
    }

    /// Counts to the next event and which event it is.
    fn next(&self) -> (u16, Timer0Event) {
        if self.pending_b {
            return (0, Timer0Event::CompareB);
        }
        let mut best = (256 - self.tcnt, Timer0Event::Overflow);
        // B before A so A wins a tie, matching vector order; B follows at
        // the same tick
        for (ocr, ev) in [(self.ocr_b, Timer0Event::CompareB), (self.ocr_a, Timer0Event::CompareA)] {
            let d = self.distance_to(u16::from(ocr));
            if d <= best.0 {
                best = (d, ev);
            }
        }
        best
    }

    /// CPU tick at which the next event fires.
    pub fn next_event_tick(&self) -> u64 {
        let (counts, _) = self.next();
        self.tick + u64::from(counts) * u64::from(self.prescale)
    }

    /// Run the counter up to the next event and report it.
    pub fn advance(&mut self) -> Timer0Event {
        let (counts, ev) = self.next();
        self.pending_b = ev == Timer0Event::CompareA && self.ocr_a == self.ocr_b;
        self.tick += u64::from(counts) * u64::from(self.prescale);
        self.tcnt += counts;
        if self.tcnt >= 256 {
            self.tcnt -= 256;
            self.overflows += 1;
        }
        ev
    }
}

// ─── millis() ───────────────────────────────────────────────────────────────

const MICROS_PER_OVERFLOW: u32 = 64 * 256 / (crate::CLOCK_HZ / 1_000_000);
const MILLIS_INC: u32 = MICROS_PER_OVERFLOW / 1000;
// fractional milliseconds are kept in units of 8 us to fit a byte
const FRACT_INC: u16 = ((MICROS_PER_OVERFLOW % 1000) >> 3) as u16;
const FRACT_MAX: u16 = 1000 >> 3;

/// Arduino-compatible millisecond clock, advanced once per timer0 overflow.
#[derive(Debug, Clone, Default)]
pub struct Millis {
    millis: u32,
    fract: u16,
}

impl Millis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_overflow(&mut self) {
        self.millis = self.millis.wrapping_add(MILLIS_INC);
        self.fract += FRACT_INC;
        if self.fract >= FRACT_MAX {
            self.fract -= FRACT_MAX;
            self.millis = self.millis.wrapping_add(1);
        }
    }

    /// Milliseconds since reset. Wraps after about 49 days.
    pub fn get(&self) -> u32 {
        self.millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_order_within_cycle() {
        let mut t = Timer8::new(64, 16, 128);
        assert_eq!(t.next_event_tick(), 16 * 64);
        assert_eq!(t.advance(), Timer0Event::CompareA);
        assert_eq!(t.advance(), Timer0Event::CompareB);
        assert_eq!(t.next_event_tick(), 256 * 64);
        assert_eq!(t.advance(), Timer0Event::Overflow);
        assert_eq!(t.count(), 0);
        assert_eq!(t.overflows, 1);
        assert_eq!(t.advance(), Timer0Event::CompareA);
        assert_eq!(t.next_event_tick(), 256 * 64 + 128 * 64);
    }

    #[test]
    fn test_equal_compares_deliver_both() {
        let mut t = Timer8::new(1, 50, 50);
        assert_eq!(t.advance(), Timer0Event::CompareA);
        assert_eq!(t.next_event_tick(), 50);
        assert_eq!(t.advance(), Timer0Event::CompareB);
        assert_eq!(t.count(), 50);
        assert_eq!(t.advance(), Timer0Event::Overflow);
        assert_eq!(t.advance(), Timer0Event::CompareA);
        assert_eq!(t.advance(), Timer0Event::CompareB);
        assert_eq!(t.next_event_tick(), 256 + 50 + 206);
    }

    #[test]
    fn test_overflow_period() {
        let t = Timer8::new(64, 16, 128);
        assert_eq!(t.overflow_period(), 16_384);
    }

    #[test]
    fn test_millis_constants() {
        assert_eq!(MICROS_PER_OVERFLOW, 2048);
        assert_eq!(MILLIS_INC, 2);
        assert_eq!(FRACT_INC, 6);
        assert_eq!(FRACT_MAX, 125);
    }

    #[test]
    fn test_millis_tracks_real_time() {
        let mut m = Millis::new();
        // 125 overflows = 256 ms exactly
        for _ in 0..125 {
            m.on_overflow();
        }
        assert_eq!(m.get(), 256);
        for _ in 0..(125 * 3) {
            m.on_overflow();
        }
        assert_eq!(m.get(), 1024);
    }
}

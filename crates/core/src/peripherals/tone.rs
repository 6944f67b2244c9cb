//! Timer/Counter2 square-wave tone generator.
//!
//! Timer2 runs in CTC mode with OC2A set to toggle on every compare match, so
//! the pin frequency is `F_CPU / (2 * N * (1 + OCR2A))` for prescaler `N`.
//! Starting a tone only writes the compare value and the clock-select bits;
//! stopping gates the clock.

/// Timer2 prescalers, indexed by their clock-select bit pattern.
pub const TIMER2_PRESCALERS: [u16; 8] = [0, 1, 8, 32, 64, 128, 256, 1024];

/// Clock-select bits and compare value for one tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneConfig {
    pub prescaler_bits: u8,
    pub count_value: u8,
}

impl ToneConfig {
    /// Find the smallest prescaler whose 8-bit count fits `frequency`.
    ///
    /// Searches downwards from the largest prescaler and stops at the first
    /// one whose next smaller neighbour would overflow the count. Prescaler 1
    /// is never chosen. Returns `None` for frequencies no prescaler can reach.
    pub const fn for_frequency(clock_hz: u32, frequency: u16) -> Option<ToneConfig> {
        if frequency == 0 {
            return None;
        }
        let base = clock_hz / frequency as u32 / 2;
        let mut index = TIMER2_PRESCALERS.len() - 1;
        while index > 1 {
            let next_smaller = TIMER2_PRESCALERS[index - 1] as u32;
            if base / next_smaller > 255 {
                let count = base / TIMER2_PRESCALERS[index] as u32;
                if count == 0 || count > 256 {
                    return None;
                }
                return Some(ToneConfig { prescaler_bits: index as u8, count_value: (count - 1) as u8 });
            }
            index -= 1;
        }
        None
    }

    pub fn prescaler(&self) -> u16 {
        TIMER2_PRESCALERS[(self.prescaler_bits & 7) as usize]
    }

    /// Output frequency this configuration produces.
    pub fn frequency(&self, clock_hz: u32) -> f32 {
        let n = self.prescaler();
        if n == 0 {
            return 0.0;
        }
        clock_hz as f32 / (2.0 * n as f32 * (self.count_value as f32 + 1.0))
    }
}

pub struct ToneGen {
    clock_hz: u32,
    config: Option<ToneConfig>,
    /// Tones started since reset
    pub starts: u64,
}

impl ToneGen {
    pub fn new(clock_hz: u32) -> Self {
        ToneGen { clock_hz, config: None, starts: 0 }
    }

    /// Load the compare value and connect the clock.
    pub fn start(&mut self, config: ToneConfig) {
        self.config = Some(config);
        self.starts += 1;
    }

    /// Gate the clock.
    pub fn stop(&mut self) {
        self.config = None;
    }

    pub fn is_playing(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<ToneConfig> {
        self.config
    }

    /// Current output frequency in Hz, 0.0 when stopped.
    pub fn tone_hz(&self) -> f32 {
        self.config.map_or(0.0, |c| c.frequency(self.clock_hz))
    }
}

//! Software down-counter for delays longer than a hardware timer period.

/// Counts timer0 overflows down to zero.
#[derive(Debug, Clone, Default)]
pub struct SoftTimer {
    count: u32,
}

impl SoftTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for `count` ticks. Zero disarms.
    pub fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    pub fn remaining(&self) -> u32 {
        self.count
    }

    pub fn is_armed(&self) -> bool {
        self.count > 0
    }

    /// Count down once. True exactly on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.count > 0 {
            self.count -= 1;
            return self.count == 0;
        }
        false
    }
}

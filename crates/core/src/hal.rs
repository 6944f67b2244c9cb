//! Hardware timer abstraction used by the tempo engine.
//!
//! The engine never touches registers directly. On the target this trait is
//! implemented over Timer/Counter1 (OCR1A, TCNT1, TCCR1B clock select and the
//! SREG I-bit); in this crate it is implemented by the cycle-level
//! [`SimTimer16`](crate::peripherals::SimTimer16) and by [`FakeTimer`], a
//! recording double for unit tests.

/// Saved interrupt-enable state, returned by [`TimerHardware::enter_critical`].
///
/// Mirrors the `sreg = SREG; cli(); ... SREG = sreg;` idiom: exiting restores
/// whatever was in effect before, so nested sections are safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptState {
    enabled: bool,
}

impl InterruptState {
    pub const fn new(enabled: bool) -> Self {
        InterruptState { enabled }
    }

    /// True if interrupts were enabled when the section was entered.
    pub fn was_enabled(self) -> bool {
        self.enabled
    }
}

/// A free-running counter with a programmable top value.
///
/// Reaching the top value raises the compare interrupt and resets the count
/// to zero, so one interrupt period is `top + 1` counts.
pub trait TimerHardware {
    /// Program the compare/reload value.
    fn set_top_value(&mut self, top: u16);
    /// Currently programmed top value.
    fn top_value(&self) -> u16;
    /// Instantaneous counter value.
    fn read_count(&self) -> u16;
    fn reset_count_to(&mut self, count: u16);
    /// Connect the counting clock source.
    fn enable_clock(&mut self);
    /// Gate the counting clock without losing configuration.
    fn disable_clock(&mut self);
    /// Disable the interrupt source, returning the previous state.
    fn enter_critical(&mut self) -> InterruptState;
    /// Restore the state saved by [`enter_critical`](Self::enter_critical).
    fn exit_critical(&mut self, prior: InterruptState);

    /// Run `f` with interrupts disabled, restoring the prior state afterwards
    /// regardless of how `f` returns.
    fn interrupt_free<R, F>(&mut self, f: F) -> R
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> R,
    {
        let prior = self.enter_critical();
        let result = f(self);
        self.exit_critical(prior);
        result
    }
}

/// Recording timer double for off-target tests.
///
/// Every top value written is appended to [`top_writes`](Self::top_writes);
/// tocks are injected by calling the engine's `on_tock` directly.
#[derive(Debug, Clone)]
pub struct FakeTimer {
    pub top: u16,
    pub count: u16,
    pub running: bool,
    pub interrupts_enabled: bool,
    /// Current critical-section nesting depth
    pub critical_depth: u32,
    /// Deepest nesting observed
    pub max_critical_depth: u32,
    /// Every value passed to `set_top_value`, in order
    pub top_writes: Vec<u16>,
    /// Every value passed to `reset_count_to`, in order
    pub count_resets: Vec<u16>,
    /// Top writes performed while interrupts were enabled
    pub unguarded_top_writes: u32,
}

impl FakeTimer {
    pub fn new() -> Self {
        FakeTimer {
            top: 0xFFFF,
            count: 0,
            running: false,
            interrupts_enabled: true,
            critical_depth: 0,
            max_critical_depth: 0,
            top_writes: Vec::new(),
            count_resets: Vec::new(),
            unguarded_top_writes: 0,
        }
    }

    /// Most recently programmed top value, if any.
    pub fn last_top(&self) -> Option<u16> {
        self.top_writes.last().copied()
    }
}

impl Default for FakeTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerHardware for FakeTimer {
    fn set_top_value(&mut self, top: u16) {
        if self.interrupts_enabled {
            self.unguarded_top_writes += 1;
        }
        self.top = top;
        self.top_writes.push(top);
    }

    fn top_value(&self) -> u16 {
        self.top
    }

    fn read_count(&self) -> u16 {
        self.count
    }

    fn reset_count_to(&mut self, count: u16) {
        self.count = count;
        self.count_resets.push(count);
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
        self.critical_depth += 1;
        self.max_critical_depth = self.max_critical_depth.max(self.critical_depth);
        prior
    }

    fn exit_critical(&mut self, prior: InterruptState) {
        self.critical_depth = self.critical_depth.saturating_sub(1);
        self.interrupts_enabled = prior.was_enabled();
    }
}

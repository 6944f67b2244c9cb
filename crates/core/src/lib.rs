//! # metronome-core
//!
//! Tempo engine and cycle-level device model for an ATmega328P metronome
//! running at 8 MHz: a 16-bit tempo timer, a multiplexed three-digit
//! seven-segment display, a timer2 tone generator, a status LED and four
//! push buttons.
//!
//! ## Architecture
//!
//! - [`engine::TempoEngine`] — Tempo configuration, tock counters and event dispatch
//! - [`hal::TimerHardware`] — Timer abstraction the engine drives; [`hal::FakeTimer`] for tests
//! - [`period`] — Rational period synthesis (floor/remainder split of the tock period)
//! - [`events`] — Event sink interface and the recording [`events::EventLog`]
//! - [`peripherals`] — Timer1, Timer0 + `millis()`, Timer2 tone generator, soft timer
//! - [`seven_seg`] — Multiplexed seven-segment display and its pixel rendering
//! - [`panel`] — The event sink wiring beats to tone, LED and display
//! - [`controls`] — Non-blocking button handling and screen selection
//! - [`trace`] — Recorded event traces, trace files and timing reports
//! - [`Metronome`] — Top-level device that wires everything together
//!
//! ## Timing
//!
//! Timer1 counts at 1 MHz. A beat is [`TICKS_PER_BEAT`] compare-match
//! interrupts ("tocks"), so at `tempo` BPM each tock is
//! `1_000_000 / tempo` counts on average. The remainder of that division is
//! spread over the tocks of each cycle so that every `tempo` tocks add up to
//! exactly one second of timer counts per BPM.

pub mod controls;
pub mod engine;
pub mod events;
pub mod hal;
pub mod panel;
pub mod period;
pub mod peripherals;
pub mod range;
pub mod seven_seg;
pub mod trace;

pub use controls::{Button, ControlLoop, Screen};
pub use engine::{
    EngineState, Position, TempoEngine, DEFAULT_BEATS_PER_MEASURE, DEFAULT_SUBDIVISIONS,
    DEFAULT_TEMPO, MAX_BEATS_PER_MEASURE, MAX_SUBDIVISIONS, MIN_BEATS_PER_MEASURE,
    MIN_SUBDIVISIONS, SOFT_MAX_TEMPO, SOFT_MIN_TEMPO, TICKS_PER_BEAT,
};
pub use events::{Event, EventLog, EventSink};
pub use hal::{FakeTimer, TimerHardware};
pub use panel::Panel;
pub use period::{HARD_MIN_TEMPO, TOCK_PERIOD_FOR_1_BPM};
pub use trace::{Trace, TraceError, TraceEvent, TimingReport};

use peripherals::{Millis, SimTimer16, Timer0Event, Timer8};

/// CPU clock frequency: 8 MHz
pub const CLOCK_HZ: u32 = 8_000_000;
/// Timer1 (tempo) prescaler: 1 MHz count rate
pub const TIMER1_PRESCALE: u32 = 8;
/// Timer0 prescaler, as the Arduino core sets it for `millis()`
pub const TIMER0_PRESCALE: u32 = 64;
/// Timer0 count at which the next display digit is lit
pub const DISPLAY_MUX_ON: u8 = 16;
/// Timer0 count at which the lit digit is blanked
pub const DISPLAY_MUX_OFF: u8 = 128;

/// Tone for the first beat of a measure
pub const BEEP_FREQ_MEASURE: u16 = 1108;
/// Tone for other beats
pub const BEEP_FREQ_BEAT: u16 = 880;
/// Tone for subdivisions between beats
pub const BEEP_FREQ_SUBDIVISION: u16 = 586;

/// Rendered display width in pixels
pub const SCREEN_WIDTH: usize = 120;
/// Rendered display height in pixels
pub const SCREEN_HEIGHT: usize = 52;

/// CPU cycles between control loop passes (1 ms)
pub const POLL_CYCLES: u64 = CLOCK_HZ as u64 / 1000;
/// CPU cycles per emulated video frame (60 Hz)
pub const FRAME_CYCLES: u64 = CLOCK_HZ as u64 / 60;

const _: () = assert!(
    (CLOCK_HZ / TIMER1_PRESCALE) as u64 * 60 == TICKS_PER_BEAT as u64 * TOCK_PERIOD_FOR_1_BPM as u64
);

const LED_X: usize = 104;
const LED_Y: usize = 4;
const LED_SIZE: usize = 10;
const LED_ON: u32 = 0x20_FF_40;
const LED_OFF: u32 = 0x10_30_10;

/// The complete metronome: engine, timers, panel and control loop.
pub struct Metronome {
    engine: TempoEngine<SimTimer16, Panel>,
    timer0: Timer8,
    millis: Millis,
    controls: ControlLoop,
    /// Current CPU tick
    tick: u64,
    next_poll: u64,
    /// Settings when the current recording started
    trace_settings: Option<(u8, u8, u8)>,
    /// Tempo interrupts serviced
    pub tocks: u64,
    pub frame_count: u64,
}

impl Metronome {
    /// Power on with default settings: running, showing the tempo.
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_TEMPO, DEFAULT_BEATS_PER_MEASURE, DEFAULT_SUBDIVISIONS)
    }

    /// Power on with the given settings instead of the defaults.
    pub fn with_settings(tempo: u8, beats_per_measure: u8, subdivisions_per_beat: u8) -> Self {
        let mut engine = TempoEngine::new(SimTimer16::new(TIMER1_PRESCALE), Panel::new());
        if tempo != DEFAULT_TEMPO {
            engine.set_tempo(tempo);
        }
        if beats_per_measure != DEFAULT_BEATS_PER_MEASURE {
            engine.set_beats_per_measure(beats_per_measure);
        }
        if subdivisions_per_beat != DEFAULT_SUBDIVISIONS {
            engine.set_subdivisions(subdivisions_per_beat);
        }
        engine.start();

        let mut controls = ControlLoop::new();
        controls.show_screen(Screen::Tempo, &mut engine);

        Metronome {
            engine,
            timer0: Timer8::new(TIMER0_PRESCALE, DISPLAY_MUX_ON, DISPLAY_MUX_OFF),
            millis: Millis::new(),
            controls,
            tick: 0,
            next_poll: 0,
            trace_settings: None,
            tocks: 0,
            frame_count: 0,
        }
    }

    /// Set button state (true = pressed)
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.controls.set_button(button, pressed);
    }

    /// Run `cycles` CPU cycles, servicing every interrupt and control loop
    /// pass that falls due, in time order.
    pub fn run_cycles(&mut self, cycles: u64) {
        let end = self.tick + cycles;
        loop {
            let tempo_match = self.engine.timer().next_match_tick();
            let timer0_event = self.timer0.next_event_tick();
            let next = tempo_match
                .unwrap_or(u64::MAX)
                .min(timer0_event)
                .min(self.next_poll);
            if next > end {
                break;
            }
            self.tick = next;

            // vector order: timer1 compare before anything on timer0
            if tempo_match == Some(next) {
                self.service_tempo_timer();
            } else if timer0_event == next {
                let ev = self.timer0.advance();
                self.service_timer0(ev);
            } else {
                self.poll_controls();
                self.next_poll += POLL_CYCLES;
            }
        }
        self.tick = end;
        self.engine.timer_mut().update(end);
    }

    /// Run one 60 Hz frame.
    pub fn run_frame(&mut self) {
        self.run_cycles(FRAME_CYCLES);
        self.frame_count += 1;
    }

    /// Run until the next tempo interrupt has been serviced. Returns false
    /// when the metronome is stopped.
    pub fn step_tock(&mut self) -> bool {
        match self.engine.timer().next_match_tick() {
            Some(at) => {
                self.run_cycles(at.saturating_sub(self.tick));
                true
            }
            None => false,
        }
    }

    fn service_tempo_timer(&mut self) {
        let tick = self.tick;
        let timer = self.engine.timer_mut();
        timer.update(tick);
        if timer.check_interrupt() {
            self.engine.sink_mut().set_now(tick);
            self.engine.on_tock();
            self.tocks += 1;
        }
    }

    fn service_timer0(&mut self, ev: Timer0Event) {
        let panel = self.engine.sink_mut();
        match ev {
            Timer0Event::CompareA => panel.display.timer_high(),
            Timer0Event::CompareB => panel.display.timer_low(),
            Timer0Event::Overflow => {
                self.millis.on_overflow();
                panel.on_overflow();
            }
        }
    }

    fn poll_controls(&mut self) {
        let tick = self.tick;
        self.engine.timer_mut().update(tick);
        self.engine.sink_mut().set_now(tick);
        self.controls.poll(self.millis.get(), &mut self.engine);
        // a match that arrived inside a critical section is taken on exit
        if self.engine.timer().interrupt_pending() {
            self.service_tempo_timer();
        }
    }

    // ─── Recording ──────────────────────────────────────────────────────

    /// Start recording engine events into a trace.
    pub fn start_recording(&mut self) {
        self.trace_settings = Some((
            self.engine.tempo(),
            self.engine.beats_per_measure(),
            self.engine.subdivisions_per_beat(),
        ));
        self.engine.sink_mut().start_recording();
    }

    /// Stop recording and return the trace.
    pub fn take_trace(&mut self) -> Trace {
        let (tempo, beats_per_measure, subdivisions_per_beat) = self.trace_settings.take()
            .unwrap_or((self.engine.tempo(), self.engine.beats_per_measure(),
                self.engine.subdivisions_per_beat()));
        Trace {
            clock_hz: CLOCK_HZ,
            timer_prescale: TIMER1_PRESCALE,
            tempo,
            beats_per_measure,
            subdivisions_per_beat,
            events: self.engine.sink_mut().take_trace(),
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Milliseconds since power-on, as the firmware sees them.
    pub fn millis(&self) -> u32 {
        self.millis.get()
    }

    /// Frequency on the speaker pin, 0.0 when silent.
    pub fn audio_tone_hz(&self) -> f32 {
        self.engine.sink().tone.tone_hz()
    }

    pub fn led(&self) -> bool {
        self.engine.sink().led()
    }

    pub fn screen(&self) -> Screen {
        self.controls.screen()
    }

    /// Display contents as text, e.g. `"120"` or `"b.04"`.
    pub fn display_text(&self) -> String {
        self.engine.sink().display.text()
    }

    pub fn engine(&self) -> &TempoEngine<SimTimer16, Panel> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TempoEngine<SimTimer16, Panel> {
        self.engine.timer_mut().update(self.tick);
        self.engine.sink_mut().set_now(self.tick);
        &mut self.engine
    }

    /// Display and status LED as 0RGB pixels for minifb etc.
    pub fn framebuffer_u32(&self) -> Vec<u32> {
        let mut pixels = self.engine.sink().display.as_pixel_buffer();
        let color = if self.led() { LED_ON } else { LED_OFF };
        seven_seg::fill_rect(&mut pixels, LED_X, LED_Y, LED_SIZE, LED_SIZE, color);
        pixels
    }
}

impl Default for Metronome {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beat_ticks(trace: &Trace) -> Vec<u64> {
        trace.events.iter()
            .filter(|te| matches!(te.event, Event::Beat { .. }))
            .map(|te| te.tick)
            .collect()
    }

    #[test]
    fn test_power_on() {
        let m = Metronome::new();
        assert!(m.engine().is_running());
        assert_eq!(m.screen(), Screen::Tempo);
        assert_eq!(m.display_text(), "120");
        assert_eq!(m.millis(), 0);
        assert!(!m.led());
        assert_eq!(m.audio_tone_hz(), 0.0);
    }

    #[test]
    fn test_with_settings() {
        let m = Metronome::with_settings(90, 3, 2);
        assert_eq!(m.engine().tempo(), 90);
        assert_eq!(m.engine().beats_per_measure(), 3);
        assert_eq!(m.engine().subdivisions_per_beat(), 2);
        assert_eq!(m.display_text(), "090");
    }

    #[test]
    fn test_first_tock_after_one_period() {
        let mut m = Metronome::new();
        m.start_recording();
        assert!(m.step_tock());
        let trace = m.take_trace();
        // first tock is long at 120 bpm: 8334 counts of 8 cycles
        assert_eq!(beat_ticks(&trace), vec![8334 * 8]);
        assert!(m.led());
        assert!(m.audio_tone_hz() > 1100.0);
    }

    #[test]
    fn test_120_beats_take_one_minute() {
        let mut m = Metronome::new();
        m.start_recording();
        m.run_cycles(481_000_000);
        let trace = m.take_trace();
        let beats = beat_ticks(&trace);
        assert!(beats.len() > 120);
        assert_eq!(beats[120] - beats[0], 480_000_000);

        let report = trace.report();
        assert_eq!(report.intervals, 120);
        assert!(report.max_deviation_counts <= 60.0, "{:?}", report);
        assert!((report.measured_bpm - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_click_is_short() {
        let mut m = Metronome::new();
        m.step_tock();
        assert!(m.audio_tone_hz() > 0.0);
        // 30 overflows of 16384 cycles, plus one for phase
        m.run_cycles(31 * 16_384);
        assert_eq!(m.audio_tone_hz(), 0.0);
        assert!(!m.led());
    }

    #[test]
    fn test_millis_tracks_cycles() {
        let mut m = Metronome::new();
        m.run_cycles(u64::from(CLOCK_HZ));
        let ms = m.millis();
        assert!((997..=1000).contains(&ms), "{}", ms);
        assert_eq!(m.tick(), u64::from(CLOCK_HZ));
    }

    #[test]
    fn test_buttons_change_tempo() {
        let mut m = Metronome::new();
        m.set_button(Button::Up, true);
        m.run_cycles(POLL_CYCLES * 5);
        m.set_button(Button::Up, false);
        m.run_cycles(POLL_CYCLES * 5);
        assert_eq!(m.engine().tempo(), 121);
        assert_eq!(m.display_text(), "121");
    }

    #[test]
    fn test_start_stop_button_halts_tocks() {
        let mut m = Metronome::new();
        m.run_cycles(POLL_CYCLES * 10);
        m.set_button(Button::StartStop, true);
        m.run_cycles(POLL_CYCLES * 5);
        m.set_button(Button::StartStop, false);
        m.run_cycles(POLL_CYCLES * 5);
        assert!(!m.engine().is_running());
        let tocks = m.tocks;
        m.run_cycles(u64::from(CLOCK_HZ));
        assert_eq!(m.tocks, tocks);
        assert!(!m.step_tock());
    }

    #[test]
    fn test_tempo_change_while_running_keeps_ticking() {
        let mut m = Metronome::new();
        m.run_cycles(1_234_567);
        m.engine_mut().set_tempo(240);
        let tocks = m.tocks;
        // 240 bpm: 4167 counts per tock at most
        m.run_cycles(4_200 * 8);
        assert!(m.tocks > tocks);
        assert_eq!(m.engine().timer().wrapped_matches, 0);
    }

    #[test]
    fn test_framebuffer() {
        let mut m = Metronome::new();
        let px = m.framebuffer_u32();
        assert_eq!(px.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
        assert_eq!(px[LED_Y * SCREEN_WIDTH + LED_X], LED_OFF);
        m.step_tock();
        let px = m.framebuffer_u32();
        assert_eq!(px[LED_Y * SCREEN_WIDTH + LED_X], LED_ON);
    }

    #[test]
    fn test_display_multiplexes() {
        let mut m = Metronome::new();
        m.run_cycles(16_384 * 3);
        assert!(m.engine().sink().display.refreshes >= 3);
    }
}

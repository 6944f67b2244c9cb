//! Button handling and screen selection.
//!
//! The control loop is polled once per millisecond. It never blocks: waiting
//! for a release, the post-release settle time and auto-repeat are all states
//! of a small machine.
//!
//! - Cycle: next screen. Acts once per press.
//! - StartStop: start or stop the metronome. Acts once per press.
//! - Up/Down: step the setting on the current screen. Held, it repeats after
//!   [`REPEAT_DELAY_MS`], every [`TEMPO_REPEAT_MS`] for the tempo and every
//!   [`SETTING_REPEAT_MS`] otherwise.

use crate::engine::TempoEngine;
use crate::hal::TimerHardware;
use crate::panel::Panel;

/// Hold time before an Up/Down button starts repeating.
pub const REPEAT_DELAY_MS: u32 = 300;
pub const TEMPO_REPEAT_MS: u32 = 10;
pub const SETTING_REPEAT_MS: u32 = 100;
/// Dead time after releasing Cycle or StartStop.
pub const SETTLE_MS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Cycle,
    StartStop,
    Up,
    Down,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Cycle, Button::StartStop, Button::Up, Button::Down];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Blank,
    Tempo,
    Measure,
    Subdivide,
}

impl Screen {
    pub fn next(self) -> Screen {
        match self {
            Screen::Blank => Screen::Tempo,
            Screen::Tempo => Screen::Measure,
            Screen::Measure => Screen::Subdivide,
            Screen::Subdivide => Screen::Blank,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitRelease(Button),
    Settle { since: u32 },
    Repeat { button: Button, delta: i8, since: u32, wait: u32 },
}

pub struct ControlLoop {
    screen: Screen,
    phase: Phase,
    pressed: [bool; 4],
}

impl ControlLoop {
    pub fn new() -> Self {
        ControlLoop {
            screen: Screen::Blank,
            phase: Phase::Idle,
            pressed: [false; 4],
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.pressed[button.index()] = pressed;
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed[button.index()]
    }

    /// Switch to `screen` and redraw it.
    pub fn show_screen<T: TimerHardware>(&mut self, screen: Screen, engine: &mut TempoEngine<T, Panel>) {
        self.screen = screen;
        let (tempo, beats, subdivisions) =
            (engine.tempo(), engine.beats_per_measure(), engine.subdivisions_per_beat());
        let panel = engine.sink_mut();
        match screen {
            Screen::Tempo => panel.show_tempo(tempo),
            Screen::Measure => panel.show_beats(beats),
            Screen::Subdivide => panel.show_subdivisions(subdivisions),
            Screen::Blank => {
                panel.display.display_off();
                return;
            }
        }
        panel.display.display_on();
    }

    /// One pass of the loop at time `now` in milliseconds.
    pub fn poll<T: TimerHardware>(&mut self, now: u32, engine: &mut TempoEngine<T, Panel>) {
        match self.phase {
            Phase::AwaitRelease(button) => {
                if !self.is_pressed(button) {
                    self.phase = Phase::Settle { since: now };
                }
            }
            Phase::Settle { since } => {
                if now.wrapping_sub(since) >= SETTLE_MS {
                    self.phase = Phase::Idle;
                }
            }
            Phase::Repeat { button, delta, since, wait } => {
                if !self.is_pressed(button) {
                    self.phase = Phase::Idle;
                } else if now.wrapping_sub(since) >= wait {
                    self.adjust(delta, engine);
                    self.phase = Phase::Repeat { button, delta, since: now, wait: self.repeat_rate() };
                }
            }
            Phase::Idle => self.idle(now, engine),
        }
    }

    fn idle<T: TimerHardware>(&mut self, now: u32, engine: &mut TempoEngine<T, Panel>) {
        if self.is_pressed(Button::Cycle) {
            self.show_screen(self.screen.next(), engine);
            log::debug!("screen {:?}", self.screen);
            self.phase = Phase::AwaitRelease(Button::Cycle);
        } else if self.is_pressed(Button::StartStop) {
            engine.toggle();
            self.phase = Phase::AwaitRelease(Button::StartStop);
        } else {
            let (button, delta) = if self.is_pressed(Button::Up) {
                (Button::Up, 1)
            } else if self.is_pressed(Button::Down) {
                (Button::Down, -1)
            } else {
                return;
            };
            if self.screen == Screen::Blank {
                return;
            }
            self.adjust(delta, engine);
            self.phase = Phase::Repeat { button, delta, since: now, wait: REPEAT_DELAY_MS };
        }
    }

    fn adjust<T: TimerHardware>(&self, delta: i8, engine: &mut TempoEngine<T, Panel>) {
        match self.screen {
            Screen::Tempo => engine.increment_tempo(delta),
            Screen::Measure => engine.increment_beats(delta),
            Screen::Subdivide => engine.increment_subdivisions(delta),
            Screen::Blank => {}
        }
    }

    fn repeat_rate(&self) -> u32 {
        match self.screen {
            Screen::Tempo => TEMPO_REPEAT_MS,
            _ => SETTING_REPEAT_MS,
        }
    }
}

impl Default for ControlLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::FakeTimer;

    type Engine = TempoEngine<FakeTimer, Panel>;

    fn setup() -> (ControlLoop, Engine) {
        let mut engine = TempoEngine::new(FakeTimer::new(), Panel::new());
        let mut controls = ControlLoop::new();
        controls.show_screen(Screen::Tempo, &mut engine);
        (controls, engine)
    }

    fn run(c: &mut ControlLoop, e: &mut Engine, from: u32, to: u32) {
        for t in from..to {
            c.poll(t, e);
        }
    }

    #[test]
    fn test_power_on_screen() {
        let (c, e) = setup();
        assert_eq!(c.screen(), Screen::Tempo);
        assert!(e.sink().display.is_on());
        assert_eq!(e.sink().display.text(), "120");
    }

    #[test]
    fn test_cycle_once_per_press() {
        let (mut c, mut e) = setup();
        c.set_button(Button::Cycle, true);
        run(&mut c, &mut e, 0, 50);
        assert_eq!(c.screen(), Screen::Measure);
        assert_eq!(e.sink().display.text(), "b.04");

        c.set_button(Button::Cycle, false);
        c.poll(50, &mut e);
        // pressed again inside the settle window: ignored
        c.set_button(Button::Cycle, true);
        run(&mut c, &mut e, 51, 60);
        assert_eq!(c.screen(), Screen::Measure);
        run(&mut c, &mut e, 60, 80);
        assert_eq!(c.screen(), Screen::Subdivide);
        assert_eq!(e.sink().display.text(), "d. 1");
    }

    #[test]
    fn test_screens_wrap_through_blank() {
        let (mut c, mut e) = setup();
        let mut t = 0;
        let mut seen = Vec::new();
        for _ in 0..4 {
            c.set_button(Button::Cycle, true);
            run(&mut c, &mut e, t, t + 5);
            c.set_button(Button::Cycle, false);
            run(&mut c, &mut e, t + 5, t + 40);
            t += 40;
            seen.push((c.screen(), e.sink().display.is_on()));
        }
        assert_eq!(seen, vec![
            (Screen::Measure, true),
            (Screen::Subdivide, true),
            (Screen::Blank, false),
            (Screen::Tempo, true),
        ]);
    }

    #[test]
    fn test_start_stop_toggles_once() {
        let (mut c, mut e) = setup();
        c.set_button(Button::StartStop, true);
        run(&mut c, &mut e, 0, 100);
        assert!(e.is_running());
        c.set_button(Button::StartStop, false);
        run(&mut c, &mut e, 100, 130);
        c.set_button(Button::StartStop, true);
        run(&mut c, &mut e, 130, 140);
        assert!(!e.is_running());
    }

    #[test]
    fn test_single_tap_steps_once() {
        let (mut c, mut e) = setup();
        c.set_button(Button::Up, true);
        run(&mut c, &mut e, 0, 100);
        c.set_button(Button::Up, false);
        run(&mut c, &mut e, 100, 110);
        assert_eq!(e.tempo(), 121);
        assert_eq!(e.sink().display.text(), "121");
    }

    #[test]
    fn test_tempo_auto_repeat() {
        let (mut c, mut e) = setup();
        c.set_button(Button::Up, true);
        c.poll(0, &mut e);
        assert_eq!(e.tempo(), 121);
        run(&mut c, &mut e, 1, 300);
        assert_eq!(e.tempo(), 121);
        c.poll(300, &mut e);
        assert_eq!(e.tempo(), 122);
        // every 10 ms from here on
        run(&mut c, &mut e, 301, 401);
        assert_eq!(e.tempo(), 132);
        c.set_button(Button::Up, false);
        run(&mut c, &mut e, 401, 600);
        assert_eq!(e.tempo(), 132);
    }

    #[test]
    fn test_measure_repeat_is_slower() {
        let (mut c, mut e) = setup();
        c.show_screen(Screen::Measure, &mut e);
        c.set_button(Button::Down, true);
        run(&mut c, &mut e, 0, 501);
        // 0 ms, 300 ms, 400 ms, 500 ms
        assert_eq!(e.beats_per_measure(), 0);
        c.poll(600, &mut e);
        assert_eq!(e.beats_per_measure(), 16);
        assert_eq!(e.sink().display.text(), "b.16");
    }

    #[test]
    fn test_subdivide_screen_steps_subdivisions() {
        let (mut c, mut e) = setup();
        c.show_screen(Screen::Subdivide, &mut e);
        c.set_button(Button::Up, true);
        c.poll(0, &mut e);
        assert_eq!(e.subdivisions_per_beat(), 2);
        assert_eq!(e.sink().display.text(), "d. 2");
    }

    #[test]
    fn test_blank_screen_ignores_up_down() {
        let (mut c, mut e) = setup();
        c.show_screen(Screen::Blank, &mut e);
        c.set_button(Button::Up, true);
        run(&mut c, &mut e, 0, 1000);
        assert_eq!(e.tempo(), 120);
        assert!(!e.sink().display.is_on());
    }

    #[test]
    fn test_millis_wraparound() {
        let (mut c, mut e) = setup();
        let start = u32::MAX - 5;
        c.set_button(Button::Up, true);
        c.poll(start, &mut e);
        c.poll(start.wrapping_add(299), &mut e);
        assert_eq!(e.tempo(), 121);
        c.poll(start.wrapping_add(300), &mut e);
        assert_eq!(e.tempo(), 122);
    }
}

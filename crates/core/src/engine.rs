//! The tempo engine: tempo configuration, tock counters and event dispatch.
//!
//! Terms:
//!
//! - **tock**: one compare-match interrupt of the tempo timer. A beat is
//!   always [`TICKS_PER_BEAT`] tocks. Tocks are never exposed to the user.
//! - **subdivision**: a user-selected even split of the beat, every
//!   `TICKS_PER_BEAT / subdivisions_per_beat` tocks.
//! - **beat**: the main audible event.
//! - **measure**: `beats_per_measure` beats; beat 0 of a measure is accented
//!   unless `beats_per_measure` is 0.
//!
//! ```text
//! subdivisions = 3
//!              |*********|*********|*********|*********|*********|*********|
//! tocks>       0         10        20        30        40        50        60->0
//! events>      B,S0                S1                  S2                  B,S0
//! subdivisions = 4
//!              |**************|**************|**************|**************|
//! tocks>       0              15             30             45             60->0
//! events>      B,S0           S1             S2             S3             B,S0
//! ```
//!
//! [`TempoEngine::on_tock`] runs in interrupt context. Everything else runs in
//! the control loop, and every write it makes to state the handler also
//! touches happens inside [`TimerHardware::interrupt_free`].

use crate::events::EventSink;
use crate::hal::TimerHardware;
use crate::period::PeriodState;
use crate::range::wrap_increment;

/// Tocks per beat. Divisible by every legal subdivision count.
pub const TICKS_PER_BEAT: u8 = 60;

/// Lower bound of the tempo reachable with the increment buttons.
pub const SOFT_MIN_TEMPO: u8 = 30;
/// Upper bound of the tempo reachable with the increment buttons.
pub const SOFT_MAX_TEMPO: u8 = 254;
pub const MIN_BEATS_PER_MEASURE: u8 = 0;
pub const MAX_BEATS_PER_MEASURE: u8 = 16;
pub const MIN_SUBDIVISIONS: u8 = 1;
pub const MAX_SUBDIVISIONS: u8 = 6;

pub const DEFAULT_TEMPO: u8 = 120;
pub const DEFAULT_BEATS_PER_MEASURE: u8 = 4;
pub const DEFAULT_SUBDIVISIONS: u8 = 1;

/// Tocks between subdivisions, indexed by subdivisions per beat.
/// Entry 0 is filler.
pub const TOCKS_PER_SUBDIVISION: [u8; MAX_SUBDIVISIONS as usize + 1] = [0, 60, 30, 20, 15, 12, 10];

const _: () = {
    let mut n = MIN_SUBDIVISIONS;
    while n <= MAX_SUBDIVISIONS {
        assert!(TOCKS_PER_SUBDIVISION[n as usize] as u16 * n as u16 == TICKS_PER_BEAT as u16);
        n += 1;
    }
};

/// Tocks between subdivisions for a subdivision count, clamped to the table.
pub fn tocks_per_subdivision(subdivisions_per_beat: u8) -> u8 {
    TOCKS_PER_SUBDIVISION[subdivisions_per_beat.clamp(MIN_SUBDIVISIONS, MAX_SUBDIVISIONS) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
}

/// Where the engine is within the current beat and measure.
///
/// Every field describes the *next* tock to be handled: a beat fires on the
/// tock where `tock_count_mod_beat` is 0, a subdivision where
/// `tock_count_mod_subdivision` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub tock_count_mod_beat: u8,
    pub tock_count_mod_subdivision: u8,
    pub beat_index: u8,
    pub subdivision_index: u8,
}

/// Tempo engine bound to one hardware timer and one event sink.
///
/// The target has a single 16-bit timer for tempo, so a device holds exactly
/// one engine.
pub struct TempoEngine<T: TimerHardware, S: EventSink> {
    timer: T,
    sink: S,
    tempo: u8,
    beats_per_measure: u8,
    subdivisions_per_beat: u8,
    period: PeriodState,
    position: Position,
    state: EngineState,
}

impl<T: TimerHardware, S: EventSink> TempoEngine<T, S> {
    /// Create a stopped engine with default settings and program the timer.
    ///
    /// No change notifications are sent for the initial values.
    pub fn new(timer: T, sink: S) -> Self {
        let mut engine = TempoEngine {
            timer,
            sink,
            tempo: DEFAULT_TEMPO,
            beats_per_measure: DEFAULT_BEATS_PER_MEASURE,
            subdivisions_per_beat: DEFAULT_SUBDIVISIONS,
            period: PeriodState::for_tempo(DEFAULT_TEMPO),
            position: Position::default(),
            state: EngineState::Stopped,
        };
        engine.update_timer(DEFAULT_TEMPO);
        engine
    }

    // ─── Configuration ──────────────────────────────────────────────────

    /// Set the tempo. Values below the hard minimum saturate the timer
    /// period rather than overflow it.
    pub fn set_tempo(&mut self, tempo: u8) {
        self.update_timer(tempo);
        log::debug!("tempo {} bpm: top={} remainder={}",
            tempo, self.period.top_value(), self.period.remainder);
        self.sink.on_tempo_changed(tempo);
    }

    /// Step the tempo, wrapping within the soft range.
    pub fn increment_tempo(&mut self, delta: i8) {
        let tempo = wrap_increment(self.tempo, delta, SOFT_MIN_TEMPO, SOFT_MAX_TEMPO);
        self.set_tempo(tempo);
    }

    /// Set the measure length (clamped to 0..=16). Leaves the period alone.
    ///
    /// A beat index past the new end of the measure is pulled back so the
    /// next beat to fire starts a measure.
    pub fn set_beats_per_measure(&mut self, beats: u8) {
        let beats = beats.min(MAX_BEATS_PER_MEASURE);
        let Self { timer, position, beats_per_measure, .. } = self;
        timer.interrupt_free(|_| {
            *beats_per_measure = beats;
            if position.beat_index >= beats {
                // mid-beat the index is the beat sounding now; the wrap at
                // its end takes the last index back to 0
                position.beat_index = if position.tock_count_mod_beat == 0 || beats == 0 {
                    0
                } else {
                    beats - 1
                };
            }
        });
        log::debug!("beats per measure {}", beats);
        self.sink.on_beats_changed(beats);
    }

    pub fn increment_beats(&mut self, delta: i8) {
        let beats = wrap_increment(self.beats_per_measure, delta,
            MIN_BEATS_PER_MEASURE, MAX_BEATS_PER_MEASURE);
        self.set_beats_per_measure(beats);
    }

    /// Set the subdivision count (clamped to 1..=6).
    ///
    /// The subdivision counters are recomputed from the position within the
    /// current beat, so the beat keeps its phase and the next subdivision
    /// lands on the new grid.
    pub fn set_subdivisions(&mut self, subdivisions: u8) {
        let subdivisions = subdivisions.clamp(MIN_SUBDIVISIONS, MAX_SUBDIVISIONS);
        let tocks = tocks_per_subdivision(subdivisions);
        let Self { timer, position, subdivisions_per_beat, .. } = self;
        timer.interrupt_free(|_| {
            *subdivisions_per_beat = subdivisions;
            position.tock_count_mod_subdivision = position.tock_count_mod_beat % tocks;
            let reached = position.tock_count_mod_beat / tocks;
            position.subdivision_index = if position.tock_count_mod_subdivision == 0 {
                reached
            } else {
                reached + 1
            };
            if position.subdivision_index >= subdivisions {
                position.subdivision_index = 0;
            }
        });
        log::debug!("subdivisions per beat {}", subdivisions);
        self.sink.on_subdivisions_changed(subdivisions);
    }

    /// Step through the subdivision table, wrapping at either end.
    pub fn increment_subdivisions(&mut self, delta: i8) {
        let subdivisions = wrap_increment(self.subdivisions_per_beat, delta,
            MIN_SUBDIVISIONS, MAX_SUBDIVISIONS);
        self.set_subdivisions(subdivisions);
    }

    // ─── Run state ──────────────────────────────────────────────────────

    /// Restart from the top of a measure and connect the timer clock.
    pub fn start(&mut self) {
        let Self { timer, period, position, state, .. } = self;
        timer.interrupt_free(|timer| {
            *position = Position::default();
            period.tock_count_mod_tempo = 0;
            timer.set_top_value(period.top_value());
            timer.reset_count_to(0);
            timer.enable_clock();
            *state = EngineState::Running;
        });
        log::info!("metronome started at {} bpm", self.tempo);
    }

    /// Disconnect the timer clock. Position is kept.
    pub fn stop(&mut self) {
        self.timer.disable_clock();
        self.state = EngineState::Stopped;
        log::info!("metronome stopped");
    }

    pub fn toggle(&mut self) {
        match self.state {
            EngineState::Running => self.stop(),
            EngineState::Stopped => self.start(),
        }
    }

    // ─── Interrupt handler ──────────────────────────────────────────────

    /// Handle one timer compare match.
    ///
    /// Only ever invoked from the tempo timer interrupt, which cannot nest.
    /// Nothing fires while stopped because the timer clock is gated.
    pub fn on_tock(&mut self) {
        let pos = &mut self.position;

        if pos.tock_count_mod_beat == 0 {
            self.sink.on_beat(pos.beat_index, self.beats_per_measure);
            pos.subdivision_index = 0;
        }
        if pos.tock_count_mod_subdivision == 0 {
            self.sink.on_subdivision(pos.subdivision_index, self.subdivisions_per_beat);
            pos.subdivision_index += 1;
            if pos.subdivision_index >= self.subdivisions_per_beat {
                pos.subdivision_index = 0;
            }
        }

        pos.tock_count_mod_beat += 1;
        pos.tock_count_mod_subdivision += 1;
        if pos.tock_count_mod_subdivision >= tocks_per_subdivision(self.subdivisions_per_beat) {
            pos.tock_count_mod_subdivision = 0;
        }
        if pos.tock_count_mod_beat >= TICKS_PER_BEAT {
            pos.tock_count_mod_beat = 0;
            pos.tock_count_mod_subdivision = 0;
            pos.beat_index += 1;
            // >= rather than == so beats_per_measure = 0 still wraps
            if pos.beat_index >= self.beats_per_measure {
                pos.beat_index = 0;
            }
        }

        // switch between the long and short period
        if self.period.at_switch_point() {
            let top = self.period.top_value();
            self.timer.interrupt_free(|timer| timer.set_top_value(top));
        }
        self.period.advance(self.tempo);
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn tempo(&self) -> u8 {
        self.tempo
    }

    pub fn beats_per_measure(&self) -> u8 {
        self.beats_per_measure
    }

    pub fn subdivisions_per_beat(&self) -> u8 {
        self.subdivisions_per_beat
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn period(&self) -> PeriodState {
        self.period
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Recompute the period for `tempo` and install it.
    ///
    /// The tock counter modulo tempo restarts; beat and measure position are
    /// kept so the change does not jump in the measure.
    fn update_timer(&mut self, tempo: u8) {
        let new_period = PeriodState::for_tempo(tempo);
        let top = new_period.top_value();
        let Self { timer, tempo: current, period, .. } = self;
        timer.interrupt_free(|timer| {
            *current = tempo;
            *period = new_period;
            timer.set_top_value(top);
            // A counter already at or past the new top would otherwise run on
            // to 0xFFFF and wrap before matching. Force a match next count.
            if timer.read_count() >= top {
                timer.reset_count_to(top.saturating_sub(1));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventLog};
    use crate::hal::FakeTimer;
    use crate::period::{HARD_MIN_TEMPO, TIMER_MAX_TOP, TOCK_PERIOD_FOR_1_BPM};

    type Engine = TempoEngine<FakeTimer, EventLog>;

    fn engine() -> Engine {
        TempoEngine::new(FakeTimer::new(), EventLog::new())
    }

    fn tock(e: &mut Engine) {
        e.on_tock();
        e.sink_mut().tock += 1;
    }

    fn run(e: &mut Engine, tocks: u32) {
        for _ in 0..tocks {
            tock(e);
        }
    }

    #[test]
    fn test_defaults() {
        let e = engine();
        assert_eq!(e.tempo(), 120);
        assert_eq!(e.beats_per_measure(), 4);
        assert_eq!(e.subdivisions_per_beat(), 1);
        assert_eq!(e.state(), EngineState::Stopped);
        assert!(!e.timer().running);
        assert_eq!(e.timer().top, 8333);
        assert!(e.sink().events.is_empty());
    }

    #[test]
    fn test_tempo_120_cycle() {
        let mut e = engine();
        e.start();
        let mut tops = Vec::new();
        for _ in 0..120 {
            tock(&mut e);
            tops.push(e.timer().top);
        }
        assert_eq!(tops.iter().filter(|&&t| t == 8333).count(), 40);
        assert_eq!(tops.iter().filter(|&&t| t == 8332).count(), 80);
        let total: u32 = tops.iter().map(|&t| u32::from(t) + 1).sum();
        assert_eq!(total, TOCK_PERIOD_FOR_1_BPM);
    }

    #[test]
    fn test_every_tempo_averages_exactly() {
        let mut e = engine();
        for tempo in SOFT_MIN_TEMPO..=SOFT_MAX_TEMPO {
            e.set_tempo(tempo);
            e.start();
            let p = e.period();
            let mut total = 0u32;
            let mut long = 0u32;
            for _ in 0..tempo {
                tock(&mut e);
                let period = u32::from(e.timer().top) + 1;
                assert!(period == p.floor || period == p.floor + 1, "tempo {}", tempo);
                if period == p.floor + 1 {
                    long += 1;
                }
                total += period;
            }
            assert_eq!(total, TOCK_PERIOD_FOR_1_BPM, "tempo {}", tempo);
            assert_eq!(long, u32::from(p.remainder), "tempo {}", tempo);
        }
    }

    #[test]
    fn test_top_writes_are_guarded() {
        let mut e = engine();
        e.start();
        run(&mut e, 300);
        e.increment_tempo(7);
        run(&mut e, 300);
        assert_eq!(e.timer().unguarded_top_writes, 0);
        assert!(e.timer().interrupts_enabled);
        assert_eq!(e.timer().critical_depth, 0);
    }

    #[test]
    fn test_subdivisions_of_three() {
        let mut e = engine();
        e.set_subdivisions(3);
        e.start();
        e.sink_mut().clear();
        run(&mut e, 120);
        assert_eq!(e.sink().subdivision_tocks(), vec![0, 20, 40, 60, 80, 100]);
        assert_eq!(e.sink().beat_tocks(), vec![0, 60]);
        let indices: Vec<u8> = e.sink().events.iter()
            .filter_map(|(_, ev)| match ev {
                Event::Subdivision { index, of: 3 } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_subdivisions_of_four() {
        let mut e = engine();
        e.set_subdivisions(4);
        e.start();
        e.sink_mut().clear();
        run(&mut e, 60);
        assert_eq!(e.sink().subdivision_tocks(), vec![0, 15, 30, 45]);
    }

    #[test]
    fn test_beat_before_subdivision() {
        let mut e = engine();
        e.set_subdivisions(2);
        e.start();
        e.sink_mut().clear();
        tock(&mut e);
        assert_eq!(e.sink().events, vec![
            (0, Event::Beat { index: 0, of: 4 }),
            (0, Event::Subdivision { index: 0, of: 2 }),
        ]);
    }

    #[test]
    fn test_measure_wraps() {
        let mut e = engine();
        e.start();
        run(&mut e, 60 * 5);
        let beats: Vec<Event> = e.sink().events.iter()
            .map(|(_, ev)| *ev)
            .filter(|ev| matches!(ev, Event::Beat { .. }))
            .collect();
        assert_eq!(beats, vec![
            Event::Beat { index: 0, of: 4 },
            Event::Beat { index: 1, of: 4 },
            Event::Beat { index: 2, of: 4 },
            Event::Beat { index: 3, of: 4 },
            Event::Beat { index: 0, of: 4 },
        ]);
        assert!(beats[0].is_accented());
        assert!(beats[4].is_accented());
    }

    #[test]
    fn test_zero_beats_never_accents() {
        let mut e = engine();
        e.set_beats_per_measure(0);
        e.start();
        run(&mut e, 60 * 6);
        let beats: Vec<Event> = e.sink().events.iter()
            .map(|(_, ev)| *ev)
            .filter(|ev| matches!(ev, Event::Beat { .. }))
            .collect();
        assert_eq!(beats.len(), 6);
        assert!(beats.iter().all(|b| !b.is_accented()));
        assert_eq!(e.position().beat_index, 0);

        // back to a real measure: the very next beat is a downbeat
        e.set_beats_per_measure(3);
        e.sink_mut().clear();
        run(&mut e, 60 * 4);
        let beats: Vec<Event> = e.sink().events.iter()
            .map(|(_, ev)| *ev)
            .filter(|ev| matches!(ev, Event::Beat { .. }))
            .collect();
        assert_eq!(beats, vec![
            Event::Beat { index: 0, of: 3 },
            Event::Beat { index: 1, of: 3 },
            Event::Beat { index: 2, of: 3 },
            Event::Beat { index: 0, of: 3 },
        ]);
    }

    fn beats_fired(e: &Engine) -> Vec<Event> {
        e.sink().events.iter()
            .map(|(_, ev)| *ev)
            .filter(|ev| matches!(ev, Event::Beat { .. }))
            .collect()
    }

    #[test]
    fn test_shorter_measure_between_beats() {
        let mut e = engine();
        e.start();
        // beats 0..=2 have fired, beat 3 is next
        run(&mut e, 60 * 3);
        assert_eq!(e.position().beat_index, 3);
        e.set_beats_per_measure(2);
        assert_eq!(e.position().beat_index, 0);
        e.sink_mut().clear();
        run(&mut e, 60 * 3);
        assert_eq!(beats_fired(&e), vec![
            Event::Beat { index: 0, of: 2 },
            Event::Beat { index: 1, of: 2 },
            Event::Beat { index: 0, of: 2 },
        ]);
        assert!(beats_fired(&e)[0].is_accented());
    }

    #[test]
    fn test_shorter_measure_mid_beat() {
        let mut e = engine();
        e.start();
        // beat 3 is sounding, half way through
        run(&mut e, 60 * 3 + 30);
        e.set_beats_per_measure(2);
        assert!(e.position().beat_index < 2);
        e.sink_mut().clear();
        run(&mut e, 30 + 60 * 2);
        assert_eq!(beats_fired(&e), vec![
            Event::Beat { index: 0, of: 2 },
            Event::Beat { index: 1, of: 2 },
        ]);
    }

    #[test]
    fn test_measure_shrunk_to_zero() {
        let mut e = engine();
        e.start();
        run(&mut e, 60 * 3);
        e.set_beats_per_measure(0);
        assert_eq!(e.position().beat_index, 0);
        e.sink_mut().clear();
        run(&mut e, 60 * 2);
        assert_eq!(beats_fired(&e), vec![
            Event::Beat { index: 0, of: 0 },
            Event::Beat { index: 0, of: 0 },
        ]);
    }

    #[test]
    fn test_start_stop_start_resets_position() {
        let mut e = engine();
        e.set_subdivisions(5);
        e.start();
        run(&mut e, 137);
        assert_ne!(e.position(), Position::default());
        e.stop();
        assert!(!e.timer().running);
        // stop freezes position
        let frozen = e.position();
        assert_eq!(frozen.tock_count_mod_beat, 17);
        e.start();
        assert_eq!(e.position(), Position::default());
        assert_eq!(e.period().tock_count_mod_tempo, 0);
        assert_eq!(e.timer().count, 0);
        assert_eq!(e.timer().count_resets.last(), Some(&0));
        assert!(e.timer().running);

        run(&mut e, 61);
        e.stop();
        e.start();
        assert_eq!(e.position(), Position::default());
    }

    #[test]
    fn test_toggle() {
        let mut e = engine();
        e.toggle();
        assert!(e.is_running());
        e.toggle();
        assert!(!e.is_running());
    }

    #[test]
    fn test_subdivision_change_mid_beat_keeps_phase() {
        let mut e = engine();
        e.start();
        run(&mut e, 25);
        e.set_subdivisions(4);
        let pos = e.position();
        assert_eq!(pos.tock_count_mod_beat, 25);
        assert_eq!(pos.tock_count_mod_subdivision, 10);
        assert_eq!(pos.subdivision_index, 2);

        e.sink_mut().clear();
        run(&mut e, 35);
        let subs: Vec<(u64, Event)> = e.sink().events.iter()
            .copied()
            .filter(|(_, ev)| matches!(ev, Event::Subdivision { .. }))
            .collect();
        assert_eq!(subs, vec![
            (30, Event::Subdivision { index: 2, of: 4 }),
            (45, Event::Subdivision { index: 3, of: 4 }),
        ]);
        // beat boundary is where it always was
        tock(&mut e);
        assert_eq!(e.sink().beat_tocks(), vec![60]);
    }

    #[test]
    fn test_subdivision_change_on_boundary() {
        let mut e = engine();
        e.set_subdivisions(2);
        e.start();
        run(&mut e, 30);
        e.set_subdivisions(3);
        // 30 is not on the thirds grid: next subdivision is the third one at 40
        assert_eq!(e.position().tock_count_mod_subdivision, 10);
        assert_eq!(e.position().subdivision_index, 2);
        e.set_subdivisions(6);
        assert_eq!(e.position().tock_count_mod_subdivision, 0);
        assert_eq!(e.position().subdivision_index, 3);
    }

    #[test]
    fn test_missed_match_guard() {
        let mut e = engine();
        e.start();
        e.timer_mut().count = 9000;
        e.set_tempo(240);
        let top = e.timer().top;
        assert_eq!(top, 4166);
        assert_eq!(e.timer().count, top - 1);

        // no correction when the counter is still below the new top
        e.timer_mut().count = 100;
        let resets = e.timer().count_resets.len();
        e.set_tempo(60);
        assert_eq!(e.timer().count, 100);
        assert_eq!(e.timer().count_resets.len(), resets);
    }

    #[test]
    fn test_tempo_change_keeps_beat_position() {
        let mut e = engine();
        e.start();
        run(&mut e, 70);
        let before = e.position();
        e.set_tempo(90);
        assert_eq!(e.position(), before);
        assert_eq!(e.period().tock_count_mod_tempo, 0);
    }

    #[test]
    fn test_increment_tempo_wraps_soft_range() {
        let mut e = engine();
        e.set_tempo(SOFT_MAX_TEMPO);
        e.increment_tempo(1);
        assert_eq!(e.tempo(), SOFT_MIN_TEMPO);
        e.increment_tempo(-1);
        assert_eq!(e.tempo(), SOFT_MAX_TEMPO);
        e.set_tempo(100);
        e.increment_tempo(1);
        e.increment_tempo(-1);
        assert_eq!(e.tempo(), 100);
        assert_eq!(e.sink().last(), Some(Event::TempoChanged(100)));
    }

    #[test]
    fn test_increment_beats_wraps() {
        let mut e = engine();
        e.set_beats_per_measure(0);
        e.increment_beats(-1);
        assert_eq!(e.beats_per_measure(), MAX_BEATS_PER_MEASURE);
        e.increment_beats(1);
        assert_eq!(e.beats_per_measure(), 0);
        assert_eq!(e.sink().last(), Some(Event::BeatsChanged(0)));
    }

    #[test]
    fn test_beats_change_leaves_period_alone() {
        let mut e = engine();
        let writes = e.timer().top_writes.len();
        e.increment_beats(1);
        e.set_beats_per_measure(200);
        assert_eq!(e.beats_per_measure(), MAX_BEATS_PER_MEASURE);
        assert_eq!(e.timer().top_writes.len(), writes);
    }

    #[test]
    fn test_increment_subdivisions_stays_in_table() {
        let mut e = engine();
        let mut seen = Vec::new();
        for _ in 0..7 {
            e.increment_subdivisions(1);
            let s = e.subdivisions_per_beat();
            assert_eq!(TICKS_PER_BEAT % s, 0);
            seen.push(s);
        }
        assert_eq!(seen, vec![2, 3, 4, 5, 6, 1, 2]);
        e.set_subdivisions(1);
        e.increment_subdivisions(-1);
        assert_eq!(e.subdivisions_per_beat(), 6);
        e.set_subdivisions(0);
        assert_eq!(e.subdivisions_per_beat(), 1);
    }

    #[test]
    fn test_below_hard_minimum_saturates() {
        let mut e = engine();
        e.set_tempo(HARD_MIN_TEMPO - 6);
        assert_eq!(e.timer().top, TIMER_MAX_TOP);
        assert_eq!(e.period().remainder, 0);
        e.start();
        let writes = e.timer().top_writes.len();
        run(&mut e, 50);
        // no correction switching without a remainder
        assert_eq!(e.timer().top_writes.len(), writes);
        assert_eq!(e.timer().top, TIMER_MAX_TOP);
    }
}

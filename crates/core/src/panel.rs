//! Front panel: the event sink that turns engine events into sound, light and
//! digits.
//!
//! A beat or subdivision starts a tone and arms a soft timer; when the timer
//! runs out on a later timer0 overflow, the tone and the LED go off again.

use crate::events::{Event, EventSink};
use crate::peripherals::{SoftTimer, ToneConfig, ToneGen};
use crate::seven_seg::SevenSeg;
use crate::trace::TraceEvent;
use crate::{BEEP_FREQ_BEAT, BEEP_FREQ_MEASURE, BEEP_FREQ_SUBDIVISION, CLOCK_HZ};

/// Timer0 overflows a click lasts for, about 61 ms.
pub const CLICK_OVERFLOWS: u32 = 30;

const MEASURE_TONE: Option<ToneConfig> = ToneConfig::for_frequency(CLOCK_HZ, BEEP_FREQ_MEASURE);
const BEAT_TONE: Option<ToneConfig> = ToneConfig::for_frequency(CLOCK_HZ, BEEP_FREQ_BEAT);
const SUBDIVISION_TONE: Option<ToneConfig> = ToneConfig::for_frequency(CLOCK_HZ, BEEP_FREQ_SUBDIVISION);

const _: () = assert!(MEASURE_TONE.is_some() && BEAT_TONE.is_some() && SUBDIVISION_TONE.is_some());

pub struct Panel {
    pub tone: ToneGen,
    pub display: SevenSeg,
    sound_timer: SoftTimer,
    led: bool,
    /// CPU tick stamped on recorded events
    now: u64,
    trace: Option<Vec<TraceEvent>>,
}

impl Panel {
    pub fn new() -> Self {
        Panel {
            tone: ToneGen::new(CLOCK_HZ),
            display: SevenSeg::new(),
            sound_timer: SoftTimer::new(),
            led: false,
            now: 0,
            trace: None,
        }
    }

    pub fn led(&self) -> bool {
        self.led
    }

    pub fn set_now(&mut self, tick: u64) {
        self.now = tick;
    }

    /// Timer0 overflow: count the click down and silence it when done.
    pub fn on_overflow(&mut self) {
        if self.sound_timer.tick() {
            self.tone.stop();
            self.led = false;
        }
    }

    fn click(&mut self, tone: Option<ToneConfig>) {
        if let Some(config) = tone {
            self.tone.start(config);
        }
        self.sound_timer.set_count(CLICK_OVERFLOWS);
    }

    // ─── Display pages ──────────────────────────────────────────────────

    pub fn show_tempo(&mut self, tempo: u8) {
        self.display.show_number(i32::from(tempo), false);
    }

    /// `b.NN`
    pub fn show_beats(&mut self, beats: u8) {
        self.display.set_digit(2, 'b', true);
        self.display.set_digit(1, char::from(b'0' + beats / 10 % 10), false);
        self.display.set_digit(0, char::from(b'0' + beats % 10), false);
    }

    /// `d. N`
    pub fn show_subdivisions(&mut self, subdivisions: u8) {
        self.display.set_digit(2, 'd', true);
        self.display.set_digit(1, ' ', false);
        self.display.set_digit(0, char::from(b'0' + subdivisions % 10), false);
    }

    // ─── Tracing ────────────────────────────────────────────────────────

    /// Start recording events, discarding any earlier recording.
    pub fn start_recording(&mut self) {
        self.trace = Some(Vec::new());
    }

    pub fn is_recording(&self) -> bool {
        self.trace.is_some()
    }

    /// Stop recording and hand back what was recorded.
    pub fn take_trace(&mut self) -> Vec<TraceEvent> {
        self.trace.take().unwrap_or_default()
    }

    fn record(&mut self, event: Event) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceEvent { tick: self.now, event });
        }
    }
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for Panel {
    fn on_beat(&mut self, beat_index: u8, beats_per_measure: u8) {
        let event = Event::Beat { index: beat_index, of: beats_per_measure };
        if event.is_accented() {
            self.click(MEASURE_TONE);
            self.led = true;
        } else {
            self.click(BEAT_TONE);
        }
        self.record(event);
    }

    fn on_subdivision(&mut self, subdivision_index: u8, subdivisions_per_beat: u8) {
        // subdivision 0 is the beat itself
        if subdivision_index != 0 {
            self.click(SUBDIVISION_TONE);
        }
        self.record(Event::Subdivision { index: subdivision_index, of: subdivisions_per_beat });
    }

    fn on_tempo_changed(&mut self, tempo: u8) {
        self.show_tempo(tempo);
        self.record(Event::TempoChanged(tempo));
    }

    fn on_beats_changed(&mut self, beats_per_measure: u8) {
        self.show_beats(beats_per_measure);
        self.record(Event::BeatsChanged(beats_per_measure));
    }

    fn on_subdivisions_changed(&mut self, subdivisions_per_beat: u8) {
        self.show_subdivisions(subdivisions_per_beat);
        self.record(Event::SubdivisionsChanged(subdivisions_per_beat));
    }
}

//! Event sink interface fed by the tempo engine.
//!
//! `on_beat` and `on_subdivision` run inside the tock interrupt handler: they
//! must finish quickly and never block. The `*_changed` notifications run in
//! the control loop. A sink is owned by the engine and has no handle back to
//! it, so a callback cannot re-enter the engine's setters.

use serde::{Deserialize, Serialize};

pub trait EventSink {
    fn on_beat(&mut self, _beat_index: u8, _beats_per_measure: u8) {}
    fn on_subdivision(&mut self, _subdivision_index: u8, _subdivisions_per_beat: u8) {}
    fn on_tempo_changed(&mut self, _tempo: u8) {}
    fn on_beats_changed(&mut self, _beats_per_measure: u8) {}
    fn on_subdivisions_changed(&mut self, _subdivisions_per_beat: u8) {}
}

/// Sink that ignores everything.
impl EventSink for () {}

/// One engine notification, as recorded by [`EventLog`] and trace files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Beat { index: u8, of: u8 },
    Subdivision { index: u8, of: u8 },
    TempoChanged(u8),
    BeatsChanged(u8),
    SubdivisionsChanged(u8),
}

impl Event {
    /// First beat of a measure. Never true when beats per measure is 0.
    pub fn is_accented(&self) -> bool {
        matches!(*self, Event::Beat { index: 0, of } if of > 0)
    }

    /// Deliver this event to `sink`.
    pub fn dispatch<S: EventSink + ?Sized>(self, sink: &mut S) {
        match self {
            Event::Beat { index, of } => sink.on_beat(index, of),
            Event::Subdivision { index, of } => sink.on_subdivision(index, of),
            Event::TempoChanged(v) => sink.on_tempo_changed(v),
            Event::BeatsChanged(v) => sink.on_beats_changed(v),
            Event::SubdivisionsChanged(v) => sink.on_subdivisions_changed(v),
        }
    }
}

/// Sink that records every event in order, paired with the tock number it
/// arrived on. `tock` is advanced by the test driving the engine.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<(u64, Event)>,
    pub tock: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Tock numbers on which a beat fired.
    pub fn beat_tocks(&self) -> Vec<u64> {
        self.events.iter()
            .filter(|(_, e)| matches!(e, Event::Beat { .. }))
            .map(|(t, _)| *t)
            .collect()
    }

    /// Tock numbers on which a subdivision fired.
    pub fn subdivision_tocks(&self) -> Vec<u64> {
        self.events.iter()
            .filter(|(_, e)| matches!(e, Event::Subdivision { .. }))
            .map(|(t, _)| *t)
            .collect()
    }

    pub fn last(&self) -> Option<Event> {
        self.events.last().map(|(_, e)| *e)
    }

    fn push(&mut self, event: Event) {
        self.events.push((self.tock, event));
    }
}

impl EventSink for EventLog {
    fn on_beat(&mut self, index: u8, of: u8) {
        self.push(Event::Beat { index, of });
    }
    fn on_subdivision(&mut self, index: u8, of: u8) {
        self.push(Event::Subdivision { index, of });
    }
    fn on_tempo_changed(&mut self, tempo: u8) {
        self.push(Event::TempoChanged(tempo));
    }
    fn on_beats_changed(&mut self, beats: u8) {
        self.push(Event::BeatsChanged(beats));
    }
    fn on_subdivisions_changed(&mut self, subdivisions: u8) {
        self.push(Event::SubdivisionsChanged(subdivisions));
    }
}

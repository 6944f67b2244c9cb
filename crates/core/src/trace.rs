//! Recorded event traces and beat timing analysis.
//!
//! A trace is every engine event the panel saw, stamped with the CPU tick it
//! happened on. Traces are written to disk so a later run can be checked
//! against a known-good one, and are analysed into a [`TimingReport`].
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "MTRC"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::events::Event;
use crate::period::TOCK_PERIOD_FOR_1_BPM;
use crate::TICKS_PER_BEAT;

const MAGIC: &[u8; 4] = b"MTRC";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub tick: u64,
    pub event: Event,
}

/// A recording plus the settings in effect when it started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub clock_hz: u32,
    /// CPU cycles per tempo timer count
    pub timer_prescale: u32,
    pub tempo: u8,
    pub beats_per_measure: u8,
    pub subdivisions_per_beat: u8,
    pub events: Vec<TraceEvent>,
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace file too small ({0} bytes)")]
    Truncated(usize),
    #[error("not a metronome trace (bad magic)")]
    BadMagic,
    #[error("unsupported trace version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("decompress error: {0}")]
    Decompress(String),
    #[error("serialize error: {0}")]
    Encode(#[source] bincode::Error),
    #[error("deserialize error: {0}")]
    Decode(#[source] bincode::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Trace {
    /// Serialize with header and deflate compression.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TraceError> {
        let payload = bincode::serialize(self).map_err(TraceError::Encode)?;
        let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

        let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    /// Parse bytes written by [`to_bytes`](Self::to_bytes), checking magic and
    /// version.
    pub fn from_bytes(data: &[u8]) -> Result<Trace, TraceError> {
        if data.len() < HEADER_LEN {
            return Err(TraceError::Truncated(data.len()));
        }
        if &data[0..4] != MAGIC {
            return Err(TraceError::BadMagic);
        }
        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version != FORMAT_VERSION {
            return Err(TraceError::UnsupportedVersion { found: version, expected: FORMAT_VERSION });
        }
        let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
            .map_err(|e| TraceError::Decompress(format!("{:?}", e)))?;
        bincode::deserialize(&decompressed).map_err(TraceError::Decode)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), TraceError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes)?;
        log::info!("wrote {} events to {}", self.events.len(), path.display());
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Trace, TraceError> {
        let data = std::fs::read(path)?;
        let trace = Trace::from_bytes(&data)?;
        log::info!("read {} events from {}", trace.events.len(), path.display());
        Ok(trace)
    }

    /// Index of the first event where `self` and `other` disagree, counting a
    /// length difference as disagreement at the shorter length.
    pub fn first_divergence(&self, other: &Trace) -> Option<usize> {
        let mismatch = self.events.iter()
            .zip(other.events.iter())
            .position(|(a, b)| a != b);
        match mismatch {
            Some(i) => Some(i),
            None if self.events.len() != other.events.len() => {
                Some(self.events.len().min(other.events.len()))
            }
            None => None,
        }
    }

    pub fn report(&self) -> TimingReport {
        TimingReport::from_trace(self)
    }
}

// ─── Timing report ──────────────────────────────────────────────────────────

/// Beat timing measured from a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingReport {
    pub beats: usize,
    pub accented_beats: usize,
    pub subdivisions: usize,
    /// Beat intervals that were analysed
    pub intervals: usize,
    /// Mean beat interval in CPU cycles
    pub mean_interval_cycles: f64,
    /// Tempo implied by the mean interval
    pub measured_bpm: f64,
    /// Largest distance of one beat interval from the ideal, in timer counts
    pub max_deviation_counts: f64,
}

impl TimingReport {
    /// Analyse the beats of `trace`.
    ///
    /// Intervals that straddle a tempo change are skipped, since neither
    /// tempo describes them.
    pub fn from_trace(trace: &Trace) -> TimingReport {
        let mut tempo = trace.tempo;
        let mut last_beat: Option<u64> = None;
        let mut report = TimingReport {
            beats: 0,
            accented_beats: 0,
            subdivisions: 0,
            intervals: 0,
            mean_interval_cycles: 0.0,
            measured_bpm: 0.0,
            max_deviation_counts: 0.0,
        };
        let prescale = f64::from(trace.timer_prescale.max(1));
        let mut total: u64 = 0;

        for te in &trace.events {
            match te.event {
                Event::TempoChanged(t) => {
                    tempo = t;
                    last_beat = None;
                }
                Event::Beat { .. } => {
                    report.beats += 1;
                    if te.event.is_accented() {
                        report.accented_beats += 1;
                    }
                    if let Some(prev) = last_beat {
                        let interval = te.tick.saturating_sub(prev);
                        total += interval;
                        report.intervals += 1;
                        let ideal = ideal_beat_counts(tempo);
                        let deviation = (interval as f64 / prescale - ideal).abs();
                        report.max_deviation_counts = report.max_deviation_counts.max(deviation);
                    }
                    last_beat = Some(te.tick);
                }
                Event::Subdivision { .. } => report.subdivisions += 1,
                _ => {}
            }
        }

        if report.intervals > 0 {
            report.mean_interval_cycles = total as f64 / report.intervals as f64;
            report.measured_bpm = 60.0 * f64::from(trace.clock_hz) / report.mean_interval_cycles;
        }
        report
    }
}

/// Exact beat length in timer counts at `tempo`.
pub fn ideal_beat_counts(tempo: u8) -> f64 {
    f64::from(TICKS_PER_BEAT) * f64::from(TOCK_PERIOD_FOR_1_BPM) / f64::from(tempo.max(1))
}

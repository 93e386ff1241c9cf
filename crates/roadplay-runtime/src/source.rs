//! JSON-lines event source
//!
//! Reads one raw record per line, normalizes it and forwards it in file
//! order. Lines that do not parse are logged and skipped; the rest of the
//! stream still flows.

use std::io::BufRead;

use roadplay_core::{Event, RoadplayResult};
use roadplay_state::EventNormalizer;
use tracing::{debug, warn};

use crate::EventSender;

/// Per-run counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub lines: u64,
    pub events: u64,
    pub malformed: u64,
}

#[derive(Clone, Debug, Default)]
pub struct JsonLinesSource {
    normalizer: EventNormalizer,
}

impl JsonLinesSource {
    pub fn new(normalizer: EventNormalizer) -> Self {
        JsonLinesSource { normalizer }
    }

    /// Read every record and hand each event to `sink` in order
    pub fn read_with<B, S>(&self, reader: B, mut sink: S) -> RoadplayResult<SourceStats>
    where
        B: BufRead,
        S: FnMut(Event) -> RoadplayResult<()>,
    {
        let mut stats = SourceStats::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            stats.lines += 1;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            match self.normalizer.event_from_json(text) {
                Ok(event) => {
                    sink(event)?;
                    stats.events += 1;
                }
                Err(e) => {
                    stats.malformed += 1;
                    warn!(line = index + 1, error = %e, "skipping malformed record");
                }
            }
        }
        debug!(lines = stats.lines, events = stats.events, malformed = stats.malformed, "source finished");
        Ok(stats)
    }

    /// Read every record into memory
    pub fn read_all<B: BufRead>(&self, reader: B) -> RoadplayResult<(Vec<Event>, SourceStats)> {
        let mut events = Vec::new();
        let stats = self.read_with(reader, |event| {
            events.push(event);
            Ok(())
        })?;
        Ok((events, stats))
    }

    /// Forward every record into a feed
    pub fn forward<B: BufRead>(&self, reader: B, sender: &EventSender) -> RoadplayResult<SourceStats> {
        self.read_with(reader, |event| sender.send(event))
    }
}

//! # Write Coalescing
//!
//! Edits arrive far faster than a quote store should be written. The
//! [`WriteCoalescer`] holds at most one pending snapshot: each submit
//! replaces it and pushes the deadline back, so a burst of edits becomes a
//! single write of the latest snapshot.
//!
//! Time is passed in by the caller, which keeps the coalescer free of
//! threads and timers:
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use boq_core::persist::{MemorySink, WriteCoalescer};
//! use boq_core::quote::QuoteSnapshot;
//!
//! let mut writer = WriteCoalescer::new(MemorySink::default(), Duration::from_millis(500));
//! let start = Instant::now();
//!
//! writer.submit(QuoteSnapshot::new("v1", "C", "Nairobi"), start);
//! writer.submit(QuoteSnapshot::new("v2", "C", "Nairobi"), start + Duration::from_millis(200));
//!
//! // 500 ms after the first submit, but only 300 ms after the second
//! assert!(!writer.poll(start + Duration::from_millis(500)).unwrap());
//! assert!(writer.poll(start + Duration::from_millis(700)).unwrap());
//!
//! assert_eq!(writer.sink().writes.len(), 1);
//! assert_eq!(writer.sink().writes[0].meta.title, "v2");
//! ```
//!
//! Snapshots are always written whole, so a write is never partial.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::errors::CalcResult;
use crate::quote::QuoteSnapshot;

/// Quiet period before a pending snapshot is written
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Destination for complete quote snapshots.
pub trait QuoteSink {
    fn write(&mut self, snapshot: &QuoteSnapshot) -> CalcResult<()>;
}

/// Sink that keeps every written snapshot in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub writes: Vec<QuoteSnapshot>,
}

impl QuoteSink for MemorySink {
    fn write(&mut self, snapshot: &QuoteSnapshot) -> CalcResult<()> {
        self.writes.push(snapshot.clone());
        Ok(())
    }
}

#[derive(Debug)]
struct Pending {
    snapshot: QuoteSnapshot,
    due: Instant,
}

/// Debounced writer holding at most one pending snapshot.
///
/// Dropping the coalescer discards any pending write.
#[derive(Debug)]
pub struct WriteCoalescer<S: QuoteSink> {
    sink: S,
    delay: Duration,
    pending: Option<Pending>,
}

impl<S: QuoteSink> WriteCoalescer<S> {
    pub fn new(sink: S, delay: Duration) -> Self {
        WriteCoalescer {
            sink,
            delay,
            pending: None,
        }
    }

    /// Replace the pending snapshot and restart the quiet period.
    pub fn submit(&mut self, snapshot: QuoteSnapshot, now: Instant) {
        if self.pending.is_some() {
            debug!("superseding pending quote write");
        }
        self.pending = Some(Pending {
            snapshot,
            due: now + self.delay,
        });
    }

    /// Write the pending snapshot if its quiet period has passed.
    ///
    /// Returns whether a write happened. A failed write stays pending and
    /// is retried on the next poll.
    pub fn poll(&mut self, now: Instant) -> CalcResult<bool> {
        match &self.pending {
            Some(pending) if now >= pending.due => self.flush(),
            _ => Ok(false),
        }
    }

    /// Write the pending snapshot now, if there is one.
    pub fn flush(&mut self) -> CalcResult<bool> {
        let Some(pending) = self.pending.take() else {
            return Ok(false);
        };
        match self.sink.write(&pending.snapshot) {
            Ok(()) => {
                debug!(title = %pending.snapshot.meta.title, "wrote quote snapshot");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "quote write failed; keeping it pending");
                self.pending = Some(pending);
                Err(e)
            }
        }
    }

    /// Drop the pending snapshot without writing it.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending snapshot becomes due
    pub fn due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    pub fn pending(&self) -> Option<&QuoteSnapshot> {
        self.pending.as_ref().map(|p| &p.snapshot)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: QuoteSink> Drop for WriteCoalescer<S> {
    fn drop(&mut self) {
        if let Some(pending) = &self.pending {
            warn!(title = %pending.snapshot.meta.title, "discarding pending quote write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CalcError;

    fn quote(title: &str) -> QuoteSnapshot {
        QuoteSnapshot::new(title, "Client", "Nairobi")
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Fails the first `failures` writes.
    #[derive(Default)]
    struct FlakySink {
        failures: usize,
        writes: Vec<String>,
    }

    impl QuoteSink for FlakySink {
        fn write(&mut self, snapshot: &QuoteSnapshot) -> CalcResult<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(CalcError::file_error("write", "quote.boq", "disk full"));
            }
            self.writes.push(snapshot.meta.title.clone());
            Ok(())
        }
    }

    #[test]
    fn test_burst_collapses_to_one_write() {
        let mut writer = WriteCoalescer::new(MemorySink::default(), ms(500));
        let t0 = Instant::now();
        for (i, title) in ["a", "b", "c"].iter().enumerate() {
            writer.submit(quote(title), t0 + ms(100 * i as u64));
        }
        assert_eq!(writer.due(), Some(t0 + ms(700)));
        assert!(!writer.poll(t0 + ms(699)).unwrap());
        assert!(writer.poll(t0 + ms(700)).unwrap());
        assert!(!writer.is_pending());

        assert_eq!(writer.sink().writes.len(), 1);
        assert_eq!(writer.sink().writes[0].meta.title, "c");
    }

    #[test]
    fn test_flush_writes_immediately() {
        let mut writer = WriteCoalescer::new(MemorySink::default(), DEFAULT_DELAY);
        assert!(!writer.flush().unwrap());
        writer.submit(quote("now"), Instant::now());
        assert!(writer.flush().unwrap());
        assert_eq!(writer.sink().writes.len(), 1);
    }

    #[test]
    fn test_cancel_drops_pending() {
        let mut writer = WriteCoalescer::new(MemorySink::default(), ms(10));
        let t0 = Instant::now();
        writer.submit(quote("draft"), t0);
        assert!(writer.cancel());
        assert!(!writer.cancel());
        assert!(!writer.poll(t0 + ms(100)).unwrap());
        assert!(writer.sink().writes.is_empty());
    }

    #[test]
    fn test_failed_write_stays_pending() {
        let sink = FlakySink {
            failures: 1,
            ..FlakySink::default()
        };
        let mut writer = WriteCoalescer::new(sink, ms(10));
        let t0 = Instant::now();
        writer.submit(quote("retry"), t0);

        assert!(writer.poll(t0 + ms(10)).is_err());
        assert_eq!(writer.pending().map(|q| q.meta.title.as_str()), Some("retry"));

        assert!(writer.poll(t0 + ms(20)).unwrap());
        assert_eq!(writer.sink().writes, vec!["retry".to_string()]);
    }

    #[test]
    fn test_drop_discards_pending() {
        let mut writer = WriteCoalescer::new(MemorySink::default(), ms(10));
        writer.submit(quote("lost"), Instant::now());
        assert!(writer.is_pending());
        drop(writer);
    }
}

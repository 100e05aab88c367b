use crate::event::LogEvent;
use logring::{PanicHook, Ring, RingError};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Error types for collector startup.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The ring's single consumer handle is already taken.
    #[error(transparent)]
    Ring(#[from] RingError),
    /// The collector thread could not be spawned.
    #[error("failed to spawn collector thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Destination for drained log events.
///
/// `emit` receives each batch as the contiguous slices the ring hands out;
/// events must be copied out if they are to be retained.
pub trait Sink: Send {
    fn emit(&mut self, events: &[LogEvent]);

    /// Called once when the collector shuts down.
    fn flush(&mut self) {}
}

/// JSON-lines sink over any writer. Write errors are swallowed: the log
/// pipeline must never take the process down.
pub struct WriteSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> WriteSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> Sink for WriteSink<W> {
    fn emit(&mut self, events: &[LogEvent]) {
        for event in events {
            if serde_json::to_writer(&mut self.out, &event.view()).is_err() {
                continue;
            }
            let _ = self.out.write_all(b"\n");
        }
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

/// Sink collecting into shared memory; intended for tests.
#[derive(Default)]
pub struct VecSink {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the collected events.
    pub fn handle(&self) -> Arc<Mutex<Vec<LogEvent>>> {
        Arc::clone(&self.events)
    }
}

impl Sink for VecSink {
    fn emit(&mut self, events: &[LogEvent]) {
        match self.events.lock() {
            Ok(mut guard) => guard.extend_from_slice(events),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(events),
        }
    }
}

/// Owns the dedicated consumer thread draining an access-log ring into a
/// [`Sink`].
pub struct Collector {
    ring: Ring<LogEvent>,
    thread: Option<JoinHandle<()>>,
}

impl Collector {
    /// Start the consumer thread. Sink panics terminate the thread (and
    /// surface in [`join`](Self::join)); install a hook with
    /// [`spawn_with_panic_hook`](Self::spawn_with_panic_hook) to keep it
    /// alive instead.
    pub fn spawn(
        ring: Ring<LogEvent>,
        sink: impl Sink + 'static,
    ) -> Result<Self, CollectorError> {
        Self::start(ring, sink, None)
    }

    /// Start the consumer thread with a panic hook receiving sink panics.
    pub fn spawn_with_panic_hook(
        ring: Ring<LogEvent>,
        sink: impl Sink + 'static,
        hook: PanicHook,
    ) -> Result<Self, CollectorError> {
        Self::start(ring, sink, Some(hook))
    }

    fn start(
        ring: Ring<LogEvent>,
        mut sink: impl Sink + 'static,
        hook: Option<PanicHook>,
    ) -> Result<Self, CollectorError> {
        let mut consumer = ring.consumer()?;
        if let Some(hook) = hook {
            consumer = consumer.with_panic_hook(hook);
        }
        let thread = thread::Builder::new()
            .name("access-log".into())
            .spawn(move || {
                consumer.run(|batch| sink.emit(batch));
                sink.flush();
            })
            .map_err(CollectorError::Spawn)?;
        Ok(Self {
            ring,
            thread: Some(thread),
        })
    }

    /// The ring this collector drains; hand it to the middleware side.
    pub fn ring(&self) -> &Ring<LogEvent> {
        &self.ring
    }

    /// Close the ring; producers start dropping and the consumer exits
    /// once drained.
    pub fn close(&self) {
        self.ring.close();
    }

    /// Close and wait for the consumer to finish. Returns the consumer
    /// thread's outcome, `Err` when an unhooked sink panic killed it.
    pub fn join(mut self) -> thread::Result<()> {
        self.ring.close();
        match self.thread.take() {
            Some(thread) => thread.join(),
            None => Ok(()),
        }
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.ring.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::InlineStr;
    use logring::Config;

    fn event(status: u16) -> LogEvent {
        LogEvent {
            status,
            method: InlineStr::truncated("GET"),
            path: InlineStr::truncated("/t"),
            ..LogEvent::default()
        }
    }

    #[test]
    fn test_collector_drains_to_sink() {
        let ring = Ring::new(Config::new(4, 8, false));
        let sink = VecSink::new();
        let events = sink.handle();
        let collector = Collector::spawn(ring.clone(), sink).unwrap();

        for i in 0..5 {
            assert!(ring.try_write(event(200 + i)));
        }
        collector.join().unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].status, 200);
        assert_eq!(events[4].status, 204);
    }

    #[test]
    fn test_second_collector_rejected() {
        let ring = Ring::new(Config::new(4, 8, false));
        let _first = Collector::spawn(ring.clone(), VecSink::new()).unwrap();
        assert!(matches!(
            Collector::spawn(ring, VecSink::new()),
            Err(CollectorError::Ring(RingError::ConsumerTaken))
        ));
    }

    #[test]
    fn test_write_sink_emits_json_lines() {
        let mut sink = WriteSink::new(Vec::new());
        sink.emit(&[event(200), event(404)]);

        let text = String::from_utf8(sink.out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"status\":200"));
        assert!(lines[1].contains("\"status\":404"));
    }
}

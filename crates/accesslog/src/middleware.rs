use crate::event::{InlineStr, Level, LogEvent};
use fastroute::{clean_path, strip_port, HandlerRef, Middleware, Params, Request, ResponseWriter};
use logring::Ring;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Build access-log middleware writing one event per request into `ring`.
///
/// The write result is ignored: when the ring is full the event is dropped
/// rather than back-pressuring the request. A handler panic is logged as a
/// `500` (unless the handler managed to set a status first) and then
/// rethrown so outer middleware observes it.
pub fn access_log(ring: Ring<LogEvent>) -> Middleware {
    Arc::new(move |next: HandlerRef| {
        let ring = ring.clone();
        let wrapped = move |w: &mut dyn ResponseWriter,
                            req: &Request<'_>,
                            params: &Params<'_>| {
            let start = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| next.call(w, req, params)));
            let duration = start.elapsed();

            let status = match (w.status(), result.is_err()) {
                (0, true) => 500,
                (0, false) => 200,
                (set, _) => set,
            };

            let event = LogEvent {
                level: if status >= 500 { Level::Error } else { Level::Info },
                timestamp_ns: unix_now_ns(),
                status,
                bytes_written: w.bytes_written() as i64,
                duration_ns: duration.as_nanos() as u64,
                method: InlineStr::truncated(req.method),
                path: InlineStr::truncated(&clean_path(req.path)),
                message: InlineStr::empty(),
                remote_addr: InlineStr::truncated(strip_port(req.remote_addr.unwrap_or(""))),
            };
            // Drop-on-full: losing a log line beats stalling the request.
            ring.try_write(event);

            if let Err(payload) = result {
                resume_unwind(payload);
            }
        };
        Arc::new(wrapped) as HandlerRef
    })
}

fn unix_now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

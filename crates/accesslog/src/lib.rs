//! accesslog - Request Logging for fastroute
//!
//! Access-log middleware that records one fixed-layout event per request
//! into a lock-free [`logring`] ring, and a collector that drains batches
//! on a dedicated thread into a pluggable sink. The request path never
//! blocks on logging: a full ring drops the event.
//!
//! # Example
//!
//! ```
//! use accesslog::{access_log, Collector, LogEvent, VecSink};
//! use fastroute::{Params, Request, ResponseWriter, Router};
//! use fastroute::testing::RecordedResponse;
//! use logring::{Config, Ring};
//!
//! let ring = Ring::<LogEvent>::new(Config::default());
//! let sink = VecSink::new();
//! let events = sink.handle();
//! let collector = Collector::spawn(ring.clone(), sink).unwrap();
//!
//! let router = Router::default();
//! router.use_middleware(access_log(ring)).unwrap();
//! router
//!     .get("/ping", |w: &mut dyn ResponseWriter, _: &Request<'_>, _: &Params<'_>| {
//!         w.set_status(200);
//!         w.write_body(b"pong");
//!     })
//!     .unwrap();
//!
//! let mut w = RecordedResponse::new();
//! router.serve(&mut w, &Request::new("GET", "/ping"));
//!
//! collector.join().unwrap();
//! assert_eq!(events.lock().unwrap().len(), 1);
//! ```

mod collector;
mod event;
mod middleware;

pub use collector::{Collector, CollectorError, Sink, VecSink, WriteSink};
pub use event::{
    InlineStr, Level, LogEvent, LogEventView, MAX_MESSAGE, MAX_METHOD, MAX_PATH, MAX_REMOTE,
};
pub use middleware::access_log;

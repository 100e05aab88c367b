//! fastroute - Segment-Trie HTTP Request Router
//!
//! A request router for latency-sensitive services: registered routes live
//! in a per-method segment trie with a static-path fast map in front, and
//! dispatch runs with zero heap allocation on the hot path. Patterns use
//! `:name` for single-segment captures and `*name` for catch-all tails,
//! with strict static → parameter → wildcard priority and registration-time
//! conflict detection.
//!
//! # Key Features
//!
//! - Static fast-path map plus radix-style trie per method
//! - Canonical path cleaning with 301/308 normalization redirects
//! - Method negotiation: HEAD→GET fallback, OPTIONS synthesis, 405 + `Allow`
//! - Trailing-slash redirection (strict) or transparent equivalence
//! - Host-based virtual routing with default-table fallback
//! - [`Router::freeze`]: an immutable compacted snapshot for lock-free reads
//!
//! # Example
//!
//! ```
//! use fastroute::{Params, Request, ResponseWriter, Router};
//! use fastroute::testing::RecordedResponse;
//!
//! let router = Router::default();
//! router
//!     .get("/users/:id", |w: &mut dyn ResponseWriter, _req: &Request<'_>, params: &Params<'_>| {
//!         w.set_status(200);
//!         w.write_body(params.get("id").unwrap_or("").as_bytes());
//!     })
//!     .unwrap();
//!
//! let mut w = RecordedResponse::new();
//! router.serve(&mut w, &Request::new("GET", "/users/42"));
//! assert_eq!(w.status(), 200);
//! assert_eq!(w.body_str(), "42");
//! ```

mod dispatch;
mod error;
mod frozen;
mod handler;
mod host;
mod params;
mod path;
mod router;
mod segment;
mod table;
mod trie;

pub mod testing;

pub use error::RouteError;
pub use frozen::FrozenRouter;
pub use handler::{
    Handler, HandlerRef, Middleware, PanicHandler, Request, RequestIdFn, ResponseWriter,
};
pub use host::strip_port;
pub use params::Params;
pub use path::clean_path;
pub use router::{
    RouteGroup, Router, RouterConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PATH_LENGTH,
};

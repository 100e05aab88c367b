use crate::handler::{HandlerRef, Request, ResponseWriter};
use crate::host;
use crate::params::Params;
use crate::path;
use crate::router::RouterConfig;
use crate::segment::{self, PathSegments};
use crate::table::{allow_header, MethodSet, PathLookup};
use crate::trie::RouteEntry;
use std::borrow::Cow;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// The route tables a dispatch pass reads: the mutable router hands these
/// in under its read lock, the frozen router from its immutable fields.
pub(crate) struct TableView<'a, N> {
    pub default_set: &'a MethodSet<N>,
    pub hosts: &'a HashMap<Box<str>, MethodSet<N>>,
}

/// Run one request through the dispatch state machine.
pub(crate) fn serve<N: PathLookup>(
    tables: &TableView<'_, N>,
    config: &RouterConfig,
    w: &mut dyn ResponseWriter,
    req: &Request<'_>,
) {
    if req.path.len() > config.max_path_length {
        w.set_status(414);
        w.write_body(b"URI Too Long");
        return;
    }

    // The segment record is pooled per thread. It is returned on every
    // normal exit; a panic unwinding past this frame discards it instead,
    // so the pool never sees possibly torn state.
    let mut seg = segment::acquire();
    serve_preprocessed(tables, config, w, req, &mut seg);
    segment::release(seg);
}

fn serve_preprocessed<N: PathLookup>(
    tables: &TableView<'_, N>,
    config: &RouterConfig,
    w: &mut dyn ResponseWriter,
    req: &Request<'_>,
    seg: &mut PathSegments,
) {
    // Branch choice: a valid encoded path short-circuits cleaning and
    // normalization redirects so escapes stay opaque to matching.
    let raw = config
        .use_raw_path
        .then(|| req.raw_path)
        .flatten()
        .filter(|raw| path::valid_raw_path(raw, req.path));

    let capture: Cow<'_, str> = match raw {
        Some(raw) => Cow::Borrowed(raw),
        None => {
            let cleaned = path::clean_path(req.path);
            if cleaned.len() > config.max_path_length {
                w.set_status(414);
                w.write_body(b"URI Too Long");
                return;
            }
            if cleaned != req.path {
                redirect(w, req.method, &cleaned);
                return;
            }
            cleaned
        }
    };

    if seg.parse(&capture, config.ignore_case).is_err() {
        // NUL/CR/LF can never match a registered pattern.
        not_found(config, w, req);
        return;
    }

    if !tables.hosts.is_empty() {
        if let Some(host) = req.host {
            let key = host::normalize_host(host);
            if let Some(set) = tables.hosts.get(key.as_ref()) {
                if attempt(set, config, w, req, seg) {
                    return;
                }
            }
        }
    }

    if attempt(tables.default_set, config, w, req, seg) {
        return;
    }

    not_found(config, w, req);
}

/// One table's three-step attempt; true when the response was completed.
/// A method-not-allowed signal counts as completion and never falls
/// through to the next table.
fn attempt<N: PathLookup>(
    set: &MethodSet<N>,
    config: &RouterConfig,
    w: &mut dyn ResponseWriter,
    req: &Request<'_>,
    seg: &PathSegments,
) -> bool {
    try_serve(set, config, w, req, seg)
        || try_alternate_slash(set, config, w, req, seg)
        || try_method_not_allowed(set, config, w, req, seg)
}

/// Direct match attempt. HEAD falls back to GET when no explicit HEAD
/// route exists; the host's writer is expected to discard HEAD bodies.
fn try_serve<N: PathLookup>(
    set: &MethodSet<N>,
    config: &RouterConfig,
    w: &mut dyn ResponseWriter,
    req: &Request<'_>,
    seg: &PathSegments,
) -> bool {
    if req.method == "HEAD" {
        if invoke_method(set, "HEAD", config, w, req, seg) {
            return true;
        }
        return invoke_method(set, "GET", config, w, req, seg);
    }
    invoke_method(set, req.method, config, w, req, seg)
}

fn invoke_method<N: PathLookup>(
    set: &MethodSet<N>,
    method: &str,
    config: &RouterConfig,
    w: &mut dyn ResponseWriter,
    req: &Request<'_>,
    seg: &PathSegments,
) -> bool {
    let Some(table) = set.table(method) else {
        return false;
    };
    let mut params = Params::new();
    match table.find(seg, Some(&mut params), config.max_depth) {
        Some(entry) => {
            invoke_entry(config, entry, w, req, &params);
            true
        }
        None => false,
    }
}

fn invoke_entry(
    config: &RouterConfig,
    entry: &RouteEntry,
    w: &mut dyn ResponseWriter,
    req: &Request<'_>,
    params: &Params<'_>,
) {
    invoke_handler(config, &entry.handler, w, req, params);
}

/// Run a handler inside the panic scope. With a `PanicHandler` configured
/// the panic value is forwarded; otherwise it propagates to the host.
fn invoke_handler(
    config: &RouterConfig,
    handler: &HandlerRef,
    w: &mut dyn ResponseWriter,
    req: &Request<'_>,
    params: &Params<'_>,
) {
    if let Some(panic_handler) = &config.panic_handler {
        let result = catch_unwind(AssertUnwindSafe(|| handler.call(w, req, params)));
        if let Err(payload) = result {
            panic_handler(w, req, payload);
        }
    } else {
        handler.call(w, req, params);
    }
}

/// Trailing-slash alternation: redirect to the registered form under
/// strict-slash, serve the alternate form transparently otherwise.
fn try_alternate_slash<N: PathLookup>(
    set: &MethodSet<N>,
    config: &RouterConfig,
    w: &mut dyn ResponseWriter,
    req: &Request<'_>,
    seg: &PathSegments,
) -> bool {
    let match_path = seg.match_path();
    if match_path == "/" {
        return false;
    }
    // Fast-skip: nothing registered with a trailing slash can make the
    // slash-appended form match.
    if !match_path.ends_with('/') && !set.has_trailing_slash_routes {
        return false;
    }

    // The alternate form of the capture path, so redirects preserve the
    // request's case and encoding.
    let alternate = path::toggle_slash(seg.capture_path());
    let mut alt_seg = segment::acquire();
    let served = match alt_seg.parse(&alternate, config.ignore_case) {
        Err(_) => false,
        Ok(()) => {
            if config.strict_slash {
                if allow_header(set, &alt_seg, config.max_depth).is_some() {
                    redirect(w, req.method, &alternate);
                    true
                } else {
                    false
                }
            } else {
                try_serve(set, config, w, req, &alt_seg)
            }
        }
    };
    segment::release(alt_seg);
    served
}

/// 405 with `Allow` when other methods match the path; OPTIONS synthesizes
/// a 200 with the same header (and bypasses the override).
fn try_method_not_allowed<N: PathLookup>(
    set: &MethodSet<N>,
    config: &RouterConfig,
    w: &mut dyn ResponseWriter,
    req: &Request<'_>,
    seg: &PathSegments,
) -> bool {
    let mut allow = allow_header(set, seg, config.max_depth);

    if allow.is_none() && !config.strict_slash && seg.match_path() != "/" {
        // Transparent-slash mode treats both forms as one location for the
        // allow computation too.
        let alternate = path::toggle_slash(seg.capture_path());
        let mut alt_seg = segment::acquire();
        if alt_seg.parse(&alternate, config.ignore_case).is_ok() {
            allow = allow_header(set, &alt_seg, config.max_depth);
        }
        segment::release(alt_seg);
    }

    let Some(allow) = allow else {
        return false;
    };

    w.insert_header("Allow", &allow);
    if req.method == "OPTIONS" {
        w.set_status(200);
        return true;
    }
    if let Some(override_handler) = &config.method_not_allowed {
        invoke_handler(config, override_handler, w, req, &Params::new());
    } else {
        w.set_status(405);
        w.write_body(b"Method Not Allowed");
    }
    true
}

fn not_found(config: &RouterConfig, w: &mut dyn ResponseWriter, req: &Request<'_>) {
    if let Some(handler) = &config.not_found {
        invoke_handler(config, handler, w, req, &Params::new());
    } else {
        w.set_status(404);
        w.write_body(b"Not Found");
    }
}

/// Permanent redirect: 301 for safe methods, 308 otherwise so the method
/// and body survive.
fn redirect(w: &mut dyn ResponseWriter, method: &str, location: &str) {
    let status = if method == "GET" || method == "HEAD" {
        301
    } else {
        308
    };
    w.insert_header("Location", location);
    w.set_status(status);
}

use thiserror::Error;

/// Error types for route and middleware registration.
///
/// Registration failures are local to the call: the route tables are never
/// partially mutated, so a caller can report the error and keep serving.
/// Dispatch-time failures are HTTP status codes, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Method is empty or contains bytes outside the visible ASCII token range.
    #[error("invalid method token {0:?}")]
    InvalidMethod(String),
    /// Pattern differs from its canonical (cleaned) form.
    #[error("pattern {found:?} is not canonical, expected {expected:?}")]
    NonCanonicalPattern {
        /// The pattern as registered.
        found: String,
        /// The cleaned form the caller should register instead.
        expected: String,
    },
    /// Pattern exceeds the maximum path length.
    #[error("pattern exceeds the maximum length of {max} bytes")]
    PatternTooLong {
        /// The configured limit.
        max: usize,
    },
    /// Pattern or path contains NUL, CR or LF.
    #[error("path contains NUL, CR or LF")]
    InvalidPath,
    /// Pattern has more segments than the depth limit allows.
    #[error("pattern exceeds the maximum depth of {max} segments")]
    RouteTooDeep {
        /// The configured limit.
        max: usize,
    },
    /// A `:` or `*` segment has no name.
    #[error("segment {segment:?} is missing a parameter name")]
    MissingParamName {
        /// The offending segment.
        segment: String,
    },
    /// A catch-all segment appears before the end of the pattern.
    #[error("catch-all segment {segment:?} must be the last segment")]
    WildcardNotLast {
        /// The offending segment.
        segment: String,
    },
    /// The same parameter name is captured twice along one pattern.
    #[error("parameter name {name:?} appears twice in one pattern")]
    DuplicateParamName {
        /// The repeated name.
        name: String,
    },
    /// A dynamic segment at this level is already registered under another name.
    #[error("parameter {new:?} conflicts with existing {existing:?} at the same level")]
    ParamNameConflict {
        /// The name being inserted.
        new: String,
        /// The name already present.
        existing: String,
    },
    /// A parameter and a catch-all cannot share a level.
    #[error("parameter and catch-all segments conflict at the same level")]
    ParamWildcardConflict,
    /// The method/pattern pair is already registered.
    #[error("route already registered for this method and pattern")]
    DuplicateRoute,
    /// Middleware must be registered before the first route.
    #[error("middleware must be registered before any route")]
    MiddlewareAfterRoutes,
}

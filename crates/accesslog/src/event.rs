use serde::Serialize;

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Level {
    #[default]
    Info = 0,
    Warn = 1,
    Error = 2,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Fixed-capacity inline string. Overlong input truncates at a character
/// boundary; the ring buffer copies events by value, so text must not own
/// heap data.
#[derive(Clone, Copy)]
pub struct InlineStr<const N: usize> {
    len: u16,
    bytes: [u8; N],
}

impl<const N: usize> InlineStr<N> {
    pub const fn empty() -> Self {
        Self {
            len: 0,
            bytes: [0; N],
        }
    }

    /// Copy `s`, truncating to the capacity at a char boundary.
    pub fn truncated(s: &str) -> Self {
        let mut end = s.len().min(N);
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; N];
        bytes[..end].copy_from_slice(&s.as_bytes()[..end]);
        Self {
            len: end as u16,
            bytes,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for InlineStr<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const N: usize> std::fmt::Debug for InlineStr<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Inline capacity for the method token.
pub const MAX_METHOD: usize = 16;
/// Inline capacity for the request path.
pub const MAX_PATH: usize = 256;
/// Inline capacity for the optional message.
pub const MAX_MESSAGE: usize = 64;
/// Inline capacity for the client address.
pub const MAX_REMOTE: usize = 48;

/// One access-log record.
///
/// Fixed layout and `Copy`: producers value-copy it into a ring slot and
/// the consumer copies it back out, so no slot ever owns an allocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEvent {
    pub level: Level,
    /// UNIX timestamp, nanoseconds.
    pub timestamp_ns: u64,
    pub status: u16,
    /// Response body bytes written.
    pub bytes_written: i64,
    /// Handler wall time, nanoseconds.
    pub duration_ns: u64,
    pub method: InlineStr<MAX_METHOD>,
    pub path: InlineStr<MAX_PATH>,
    pub message: InlineStr<MAX_MESSAGE>,
    /// Client address, port stripped.
    pub remote_addr: InlineStr<MAX_REMOTE>,
}

impl LogEvent {
    /// Borrowed serde view used by JSON sinks.
    pub fn view(&self) -> LogEventView<'_> {
        LogEventView {
            level: self.level.as_str(),
            ts_ns: self.timestamp_ns,
            method: self.method.as_str(),
            path: self.path.as_str(),
            status: self.status,
            bytes: self.bytes_written,
            duration_ns: self.duration_ns,
            remote: self.remote_addr.as_str(),
            message: (!self.message.is_empty()).then(|| self.message.as_str()),
        }
    }
}

/// Serialization view over a [`LogEvent`]; field order is the wire order.
#[derive(Debug, Serialize)]
pub struct LogEventView<'a> {
    pub level: &'a str,
    pub ts_ns: u64,
    pub method: &'a str,
    pub path: &'a str,
    pub status: u16,
    pub bytes: i64,
    pub duration_ns: u64,
    pub remote: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_str_truncates_at_char_boundary() {
        let s = InlineStr::<4>::truncated("abcdef");
        assert_eq!(s.as_str(), "abcd");

        // "é" is two bytes; a mid-char cut backs off.
        let s = InlineStr::<3>::truncated("aéb");
        assert_eq!(s.as_str(), "aé");
    }

    #[test]
    fn test_event_view_serializes() {
        let mut event = LogEvent::default();
        event.status = 200;
        event.method = InlineStr::truncated("GET");
        event.path = InlineStr::truncated("/x");
        event.bytes_written = 5;

        let json = serde_json::to_string(&event.view()).unwrap();
        assert!(json.contains("\"method\":\"GET\""));
        assert!(json.contains("\"status\":200"));
        // Empty message is omitted entirely.
        assert!(!json.contains("message"));
    }
}

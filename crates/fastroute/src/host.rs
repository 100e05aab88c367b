use std::borrow::Cow;

/// Normalize a Host header value for table lookup: trim, strip a
/// syntactically valid trailing port, ASCII-lowercase. Borrows when no
/// lowercasing is needed.
pub(crate) fn normalize_host(raw: &str) -> Cow<'_, str> {
    let stripped = strip_port(raw.trim());
    if stripped.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(stripped.to_ascii_lowercase())
    } else {
        Cow::Borrowed(stripped)
    }
}

/// Strip a trailing `:port` when it is syntactically valid.
///
/// `[::1]:8080` keeps its brackets; a bare IPv6 literal is ambiguous and is
/// returned unchanged, as is any host whose port part is not all digits.
pub fn strip_port(host: &str) -> &str {
    let Some(idx) = host.rfind(':') else {
        return host;
    };
    let port = &host[idx + 1..];
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return host;
    }
    let name = &host[..idx];
    if name.starts_with('[') {
        // Bracketed IPv6: the colon is a separator only right after ']'.
        if name.ends_with(']') {
            return name;
        }
        return host;
    }
    if name.contains(':') {
        // Unbracketed IPv6 literal; no way to tell address from port.
        return host;
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("example.com:"), "example.com:");
        assert_eq!(strip_port("example.com:abc"), "example.com:abc");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
        assert_eq!(strip_port("::1"), "::1");
        assert_eq!(strip_port("127.0.0.1:80"), "127.0.0.1");
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host(" Example.COM:443 "), "example.com");
        assert_eq!(normalize_host("api.internal"), "api.internal");
        assert!(matches!(normalize_host("plain.host"), Cow::Borrowed(_)));
    }
}

use percent_encoding::percent_decode_str;
use std::borrow::Cow;

/// Canonicalize a path: prepend `/`, collapse `/` runs, resolve `.` and
/// `..` per POSIX rules, preserving a trailing slash. Borrows the input
/// when it is already canonical, which is the hot case at dispatch time.
pub fn clean_path(p: &str) -> Cow<'_, str> {
    if p.is_empty() {
        return Cow::Borrowed("/");
    }
    if is_clean(p) {
        return Cow::Borrowed(p);
    }

    let bytes = p.as_bytes();
    let n = bytes.len();
    let trailing = n > 1 && bytes[n - 1] == b'/';

    let mut out = String::with_capacity(n + 1);
    out.push('/');

    let mut r = usize::from(bytes[0] == b'/');
    while r < n {
        if bytes[r] == b'/' {
            r += 1;
        } else if bytes[r] == b'.' && (r + 1 == n || bytes[r + 1] == b'/') {
            // "." element: skip
            r += 1;
        } else if bytes[r] == b'.'
            && bytes[r + 1] == b'.'
            && (r + 2 == n || bytes[r + 2] == b'/')
        {
            // ".." element: drop the last emitted segment
            r += 2;
            if let Some(idx) = out.rfind('/') {
                out.truncate(idx.max(1));
            }
        } else {
            if !out.ends_with('/') {
                out.push('/');
            }
            let start = r;
            while r < n && bytes[r] != b'/' {
                r += 1;
            }
            out.push_str(&p[start..r]);
        }
    }

    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    Cow::Owned(out)
}

/// True when `p` starts with `/` and contains no empty, `.` or `..`
/// segments.
fn is_clean(p: &str) -> bool {
    let bytes = p.as_bytes();
    if bytes[0] != b'/' {
        return false;
    }
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'/' {
            return false; // "//"
        }
        let start = i;
        while i < bytes.len() && bytes[i] != b'/' {
            i += 1;
        }
        let seg = &bytes[start..i];
        if seg == b"." || seg == b".." {
            return false;
        }
        i += 1;
    }
    true
}

/// Whether `raw` is a well-formed percent-encoding of `decoded`.
///
/// Mirrors origin-server semantics: the encoded path is trusted only when
/// every escape is syntactically valid and the decoded bytes equal the
/// host-decoded path. `%2F` stays opaque on this branch, which is the whole
/// point of raw-path matching.
pub(crate) fn valid_raw_path(raw: &str, decoded: &str) -> bool {
    if raw.is_empty() || !escapes_well_formed(raw) {
        return false;
    }
    match percent_decode_str(raw).decode_utf8() {
        Ok(d) => d == decoded,
        Err(_) => false,
    }
}

fn escapes_well_formed(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Toggle the trailing slash: `/p` ↔ `/p/`. The caller excludes the root.
pub(crate) fn toggle_slash(p: &str) -> String {
    if let Some(stripped) = p.strip_suffix('/') {
        stripped.to_owned()
    } else {
        let mut out = String::with_capacity(p.len() + 1);
        out.push_str(p);
        out.push('/');
        out
    }
}

use crate::error::RouteError;
use std::cell::RefCell;

/// Reusable record of a path split into segments.
///
/// Holds the capture path (original bytes, used for parameter values), the
/// match path (ASCII-lowercased when case-insensitive matching is on,
/// byte-identical otherwise), per-segment start offsets and lengths, and a
/// trailing sentinel offset equal to the path length. Lowercasing is
/// ASCII-only, so one offset vector describes both views.
///
/// Records are recycled through a thread-local pool; parsing reuses the
/// buffers instead of allocating.
#[derive(Debug, Default)]
pub(crate) struct PathSegments {
    path: String,
    match_path: String,
    offsets: Vec<u32>,
    lens: Vec<u32>,
}

impl PathSegments {
    /// Scan `path` left to right, recording non-empty segments between `/`.
    ///
    /// Fails on NUL, CR or LF. Cost is O(n) with no allocation beyond the
    /// record's reused buffers.
    pub fn parse(&mut self, path: &str, lowercase: bool) -> Result<(), RouteError> {
        self.path.clear();
        self.match_path.clear();
        self.offsets.clear();
        self.lens.clear();

        let bytes = path.as_bytes();
        let mut start: Option<usize> = None;
        for (i, &b) in bytes.iter().enumerate() {
            if matches!(b, 0 | b'\r' | b'\n') {
                return Err(RouteError::InvalidPath);
            }
            if b == b'/' {
                if let Some(s) = start.take() {
                    self.offsets.push(s as u32);
                    self.lens.push((i - s) as u32);
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            self.offsets.push(s as u32);
            self.lens.push((bytes.len() - s) as u32);
        }
        // Sentinel: lets catch-all slicing run off the last segment without
        // a bounds check.
        self.offsets.push(path.len() as u32);

        self.path.push_str(path);
        self.match_path.push_str(path);
        if lowercase {
            // ASCII-only fold, in place: byte length and positions stay
            // identical to the capture path, so one offset vector serves
            // both views.
            self.match_path.make_ascii_lowercase();
        }

        self.debug_check();
        Ok(())
    }

    /// Number of segments (the offset vector holds one more, the sentinel).
    #[inline]
    pub fn seg_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Segment `i` of the match path.
    #[inline]
    pub fn match_seg(&self, i: usize) -> &str {
        let start = self.offsets[i] as usize;
        &self.match_path[start..start + self.lens[i] as usize]
    }

    /// Segment `i` of the capture path (original case and encoding).
    #[inline]
    pub fn capture_seg(&self, i: usize) -> &str {
        let start = self.offsets[i] as usize;
        &self.path[start..start + self.lens[i] as usize]
    }

    /// Remainder of the capture path from segment `i` to the end, as a
    /// catch-all value. `i == seg_count()` slices from the sentinel and
    /// yields the empty string.
    #[inline]
    pub fn tail_from(&self, i: usize) -> &str {
        let mut start = self.offsets[i] as usize;
        if self.path.as_bytes().get(start) == Some(&b'/') {
            start += 1;
        }
        &self.path[start..]
    }

    /// Match-path byte range covering segments `from..=to` including the
    /// `/` separators between them; used for frozen span comparison.
    #[inline]
    pub fn match_range(&self, from: usize, to: usize) -> &str {
        let start = self.offsets[from] as usize;
        let end = self.offsets[to] as usize + self.lens[to] as usize;
        &self.match_path[start..end]
    }

    /// The normalized path matched against registered patterns.
    #[inline]
    pub fn match_path(&self) -> &str {
        &self.match_path
    }

    /// The original path parameter values are sliced from.
    #[inline]
    pub fn capture_path(&self) -> &str {
        &self.path
    }

    #[cfg(debug_assertions)]
    fn debug_check(&self) {
        debug_assert_eq!(self.offsets.len(), self.lens.len() + 1);
        debug_assert_eq!(*self.offsets.last().unwrap() as usize, self.path.len());
        for w in self.offsets.windows(2) {
            debug_assert!(w[0] < w[1], "offsets not strictly increasing");
        }
        for i in 0..self.lens.len() {
            let start = self.offsets[i] as usize;
            let end = start + self.lens[i] as usize;
            debug_assert_eq!(&self.path[start..end], self.capture_seg(i));
            debug_assert!(!self.capture_seg(i).is_empty());
        }
    }

    #[cfg(not(debug_assertions))]
    fn debug_check(&self) {}
}

// Per-thread recycling keeps dispatch allocation-free after warmup. A
// record in use is moved out of the pool, so a panic unwinding through
// dispatch simply drops it instead of returning possibly torn buffers.
const POOL_LIMIT: usize = 8;

thread_local! {
    static SEGMENT_POOL: RefCell<Vec<PathSegments>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn acquire() -> PathSegments {
    SEGMENT_POOL
        .with(|pool| pool.borrow_mut().pop())
        .unwrap_or_default()
}

pub(crate) fn release(record: PathSegments) {
    SEGMENT_POOL.with(|pool| {
        let mut pool = pool.borrow_mut();
        if pool.len() < POOL_LIMIT {
            pool.push(record);
        }
    });
}

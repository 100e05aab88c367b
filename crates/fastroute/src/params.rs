use smallvec::SmallVec;

/// Inline capacity; deeper capture chains spill to the heap.
const INLINE_PARAMS: usize = 6;

/// Ordered key/value store for captured path parameters.
///
/// Keys borrow from the registered pattern, values from the request's
/// capture path, so pushing never copies string data. Lookups are a linear
/// scan; parameter counts are tiny.
#[derive(Debug, Default)]
pub struct Params<'a> {
    entries: SmallVec<[(&'a str, &'a str); INLINE_PARAMS]>,
}

impl<'a> Params<'a> {
    /// Creates an empty store. No heap allocation until the inline
    /// capacity overflows.
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    /// Append a captured parameter.
    #[inline]
    pub(crate) fn push(&mut self, key: &'a str, value: &'a str) {
        self.entries.push((key, value));
    }

    /// Value captured under `key`, if any. First match wins.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// Number of captured parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate captures in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.entries.iter().copied()
    }

    /// Drop captures past `len`; used to backtrack a failed sub-lookup.
    #[inline]
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Clear all captures, keeping capacity.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

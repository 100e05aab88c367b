use crate::params::Params;
use crate::segment::PathSegments;
use crate::trie::RouteEntry;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::HashMap;

/// The seven standard methods, in canonical `Allow` order.
pub(crate) const STANDARD_METHODS: [&str; 7] =
    ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

pub(crate) const GET_INDEX: usize = 0;
pub(crate) const HEAD_INDEX: usize = 1;
pub(crate) const OPTIONS_INDEX: usize = 6;

pub(crate) fn standard_method_index(method: &str) -> Option<usize> {
    STANDARD_METHODS.iter().position(|m| *m == method)
}

/// The seam shared by the mutable trie and its frozen counterpart: both
/// answer segment lookups with the same semantics, so the dispatch state
/// machine is written once against this trait.
pub(crate) trait PathLookup {
    fn find<'a>(
        &'a self,
        seg: &'a PathSegments,
        params: Option<&mut Params<'a>>,
        max_depth: usize,
    ) -> Option<&'a RouteEntry>;
}

/// Route storage for a single method.
pub(crate) struct RouteTable<N> {
    /// Parametric trie root.
    pub root: N,
    /// Zero-traversal fast path: fully static pattern (match form) to entry.
    pub static_routes: HashMap<Box<str>, RouteEntry>,
    /// Whether the trie holds anything; lets static-only methods skip it.
    pub has_param_routes: bool,
}

impl<N: Default> Default for RouteTable<N> {
    fn default() -> Self {
        Self {
            root: N::default(),
            static_routes: HashMap::new(),
            has_param_routes: false,
        }
    }
}

impl<N: PathLookup> RouteTable<N> {
    /// Static map by exact match path first; the trie only when this
    /// method has parametric routes.
    pub fn find<'a>(
        &'a self,
        seg: &'a PathSegments,
        params: Option<&mut Params<'a>>,
        max_depth: usize,
    ) -> Option<&'a RouteEntry> {
        if let Some(entry) = self.static_routes.get(seg.match_path()) {
            return Some(entry);
        }
        if !self.has_param_routes {
            return None;
        }
        self.root.find(seg, params, max_depth)
    }

    /// Match test without parameter capture, for `Allow` computation.
    fn matches(&self, seg: &PathSegments, max_depth: usize) -> bool {
        if self.static_routes.contains_key(seg.match_path()) {
            return true;
        }
        self.has_param_routes && self.root.find(seg, None, max_depth).is_some()
    }
}

/// All route tables for one virtual host (or the default host).
pub(crate) struct MethodSet<N> {
    /// Standard-method tables in canonical order.
    pub standard: [Option<RouteTable<N>>; 7],
    /// Custom-method tables, sorted by method token.
    pub custom: Vec<(Box<str>, RouteTable<N>)>,
    /// Any registered pattern ends with a trailing slash; gates the
    /// trailing-slash alternation fast-skip.
    pub has_trailing_slash_routes: bool,
    /// Any method has parametric routes; gates the static Allow cache.
    pub any_param_routes: bool,
    /// Precomputed Allow header strings for purely static locations,
    /// keyed by match path.
    pub static_allow: HashMap<Box<str>, Box<str>>,
}

impl<N> Default for MethodSet<N> {
    fn default() -> Self {
        Self {
            standard: Default::default(),
            custom: Vec::new(),
            has_trailing_slash_routes: false,
            any_param_routes: false,
            static_allow: HashMap::new(),
        }
    }
}

impl<N> MethodSet<N> {
    pub fn table(&self, method: &str) -> Option<&RouteTable<N>> {
        if let Some(i) = standard_method_index(method) {
            return self.standard[i].as_ref();
        }
        self.custom
            .binary_search_by(|(m, _)| m.as_ref().cmp(method))
            .ok()
            .map(|i| &self.custom[i].1)
    }
}

impl<N: Default> MethodSet<N> {
    /// Table for `method`, created on first use. Custom methods stay
    /// sorted so lookup can binary-search.
    pub fn table_mut(&mut self, method: &str) -> &mut RouteTable<N> {
        if let Some(i) = standard_method_index(method) {
            return self.standard[i].get_or_insert_with(RouteTable::default);
        }
        match self.custom.binary_search_by(|(m, _)| m.as_ref().cmp(method)) {
            Ok(i) => &mut self.custom[i].1,
            Err(i) => {
                self.custom.insert(i, (method.into(), RouteTable::default()));
                &mut self.custom[i].1
            }
        }
    }
}

/// Methods matching a path: a bitmask over the seven standard methods plus
/// custom tokens. The header renders in canonical order, HEAD implied by
/// GET, OPTIONS always present.
#[derive(Default)]
pub(crate) struct AllowSet<'a> {
    mask: u8,
    custom: SmallVec<[&'a str; 2]>,
}

impl<'a> AllowSet<'a> {
    pub fn insert_standard(&mut self, index: usize) {
        self.mask |= 1 << index;
    }

    pub fn insert_custom(&mut self, method: &'a str) {
        self.custom.push(method);
    }

    /// Empty before the implicit HEAD/OPTIONS additions.
    pub fn is_empty(&self) -> bool {
        self.mask == 0 && self.custom.is_empty()
    }

    pub fn header(&self) -> String {
        let mut mask = self.mask;
        if mask & (1 << GET_INDEX) != 0 {
            mask |= 1 << HEAD_INDEX;
        }
        mask |= 1 << OPTIONS_INDEX;

        let mut out = String::new();
        for (i, name) in STANDARD_METHODS.iter().enumerate() {
            if mask & (1 << i) != 0 {
                if !out.is_empty() {
                    out.push_str(", ");
                }
                out.push_str(name);
            }
        }
        let mut custom: SmallVec<[&str; 2]> = self.custom.clone();
        custom.sort_unstable();
        for name in custom {
            out.push_str(", ");
            out.push_str(name);
        }
        out
    }
}

/// Collect every method whose table matches `seg`.
pub(crate) fn allowed_methods<'a, N: PathLookup>(
    set: &'a MethodSet<N>,
    seg: &PathSegments,
    max_depth: usize,
) -> AllowSet<'a> {
    let mut allow = AllowSet::default();
    for (i, table) in set.standard.iter().enumerate() {
        if let Some(table) = table {
            if table.matches(seg, max_depth) {
                allow.insert_standard(i);
            }
        }
    }
    for (method, table) in &set.custom {
        if table.matches(seg, max_depth) {
            allow.insert_custom(method);
        }
    }
    allow
}

/// `Allow` header for `seg`, or `None` when no method matches.
///
/// Purely static sets read the header precomputed at registration time.
pub(crate) fn allow_header<'a, N: PathLookup>(
    set: &'a MethodSet<N>,
    seg: &PathSegments,
    max_depth: usize,
) -> Option<Cow<'a, str>> {
    if !set.any_param_routes {
        return set
            .static_allow
            .get(seg.match_path())
            .map(|s| Cow::Borrowed(&**s));
    }
    let allow = allowed_methods(set, seg, max_depth);
    if allow.is_empty() {
        None
    } else {
        Some(Cow::Owned(allow.header()))
    }
}

/// Recompute the cached Allow string for one static location. Called after
/// every static registration so the cache never goes stale.
pub(crate) fn refresh_static_allow<N>(set: &mut MethodSet<N>, match_pattern: &str) {
    let mut allow = AllowSet::default();
    for (i, table) in set.standard.iter().enumerate() {
        if let Some(table) = table {
            if table.static_routes.contains_key(match_pattern) {
                allow.insert_standard(i);
            }
        }
    }
    for (method, table) in &set.custom {
        if table.static_routes.contains_key(match_pattern) {
            allow.insert_custom(method);
        }
    }
    if !allow.is_empty() {
        set.static_allow
            .insert(match_pattern.into(), allow.header().into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_header_order() {
        let mut allow = AllowSet::default();
        allow.insert_standard(standard_method_index("POST").unwrap());
        allow.insert_standard(standard_method_index("GET").unwrap());
        allow.insert_custom("PURGE");
        allow.insert_custom("LOCK");

        // Canonical standard order, HEAD implied by GET, OPTIONS appended,
        // customs sorted last.
        assert_eq!(allow.header(), "GET, HEAD, POST, OPTIONS, LOCK, PURGE");
    }

    #[test]
    fn test_allow_without_get_has_no_head() {
        let mut allow = AllowSet::default();
        allow.insert_standard(standard_method_index("DELETE").unwrap());
        assert_eq!(allow.header(), "DELETE, OPTIONS");
    }

    #[test]
    fn test_custom_methods_sorted_in_set() {
        let mut set: MethodSet<crate::trie::TrieNode> = MethodSet::default();
        set.table_mut("PURGE");
        set.table_mut("LOCK");
        set.table_mut("GET");

        assert!(set.table("PURGE").is_some());
        assert!(set.table("LOCK").is_some());
        assert!(set.table("GET").is_some());
        assert!(set.table("BREW").is_none());
        let names: Vec<_> = set.custom.iter().map(|(m, _)| m.as_ref()).collect();
        assert_eq!(names, ["LOCK", "PURGE"]);
    }
}

use crate::error::RouteError;
use crate::handler::HandlerRef;
use crate::params::Params;
use crate::segment::PathSegments;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Handler attached to a leaf, with the metadata recorded at registration.
#[derive(Clone)]
pub(crate) struct RouteEntry {
    pub handler: HandlerRef,
    /// Full registered pattern, as cleaned at registration.
    pub pattern: Arc<str>,
    /// Whether the pattern captures any parameters.
    pub has_params: bool,
}

/// Static fan-out stays inline up to this many children.
const STATIC_CHILD_INLINE: usize = 4;

/// Static children keyed by literal segment: a small vector for tiny
/// fan-out, upgraded to a hash map beyond it.
pub(crate) enum StaticChildren {
    Few(SmallVec<[(Box<str>, Box<TrieNode>); STATIC_CHILD_INLINE]>),
    Many(HashMap<Box<str>, Box<TrieNode>>),
}

impl StaticChildren {
    fn new() -> Self {
        Self::Few(SmallVec::new())
    }

    pub fn get(&self, seg: &str) -> Option<&TrieNode> {
        match self {
            Self::Few(v) => v.iter().find(|(k, _)| &**k == seg).map(|(_, n)| n.as_ref()),
            Self::Many(m) => m.get(seg).map(Box::as_ref),
        }
    }

    fn get_or_insert(&mut self, seg: &str) -> &mut TrieNode {
        if let Self::Few(v) = self {
            let exists = v.iter().any(|(k, _)| &**k == seg);
            if !exists {
                if v.len() < STATIC_CHILD_INLINE {
                    v.push((seg.into(), Box::new(TrieNode::new(seg))));
                } else {
                    let mut map: HashMap<Box<str>, Box<TrieNode>> =
                        HashMap::with_capacity(v.len() + 1);
                    for (k, n) in v.drain(..) {
                        map.insert(k, n);
                    }
                    map.insert(seg.into(), Box::new(TrieNode::new(seg)));
                    *self = Self::Many(map);
                }
            }
        }
        match self {
            Self::Few(v) => {
                let pos = v
                    .iter()
                    .position(|(k, _)| &**k == seg)
                    .expect("just inserted");
                v[pos].1.as_mut()
            }
            Self::Many(m) => m
                .entry(seg.into())
                .or_insert_with(|| Box::new(TrieNode::new(seg)))
                .as_mut(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Few(v) => v.len(),
            Self::Many(m) => m.len(),
        }
    }

    /// Cold-path iteration, used when building a frozen snapshot.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&str, &TrieNode)> + '_> {
        match self {
            Self::Few(v) => Box::new(v.iter().map(|(k, n)| (&**k, n.as_ref()))),
            Self::Many(m) => Box::new(m.iter().map(|(k, n)| (&**k, n.as_ref()))),
        }
    }
}

/// One level of the mutable segment trie.
///
/// `part` is the segment text: a literal, `:name`, `*name`, or empty for
/// the root. A parameter and a wildcard child are mutually exclusive, and a
/// wildcard node never has children.
pub(crate) struct TrieNode {
    pub part: Box<str>,
    pub static_children: StaticChildren,
    pub param_child: Option<Box<TrieNode>>,
    pub wildcard_child: Option<Box<TrieNode>>,
    pub entry: Option<RouteEntry>,
}

impl Default for TrieNode {
    fn default() -> Self {
        Self::new("")
    }
}

impl TrieNode {
    fn new(part: &str) -> Self {
        Self {
            part: part.into(),
            static_children: StaticChildren::new(),
            param_child: None,
            wildcard_child: None,
            entry: None,
        }
    }

    #[inline]
    fn is_wildcard(&self) -> bool {
        self.part.starts_with('*')
    }

    /// Insert a pattern's segments, attaching `entry` at the leaf.
    ///
    /// Validation runs to completion before anything is mutated, so a
    /// failed insert leaves no structural change behind.
    pub fn insert(
        &mut self,
        segments: &[&str],
        entry: RouteEntry,
        max_depth: usize,
    ) -> Result<(), RouteError> {
        self.validate_insert(segments, max_depth)?;
        self.apply_insert(segments, entry);
        Ok(())
    }

    fn validate_insert(&self, segments: &[&str], max_depth: usize) -> Result<(), RouteError> {
        if segments.len() > max_depth {
            return Err(RouteError::RouteTooDeep { max: max_depth });
        }

        // Segment syntax plus capture-name uniqueness along the pattern.
        let mut names: SmallVec<[&str; 4]> = SmallVec::new();
        for (i, seg) in segments.iter().enumerate() {
            match seg.as_bytes().first() {
                Some(b'*') => {
                    let name = &seg[1..];
                    if name.is_empty() {
                        return Err(RouteError::MissingParamName {
                            segment: (*seg).to_string(),
                        });
                    }
                    if i + 1 != segments.len() {
                        return Err(RouteError::WildcardNotLast {
                            segment: (*seg).to_string(),
                        });
                    }
                    if names.contains(&name) {
                        return Err(RouteError::DuplicateParamName {
                            name: name.to_string(),
                        });
                    }
                    names.push(name);
                }
                Some(b':') => {
                    let name = &seg[1..];
                    if name.is_empty() {
                        return Err(RouteError::MissingParamName {
                            segment: (*seg).to_string(),
                        });
                    }
                    if names.contains(&name) {
                        return Err(RouteError::DuplicateParamName {
                            name: name.to_string(),
                        });
                    }
                    names.push(name);
                }
                _ => {}
            }
        }

        // Structural conflicts along the part of the tree that already exists.
        let mut node: Option<&TrieNode> = Some(self);
        for seg in segments {
            let Some(n) = node else { break };
            match seg.as_bytes().first() {
                Some(b':') => {
                    if n.wildcard_child.is_some() {
                        return Err(RouteError::ParamWildcardConflict);
                    }
                    match n.param_child.as_deref() {
                        Some(p) if p.part[1..] != seg[1..] => {
                            return Err(RouteError::ParamNameConflict {
                                new: seg[1..].to_string(),
                                existing: p.part[1..].to_string(),
                            });
                        }
                        next => node = next,
                    }
                }
                Some(b'*') => {
                    if n.param_child.is_some() {
                        return Err(RouteError::ParamWildcardConflict);
                    }
                    match n.wildcard_child.as_deref() {
                        Some(w) if w.part[1..] != seg[1..] => {
                            return Err(RouteError::ParamNameConflict {
                                new: seg[1..].to_string(),
                                existing: w.part[1..].to_string(),
                            });
                        }
                        next => node = next,
                    }
                }
                _ => node = n.static_children.get(seg),
            }
        }

        if let Some(n) = node {
            if n.entry.is_some() {
                return Err(RouteError::DuplicateRoute);
            }
        }
        Ok(())
    }

    fn apply_insert(&mut self, segments: &[&str], entry: RouteEntry) {
        let mut node = self;
        for seg in segments {
            node = match seg.as_bytes().first() {
                Some(b':') => node
                    .param_child
                    .get_or_insert_with(|| Box::new(TrieNode::new(seg)))
                    .as_mut(),
                Some(b'*') => node
                    .wildcard_child
                    .get_or_insert_with(|| Box::new(TrieNode::new(seg)))
                    .as_mut(),
                _ => node.static_children.get_or_insert(seg),
            };
        }
        node.entry = Some(entry);
    }

    /// Recursive lookup at depth `h`, trying children in strict priority:
    /// static, then parameter (with backtracking), then wildcard. Captured
    /// values come from the capture path; matching uses the match path.
    pub fn lookup<'a>(
        &'a self,
        seg: &'a PathSegments,
        h: usize,
        mut params: Option<&mut Params<'a>>,
        max_depth: usize,
    ) -> Option<&'a RouteEntry> {
        if h > max_depth {
            return None;
        }

        if h == seg.seg_count() || self.is_wildcard() {
            if self.entry.is_none() && h == seg.seg_count() {
                // `/static/` may still reach `/static/*rest` with an empty
                // capture.
                if let Some(w) = &self.wildcard_child {
                    return w.lookup(seg, h, params, max_depth);
                }
                return None;
            }
            let entry = self.entry.as_ref()?;
            if self.is_wildcard() {
                if let Some(p) = params.as_deref_mut() {
                    p.push(&self.part[1..], seg.tail_from(h));
                }
            }
            return Some(entry);
        }

        if let Some(child) = self.static_children.get(seg.match_seg(h)) {
            if let Some(entry) = child.lookup(seg, h + 1, params.as_deref_mut(), max_depth) {
                return Some(entry);
            }
        }

        if let Some(child) = self.param_child.as_deref() {
            let checkpoint = params.as_ref().map_or(0, |p| p.len());
            if let Some(p) = params.as_deref_mut() {
                p.push(&child.part[1..], seg.capture_seg(h));
            }
            if let Some(entry) = child.lookup(seg, h + 1, params.as_deref_mut(), max_depth) {
                return Some(entry);
            }
            if let Some(p) = params.as_deref_mut() {
                p.truncate(checkpoint);
            }
        }

        if let Some(child) = self.wildcard_child.as_deref() {
            return child.lookup(seg, h, params, max_depth);
        }

        None
    }
}

impl crate::table::PathLookup for TrieNode {
    fn find<'a>(
        &'a self,
        seg: &'a PathSegments,
        params: Option<&mut Params<'a>>,
        max_depth: usize,
    ) -> Option<&'a RouteEntry> {
        self.lookup(seg, 0, params, max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Request, ResponseWriter};

    fn noop_entry(pattern: &str) -> RouteEntry {
        let handler =
            |_: &mut dyn ResponseWriter, _: &Request<'_>, _: &Params<'_>| {};
        RouteEntry {
            handler: Arc::new(handler),
            pattern: Arc::from(pattern),
            has_params: pattern.contains(':') || pattern.contains('*'),
        }
    }

    fn insert(root: &mut TrieNode, pattern: &str) -> Result<(), RouteError> {
        let segments: Vec<&str> =
            pattern.split('/').filter(|s| !s.is_empty()).collect();
        root.insert(&segments, noop_entry(pattern), 50)
    }

    fn find<'a>(
        root: &'a TrieNode,
        seg: &'a PathSegments,
        params: &mut Params<'a>,
    ) -> Option<&'a str> {
        root.lookup(seg, 0, Some(params), 50)
            .map(|e| e.pattern.as_ref())
    }

    fn parse(path: &str) -> PathSegments {
        let mut seg = PathSegments::default();
        seg.parse(path, false).unwrap();
        seg
    }

    #[test]
    fn test_static_priority_over_param() {
        let mut root = TrieNode::default();
        insert(&mut root, "/files/new").unwrap();
        insert(&mut root, "/files/:name").unwrap();

        let seg = parse("/files/new");
        let mut params = Params::new();
        assert_eq!(find(&root, &seg, &mut params), Some("/files/new"));
        assert!(params.is_empty());

        let seg = parse("/files/other");
        let mut params = Params::new();
        assert_eq!(find(&root, &seg, &mut params), Some("/files/:name"));
        assert_eq!(params.get("name"), Some("other"));
    }

    #[test]
    fn test_param_backtracks_before_root_wildcard() {
        let mut root = TrieNode::default();
        insert(&mut root, "/a/:x/p").unwrap();
        insert(&mut root, "/*all").unwrap();

        // ":x" captures "b" but "q" != "p"; the capture must unwind before
        // the root wildcard takes the whole path.
        let seg = parse("/a/b/q");
        let mut params = Params::new();
        assert_eq!(find(&root, &seg, &mut params), Some("/*all"));
        assert_eq!(params.get("all"), Some("a/b/q"));
        assert_eq!(params.get("x"), None);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_static_fails_then_param_matches() {
        let mut root = TrieNode::default();
        insert(&mut root, "/a/b/end").unwrap();
        insert(&mut root, "/a/:x/other").unwrap();

        let seg = parse("/a/b/other");
        let mut params = Params::new();
        assert_eq!(find(&root, &seg, &mut params), Some("/a/:x/other"));
        assert_eq!(params.get("x"), Some("b"));
    }

    #[test]
    fn test_wildcard_empty_capture() {
        let mut root = TrieNode::default();
        insert(&mut root, "/static/*filepath").unwrap();

        let seg = parse("/static/");
        let mut params = Params::new();
        assert_eq!(find(&root, &seg, &mut params), Some("/static/*filepath"));
        assert_eq!(params.get("filepath"), Some(""));

        let seg = parse("/static/js/app.js");
        let mut params = Params::new();
        assert_eq!(find(&root, &seg, &mut params), Some("/static/*filepath"));
        assert_eq!(params.get("filepath"), Some("js/app.js"));
    }

    #[test]
    fn test_multi_param_capture() {
        let mut root = TrieNode::default();
        insert(&mut root, "/users/:id/posts/:post").unwrap();

        let seg = parse("/users/7/posts/hello");
        let mut params = Params::new();
        assert_eq!(
            find(&root, &seg, &mut params),
            Some("/users/:id/posts/:post")
        );
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("post"), Some("hello"));
    }

    #[test]
    fn test_conflict_errors() {
        let mut root = TrieNode::default();
        insert(&mut root, "/u/:id").unwrap();

        assert!(matches!(
            insert(&mut root, "/u/:name"),
            Err(RouteError::ParamNameConflict { .. })
        ));
        assert_eq!(
            insert(&mut root, "/u/*rest"),
            Err(RouteError::ParamWildcardConflict)
        );
        assert_eq!(insert(&mut root, "/u/:id"), Err(RouteError::DuplicateRoute));
        assert!(matches!(
            insert(&mut root, "/x/*rest/more"),
            Err(RouteError::WildcardNotLast { .. })
        ));
        assert!(matches!(
            insert(&mut root, "/x/:"),
            Err(RouteError::MissingParamName { .. })
        ));
        assert!(matches!(
            insert(&mut root, "/x/:id/y/:id"),
            Err(RouteError::DuplicateParamName { .. })
        ));
    }

    #[test]
    fn test_failed_insert_leaves_no_trace() {
        let mut root = TrieNode::default();
        insert(&mut root, "/a/:x").unwrap();
        // Fails on the conflicting second segment...
        assert!(insert(&mut root, "/a/*w").is_err());
        // ...without creating "/a/*w" partway.
        assert!(root.static_children.get("a").unwrap().wildcard_child.is_none());
    }

    #[test]
    fn test_depth_limit() {
        let mut root = TrieNode::default();
        let deep: Vec<&str> = std::iter::repeat("s").take(51).collect();
        assert!(matches!(
            root.insert(&deep, noop_entry("/deep"), 50),
            Err(RouteError::RouteTooDeep { .. })
        ));
    }

    #[test]
    fn test_static_children_upgrade_to_map() {
        let mut root = TrieNode::default();
        for name in ["a", "b", "c", "d", "e", "f"] {
            insert(&mut root, &format!("/{name}/:x")).unwrap();
        }
        assert!(matches!(root.static_children, StaticChildren::Many(_)));

        let seg = parse("/f/1");
        let mut params = Params::new();
        assert_eq!(find(&root, &seg, &mut params), Some("/f/:x"));
    }

    #[test]
    fn test_lookup_miss() {
        let mut root = TrieNode::default();
        insert(&mut root, "/a/b").unwrap();

        for path in ["/a", "/a/b/c", "/x"] {
            let seg = parse(path);
            let mut params = Params::new();
            assert_eq!(find(&root, &seg, &mut params), None, "{path}");
        }
    }
}

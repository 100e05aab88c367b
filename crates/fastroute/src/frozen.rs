use crate::dispatch::{self, TableView};
use crate::handler::{Request, ResponseWriter};
use crate::params::Params;
use crate::router::{Router, RouterConfig};
use crate::segment::PathSegments;
use crate::table::{MethodSet, PathLookup, RouteTable};
use crate::trie::{RouteEntry, TrieNode};
use std::collections::HashMap;

/// One level of the compacted trie.
///
/// Maximal chains of single-child static nodes with no leaf and no dynamic
/// child collapse into one node whose `span` holds the literals joined by
/// `/`; lookup compares the matching byte range of the request path against
/// the span in one shot instead of one map probe per segment.
struct FrozenNode {
    /// Segment text as in the mutable trie: `:name`, `*name`, or the first
    /// literal of `span`. Empty for the root.
    part: Box<str>,
    /// Joined literal segments for static nodes; empty otherwise.
    span: Box<str>,
    /// Number of segments `span` covers; 0 for root and dynamic nodes.
    span_segs: u16,
    /// Keyed by the first segment of the child's span.
    static_children: HashMap<Box<str>, FrozenNode>,
    param_child: Option<Box<FrozenNode>>,
    wildcard_child: Option<Box<FrozenNode>>,
    entry: Option<RouteEntry>,
}

impl FrozenNode {
    #[inline]
    fn is_wildcard(&self) -> bool {
        self.part.starts_with('*')
    }

    /// Build a frozen node for a dynamic (root/param/wildcard) trie node.
    fn from_dynamic(node: &TrieNode) -> Self {
        Self {
            part: node.part.clone(),
            span: "".into(),
            span_segs: 0,
            static_children: Self::convert_children(node),
            param_child: node
                .param_child
                .as_deref()
                .map(|c| Box::new(Self::from_dynamic(c))),
            wildcard_child: node
                .wildcard_child
                .as_deref()
                .map(|c| Box::new(Self::from_dynamic(c))),
            entry: node.entry.clone(),
        }
    }

    /// Build a frozen node for a static trie node, compressing the maximal
    /// single-child chain hanging off it.
    fn from_static_chain(node: &TrieNode) -> Self {
        let mut span = String::from(&*node.part);
        let mut span_segs: u16 = 1;
        let mut tail = node;
        while tail.entry.is_none()
            && tail.param_child.is_none()
            && tail.wildcard_child.is_none()
            && tail.static_children.len() == 1
        {
            let (_, child) = tail
                .static_children
                .iter()
                .next()
                .expect("len checked above");
            tail = child;
            span.push('/');
            span.push_str(&tail.part);
            span_segs += 1;
        }
        Self {
            part: node.part.clone(),
            span: span.into(),
            span_segs,
            static_children: Self::convert_children(tail),
            param_child: tail
                .param_child
                .as_deref()
                .map(|c| Box::new(Self::from_dynamic(c))),
            wildcard_child: tail
                .wildcard_child
                .as_deref()
                .map(|c| Box::new(Self::from_dynamic(c))),
            entry: tail.entry.clone(),
        }
    }

    fn convert_children(node: &TrieNode) -> HashMap<Box<str>, FrozenNode> {
        node.static_children
            .iter()
            .map(|(part, child)| (part.into(), Self::from_static_chain(child)))
            .collect()
    }

    /// Mirror of the mutable lookup; a node's own span was consumed by the
    /// parent before descending, so `h` already points past it.
    fn lookup<'a>(
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
            let n = child.span_segs as usize;
            if seg.seg_count() - h >= n && seg.match_range(h, h + n - 1) == &*child.span {
                if let Some(entry) = child.lookup(seg, h + n, params.as_deref_mut(), max_depth) {
                    return Some(entry);
                }
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

impl PathLookup for FrozenNode {
    fn find<'a>(
        &'a self,
        seg: &'a PathSegments,
        params: Option<&mut Params<'a>>,
        max_depth: usize,
    ) -> Option<&'a RouteEntry> {
        self.lookup(seg, 0, params, max_depth)
    }
}

/// Immutable compacted snapshot of a [`Router`].
///
/// Registration is impossible, so dispatch needs no lock; every behavior
/// observable at the boundary (status, body, `Allow`, `Location`) matches
/// the mutable router for the same routes.
pub struct FrozenRouter {
    config: RouterConfig,
    default_set: MethodSet<FrozenNode>,
    hosts: HashMap<Box<str>, MethodSet<FrozenNode>>,
}

impl Router {
    /// Snapshot the current route tables into an immutable router.
    ///
    /// Walks the tries under the read lock; later registrations on `self`
    /// do not affect the snapshot.
    pub fn freeze(&self) -> FrozenRouter {
        let state = self.state_read();
        FrozenRouter {
            config: self.config().clone(),
            default_set: freeze_set(&state.default_set),
            hosts: state
                .hosts
                .iter()
                .map(|(host, set)| (host.clone(), freeze_set(set)))
                .collect(),
        }
    }
}

impl FrozenRouter {
    /// Dispatch one request against the snapshot.
    pub fn serve(&self, w: &mut dyn ResponseWriter, req: &Request<'_>) {
        let view = TableView {
            default_set: &self.default_set,
            hosts: &self.hosts,
        };
        dispatch::serve(&view, &self.config, w, req);
    }

    /// The configuration inherited from the source router.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}

fn freeze_set(set: &MethodSet<TrieNode>) -> MethodSet<FrozenNode> {
    MethodSet {
        standard: std::array::from_fn(|i| set.standard[i].as_ref().map(freeze_table)),
        custom: set
            .custom
            .iter()
            .map(|(method, table)| (method.clone(), freeze_table(table)))
            .collect(),
        has_trailing_slash_routes: set.has_trailing_slash_routes,
        any_param_routes: set.any_param_routes,
        static_allow: set.static_allow.clone(),
    }
}

fn freeze_table(table: &RouteTable<TrieNode>) -> RouteTable<FrozenNode> {
    RouteTable {
        root: FrozenNode::from_dynamic(&table.root),
        static_routes: table.static_routes.clone(),
        has_param_routes: table.has_param_routes,
    }
}

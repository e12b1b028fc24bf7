//! Node list transformations applied between parsing and synthesis.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use crate::models::{Protocol, ProxyNode};
use crate::utils::matcher::RegionMatcher;

/// Structural identity of a node: two nodes with the same key reach the
/// same endpoint with the same secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub protocol: Protocol,
    pub server: String,
    pub port: u16,
    pub credential: Option<String>,
}

impl DedupKey {
    pub fn of(node: &ProxyNode) -> Self {
        Self {
            protocol: node.protocol(),
            server: node.server().to_string(),
            port: node.port(),
            credential: node.credential().secret().map(str::to_string),
        }
    }
}

/// Drops structural duplicates and makes display names unique.
///
/// One order-preserving pass: the first node with a given [`DedupKey`] is
/// kept. The first node carrying a name keeps it, the Nth later one becomes
/// `"{name}-{N}"`. If that suffixed name is itself taken, N keeps growing
/// until a free name is found.
pub fn resolve_nodes(nodes: Vec<ProxyNode>) -> Vec<ProxyNode> {
    resolve_nodes_reserving(nodes, std::iter::empty::<&str>())
}

/// [`resolve_nodes`] with `reserved` names counted as taken up front, so a
/// node named like a group or a built-in policy is suffixed instead.
pub fn resolve_nodes_reserving<I, S>(nodes: Vec<ProxyNode>, reserved: I) -> Vec<ProxyNode>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut discovered: HashSet<DedupKey> = HashSet::with_capacity(nodes.len());
    let mut taken: HashSet<String> = reserved.into_iter().map(Into::into).collect();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut resolved = Vec::with_capacity(nodes.len());
    let total = nodes.len();

    for node in nodes {
        if !discovered.insert(DedupKey::of(&node)) {
            continue;
        }

        let base = node.name().to_string();
        if taken.insert(base.clone()) {
            resolved.push(node);
            continue;
        }

        let counter = counters.entry(base.clone()).or_insert(0);
        let name = loop {
            *counter += 1;
            let candidate = format!("{}-{}", base, counter);
            if taken.insert(candidate.clone()) {
                break candidate;
            }
        };
        resolved.push(node.renamed(name));
    }

    debug!(
        "Resolved {} nodes into {} unique nodes",
        total,
        resolved.len()
    );
    resolved
}

/// Removes nodes whose name contains any of `keywords` (case-sensitive).
///
/// Returns the kept nodes and the number removed.
pub fn filter_by_keywords(nodes: Vec<ProxyNode>, keywords: &[String]) -> (Vec<ProxyNode>, usize) {
    let keywords: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return (nodes, 0);
    }

    let before = nodes.len();
    let kept: Vec<ProxyNode> = nodes
        .into_iter()
        .filter(|node| !keywords.iter().any(|k| node.name().contains(k)))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Labels every node with its region, in node order.
pub fn tag_regions<'a>(
    nodes: &'a [ProxyNode],
    matcher: &RegionMatcher,
) -> Vec<(&'a ProxyNode, String)> {
    nodes
        .iter()
        .map(|node| (node, matcher.match_region(node.name(), node.server())))
        .collect()
}

/// Counts nodes per region label.
pub fn region_summary(nodes: &[ProxyNode], matcher: &RegionMatcher) -> BTreeMap<String, usize> {
    let mut summary = BTreeMap::new();
    for (_, region) in tag_regions(nodes, matcher) {
        *summary.entry(region).or_insert(0) += 1;
    }
    summary
}

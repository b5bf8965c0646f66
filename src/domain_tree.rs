use std::collections::HashMap;
use std::sync::Arc;

use crate::diversion::Diversion;

/// A node in the domain tree, keyed into its parent's `children` map by
/// its leftmost label. The synthetic root node has an empty `domain`.
#[derive(Debug)]
pub struct DomainNode {
    pub domain: String,
    pub diversions: Vec<Diversion>,
    pub children: HashMap<String, Arc<DomainNode>>,
}

impl DomainNode {
    /// Longest-suffix lookup with wildcard fallback. `name` may carry a
    /// trailing dot. Walks labels right to left; an exact child wins
    /// over a `*` child, and a wildcard match returns immediately
    /// without further descent.
    pub fn resolve(self: &Arc<Self>, name: &str) -> Option<Arc<DomainNode>> {
        let labels: Vec<&str> = name.split('.').filter(|l| !l.is_empty()).collect();
        let mut current = Arc::clone(self);

        for label in labels.iter().rev() {
            match current.children.get(*label) {
                Some(child) => current = Arc::clone(child),
                None => return current.children.get("*").cloned(),
            }
        }

        Some(current)
    }
}

/// Leftmost label of a fully-qualified domain, e.g. `"vk.vu"` -> `"vk"`,
/// `"*.vk.vu"` -> `"*"`, `"vu"` -> `"vu"`.
pub fn leftmost_label(domain: &str) -> &str {
    domain.split('.').next().unwrap_or(domain)
}

/// The fully materialized, immutable configuration: the domain tree
/// plus a flat list of every node that was successfully attached (kept
/// around for diagnostics and tests, mirroring the original's flat
/// `Config.Dns` slice).
#[derive(Debug)]
pub struct Config {
    pub base: Arc<DomainNode>,
    pub nodes: Vec<Arc<DomainNode>>,
}

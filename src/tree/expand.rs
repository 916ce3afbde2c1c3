//! Agglomerative expansion of wide categories.
//!
//! A category with three or more children repeatedly merges its most
//! overlapping sibling pair into a synthetic intermediate category, until
//! two children remain or no pair reaches the merge threshold.
//!
//! Overlap of two siblings is `|a.elms ∩ b.elms| / min(|a.elms|, |b.elms|)`
//! over declared elements.

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, CategoryTree, ElementSet};

/// Summary of one expansion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandStats {
    /// Synthetic categories inserted.
    pub merges: usize,
    /// Depth before expansion.
    pub depth_before: usize,
    /// Depth after expansion.
    pub depth_after: usize,
}

/// Candidate sibling pair and its overlap ratio.
type Candidate = (CategoryId, CategoryId, f64);

/// Merges overlapping siblings level by level.
#[derive(Debug, Clone, Copy)]
pub struct TreeExpander {
    merge_threshold: f64,
}

impl TreeExpander {
    /// Create an expander; pairs with overlap below `merge_threshold` are
    /// never merged.
    pub fn new(merge_threshold: f64) -> Self {
        Self { merge_threshold }
    }

    /// Expand the whole tree, parents before children.
    pub fn expand(&self, tree: &mut CategoryTree) -> ExpandStats {
        let mut stats = ExpandStats {
            depth_before: tree.max_depth(),
            ..Default::default()
        };

        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            stats.merges += self.expand_level(tree, id);
            stack.extend(tree.get(id).children.iter().rev().copied());
        }

        stats.depth_after = tree.max_depth();
        if stats.merges > 0 {
            tracing::debug!(merges = stats.merges, depth = stats.depth_after, "expanded tree");
        }
        stats
    }

    /// Merge among the children of `parent` until it stabilizes; returns the
    /// number of merges.
    pub fn expand_level(&self, tree: &mut CategoryTree, parent: CategoryId) -> usize {
        let mut candidates = self.initial_candidates(tree, parent);
        let mut merges = 0;

        while tree.get(parent).children.len() > 2 && !candidates.is_empty() {
            let mut best = 0;
            for (i, c) in candidates.iter().enumerate().skip(1) {
                if c.2 > candidates[best].2 {
                    best = i;
                }
            }
            let (a, b, _) = candidates[best];
            let merged = tree.merge_siblings(a, b);
            merges += 1;

            candidates.retain(|&(x, y, _)| x != a && x != b && y != a && y != b);
            if tree.get(parent).children.len() < 3 {
                candidates.clear();
                continue;
            }
            for &sibling in tree.get(parent).children.iter().filter(|&&c| c != merged) {
                if let Some(ratio) = overlap_ratio(&tree.get(merged).elms, &tree.get(sibling).elms) {
                    if ratio >= self.merge_threshold {
                        candidates.push((merged, sibling, ratio));
                    }
                }
            }
        }
        merges
    }

    fn initial_candidates(&self, tree: &CategoryTree, parent: CategoryId) -> Vec<Candidate> {
        let children = &tree.get(parent).children;
        if children.len() < 3 {
            return Vec::new();
        }
        let mut candidates = Vec::new();
        for (i, &u) in children.iter().enumerate() {
            for &v in &children[i + 1..] {
                if let Some(ratio) = overlap_ratio(&tree.get(u).elms, &tree.get(v).elms) {
                    if ratio >= self.merge_threshold {
                        candidates.push((u, v, ratio));
                    }
                }
            }
        }
        candidates
    }
}

/// Overlap ratio of two intersecting sets; `None` when disjoint.
pub fn overlap_ratio(a: &ElementSet, b: &ElementSet) -> Option<f64> {
    let inter = a.intersection(b).count();
    if inter == 0 {
        return None;
    }
    Some(inter as f64 / a.len().min(b.len()) as f64)
}

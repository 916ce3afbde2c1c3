//! Category tree stored as an arena.
//!
//! Categories are addressed by stable [`CategoryId`] handles. Each node keeps
//! its parent as a back-reference and its children as an ordered id list, so
//! upward walks are O(1) per step and no node owns another.
//!
//! ## Element sets
//!
//! - `elms`: the declared target (origin query elements plus everything
//!   declared below it). Never changes after the builder runs, except on
//!   synthetic categories created by the expander.
//! - `actual_elms`: the current assignment, mutated by the duplicate
//!   resolver. Containment requires every category's `actual_elms` to
//!   cover the union of its children's.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::canonical::canonical_hash_hex;
use super::query::{Element, ElementSet, QueryId};

/// Name of the synthetic root category of every component.
pub const ROOT_NAME: &str = "ROOT";

/// Stable handle of a category inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CategoryId(u32);

impl CategoryId {
    /// Zero-based arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A node of the category tree.
#[derive(Debug, Clone)]
pub struct Category {
    /// Display name (origin query name, `ROOT`, or `a::b` for merged nodes).
    pub name: String,
    /// Query this category was created for; `None` for root and merged nodes.
    pub origin: Option<QueryId>,
    /// Declared target elements.
    pub elms: ElementSet,
    /// Currently assigned elements.
    pub actual_elms: ElementSet,
    /// Ordered children.
    pub children: Vec<CategoryId>,
    /// Parent, `None` only for the root.
    pub parent: Option<CategoryId>,
    /// Distance from the root.
    pub depth: usize,
}

impl Category {
    fn new(name: String, origin: Option<QueryId>, elms: ElementSet, depth: usize) -> Self {
        Self {
            name,
            origin,
            elms,
            actual_elms: ElementSet::new(),
            children: Vec::new(),
            parent: None,
            depth,
        }
    }

    /// Whether the category has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-backed rooted category tree of one component.
#[derive(Debug, Clone)]
pub struct CategoryTree {
    categories: Vec<Category>,
    by_query: BTreeMap<QueryId, CategoryId>,
}

impl Default for CategoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryTree {
    /// Create a tree containing only the root.
    pub fn new() -> Self {
        Self {
            categories: vec![Category::new(ROOT_NAME.to_string(), None, ElementSet::new(), 0)],
            by_query: BTreeMap::new(),
        }
    }

    /// The root category.
    pub fn root(&self) -> CategoryId {
        CategoryId(0)
    }

    /// Get a category.
    pub fn get(&self, id: CategoryId) -> &Category {
        &self.categories[id.index()]
    }

    /// Get a category mutably.
    pub fn get_mut(&mut self, id: CategoryId) -> &mut Category {
        &mut self.categories[id.index()]
    }

    /// Number of categories, root included.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// A tree always holds its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over all categories in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, &Category)> {
        self.categories
            .iter()
            .enumerate()
            .map(|(i, c)| (CategoryId(i as u32), c))
    }

    /// Category created for a query, if the query is in the tree.
    pub fn category_of(&self, query: QueryId) -> Option<CategoryId> {
        self.by_query.get(&query).copied()
    }

    /// Append a child under `parent` and return its id.
    pub fn add_child(
        &mut self,
        parent: CategoryId,
        name: impl Into<String>,
        origin: Option<QueryId>,
        elms: ElementSet,
    ) -> CategoryId {
        let id = CategoryId(self.categories.len() as u32);
        let mut category = Category::new(name.into(), origin, elms, self.get(parent).depth + 1);
        category.parent = Some(parent);
        self.categories.push(category);
        self.get_mut(parent).children.push(id);
        if let Some(q) = origin {
            self.by_query.insert(q, id);
        }
        id
    }

    /// Walk from `id` up to the root, `id` included.
    pub fn ancestors(&self, id: CategoryId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// Pre-order traversal from the root, children in order.
    pub fn preorder(&self) -> Vec<CategoryId> {
        let mut order = Vec::with_capacity(self.categories.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.get(id).children.iter().rev().copied());
        }
        order
    }

    /// Deepest depth of any category.
    pub fn max_depth(&self) -> usize {
        self.categories.iter().map(|c| c.depth).max().unwrap_or(0)
    }

    /// Assign `element` to `id` and every ancestor up to the root.
    pub fn add_element_upwards(&mut self, id: CategoryId, element: Element) {
        let mut next = Some(id);
        while let Some(current) = next {
            let category = self.get_mut(current);
            category.actual_elms.insert(element);
            next = category.parent;
        }
    }

    /// Remove `element` from `id` and from every descendant holding it.
    pub fn remove_element_downwards(&mut self, id: CategoryId, element: Element) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let category = self.get_mut(current);
            if category.actual_elms.remove(&element) {
                stack.extend(category.children.iter().copied());
            }
        }
    }

    /// Insert a synthetic category between two siblings and their parent.
    ///
    /// The new node takes the union of both siblings' element sets, replaces
    /// them in the parent's child list (appended last), and both subtrees
    /// move one level down.
    pub fn merge_siblings(&mut self, a: CategoryId, b: CategoryId) -> CategoryId {
        let parent = self.get(a).parent.unwrap_or_else(|| self.root());
        debug_assert_eq!(self.get(b).parent, Some(parent), "merge of non-siblings");

        let name = format!("{}::{}", self.get(a).name, self.get(b).name);
        let elms: ElementSet = self.get(a).elms.union(&self.get(b).elms).copied().collect();
        let actual: ElementSet = self
            .get(a)
            .actual_elms
            .union(&self.get(b).actual_elms)
            .copied()
            .collect();

        let id = CategoryId(self.categories.len() as u32);
        let mut merged = Category::new(name, None, elms, self.get(a).depth);
        merged.actual_elms = actual;
        merged.parent = Some(parent);
        merged.children = vec![a, b];
        self.categories.push(merged);

        let siblings = &mut self.get_mut(parent).children;
        siblings.retain(|c| *c != a && *c != b);
        siblings.push(id);

        for child in [a, b] {
            self.get_mut(child).parent = Some(id);
            self.shift_depth(child, 1);
        }
        id
    }

    /// Add `diff` to the depth of `id` and its whole subtree.
    fn shift_depth(&mut self, id: CategoryId, diff: usize) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let category = self.get_mut(current);
            category.depth += diff;
            stack.extend(category.children.iter().copied());
        }
    }

    /// Canonical fingerprint of the tree's structure and assignment.
    pub fn fingerprint(&self) -> String {
        #[derive(Serialize)]
        struct Row<'a> {
            name: &'a str,
            depth: usize,
            parent: Option<u32>,
            actual: Vec<u32>,
        }

        let rows: Vec<Row<'_>> = self
            .preorder()
            .into_iter()
            .map(|id| {
                let c = self.get(id);
                Row {
                    name: &c.name,
                    depth: c.depth,
                    parent: c.parent.map(|p| p.0),
                    actual: c.actual_elms.iter().map(|e| e.id()).collect(),
                }
            })
            .collect();
        canonical_hash_hex(&rows)
    }
}

/// Iterator returned by [`CategoryTree::ancestors`].
pub struct Ancestors<'a> {
    tree: &'a CategoryTree,
    next: Option<CategoryId>,
}

impl Iterator for Ancestors<'_> {
    type Item = CategoryId;

    fn next(&mut self) -> Option<CategoryId> {
        let current = self.next?;
        self.next = self.tree.get(current).parent;
        Some(current)
    }
}

impl fmt::Display for CategoryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.preorder() {
            let c = self.get(id);
            if c.depth > 0 {
                writeln!(f, "{} {}", "--".repeat(c.depth), c.name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::query::element_set;

    fn sample_tree() -> (CategoryTree, [CategoryId; 3]) {
        let mut tree = CategoryTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "a", Some(QueryId::new(0)), element_set([1, 2, 3]));
        let b = tree.add_child(a, "b", Some(QueryId::new(1)), element_set([1, 2]));
        let c = tree.add_child(root, "c", Some(QueryId::new(2)), element_set([4, 5]));
        (tree, [a, b, c])
    }

    #[test]
    fn test_add_child_sets_depth_and_index() {
        let (tree, [a, b, c]) = sample_tree();
        assert_eq!(tree.get(a).depth, 1);
        assert_eq!(tree.get(b).depth, 2);
        assert_eq!(tree.get(c).parent, Some(tree.root()));
        assert_eq!(tree.category_of(QueryId::new(1)), Some(b));
        assert_eq!(tree.max_depth(), 2);
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        let (tree, [a, b, _]) = sample_tree();
        let path: Vec<_> = tree.ancestors(b).collect();
        assert_eq!(path, vec![b, a, tree.root()]);
    }

    #[test]
    fn test_preorder() {
        let (tree, [a, b, c]) = sample_tree();
        assert_eq!(tree.preorder(), vec![tree.root(), a, b, c]);
    }

    #[test]
    fn test_add_and_remove_element() {
        let (mut tree, [a, b, c]) = sample_tree();
        let e = Element::new(9);

        tree.add_element_upwards(b, e);
        assert!(tree.get(b).actual_elms.contains(&e));
        assert!(tree.get(a).actual_elms.contains(&e));
        assert!(tree.get(tree.root()).actual_elms.contains(&e));
        assert!(!tree.get(c).actual_elms.contains(&e));

        tree.remove_element_downwards(tree.root(), e);
        assert!(tree.iter().all(|(_, cat)| !cat.actual_elms.contains(&e)));
    }

    #[test]
    fn test_merge_siblings() {
        let (mut tree, [a, b, c]) = sample_tree();
        let merged = tree.merge_siblings(a, c);

        let root = tree.get(tree.root());
        assert_eq!(root.children, vec![merged]);

        let m = tree.get(merged);
        assert_eq!(m.name, "a::c");
        assert_eq!(m.depth, 1);
        assert!(m.origin.is_none());
        assert_eq!(m.elms, element_set([1, 2, 3, 4, 5]));
        assert_eq!(m.children, vec![a, c]);

        assert_eq!(tree.get(a).depth, 2);
        assert_eq!(tree.get(b).depth, 3);
        assert_eq!(tree.get(c).parent, Some(merged));
    }

    #[test]
    fn test_display_indents_by_depth() {
        let (tree, _) = sample_tree();
        let rendered = tree.to_string();
        assert_eq!(rendered, "-- a\n---- b\n-- c\n");
    }

    #[test]
    fn test_fingerprint_tracks_assignment() {
        let (mut tree, [_, b, _]) = sample_tree();
        let before = tree.fingerprint();
        assert_eq!(before, tree.clone().fingerprint());

        tree.add_element_upwards(b, Element::new(1));
        assert_ne!(before, tree.fingerprint());
    }
}

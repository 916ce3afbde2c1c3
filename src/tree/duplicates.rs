//! Duplicate resolution: restore single assignment of elements.
//!
//! ## Procedure
//!
//! 1. Detect elements held by two or more sibling subtrees.
//! 2. Strip every duplicate from the whole tree.
//! 3. Collect the members whose coverage was lost by stripping.
//! 4. Repair cheapest-first: the category needing the fewest elements per
//!    unit of weight receives just enough pending duplicates to be covered
//!    again.
//! 5. Place every remaining duplicate on a single leaf.
//!
//! Steps 4 and 5 add each element along exactly one root-to-leaf path, so
//! the tree ends up with every element on a single chain.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::TreeError;
use crate::coverage::CoverageScorer;
use crate::similarity::SimilarityFunction;
use crate::types::{CategoryId, CategoryTree, Component, Element, QueryId};

/// Elements held by two or more children of some category.
pub fn find_duplicates(tree: &CategoryTree) -> BTreeSet<Element> {
    tree.get(tree.root())
        .actual_elms
        .iter()
        .copied()
        .filter(|&e| is_duplicate(tree, e))
        .collect()
}

fn is_duplicate(tree: &CategoryTree, element: Element) -> bool {
    let mut current = tree.root();
    loop {
        let mut holders = tree
            .get(current)
            .children
            .iter()
            .copied()
            .filter(|&c| tree.get(c).actual_elms.contains(&element));
        match (holders.next(), holders.next()) {
            (None, _) => return false,
            (Some(only), None) => current = only,
            (Some(_), Some(_)) => return true,
        }
    }
}

/// Summary of one resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveStats {
    /// Distinct elements in the tree.
    pub elements: usize,
    /// Duplicates detected.
    pub duplicates: usize,
    /// Members that lost coverage when duplicates were stripped.
    pub uncovered: usize,
    /// Duplicates assigned by targeted repair.
    pub repaired: usize,
    /// Duplicates placed on a leaf afterwards.
    pub leftover: usize,
    /// Covered member weight before stripping.
    pub weight_before: f64,
    /// Covered member weight right after stripping.
    pub weight_after_strip: f64,
    /// Covered member weight after repair and placement.
    pub weight_after: f64,
}

impl ResolveStats {
    /// Weight lost by stripping.
    pub fn weight_lost(&self) -> f64 {
        self.weight_before - self.weight_after_strip
    }

    /// Weight regained by repair.
    pub fn weight_regained(&self) -> f64 {
        self.weight_after - self.weight_after_strip
    }
}

/// Repair cost of one category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Closeness {
    /// Elements the category needs to become covering.
    pub missing: usize,
    /// `missing / query weight`; lower is repaired first.
    pub score: f64,
}

/// Outcome of evaluating a category for repair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClosenessState {
    /// The category already covers its query.
    Covered,
    /// Coverage needs zero elements, or more than are pending.
    Infeasible {
        /// Elements the category would need.
        missing: usize,
    },
    /// Repairable at the given cost.
    Repairable(Closeness),
}

/// Mutable state of the repair loop.
#[derive(Debug, Clone, Default)]
pub struct RepairContext {
    /// Category → duplicates it could take back.
    pub pending: BTreeMap<CategoryId, BTreeSet<Element>>,
    /// Repair cost of every candidate category.
    pub closeness: BTreeMap<CategoryId, Closeness>,
    /// Duplicates not yet placed.
    pub duplicates: BTreeSet<Element>,
}

impl RepairContext {
    fn cheapest(&self) -> Option<(CategoryId, Closeness)> {
        self.closeness
            .iter()
            .min_by(|a, b| a.1.score.total_cmp(&b.1.score))
            .map(|(&id, &c)| (id, c))
    }

    fn forget(&mut self, id: CategoryId) {
        self.pending.remove(&id);
        self.closeness.remove(&id);
    }
}

/// Resolves duplicates in one component's tree.
pub struct DuplicateResolver<'a, S: SimilarityFunction + ?Sized> {
    component: &'a Component,
    sim: &'a S,
    members: &'a BTreeSet<QueryId>,
}

impl<'a, S: SimilarityFunction + ?Sized> DuplicateResolver<'a, S> {
    /// Create a resolver over the independent-set `members` of `component`.
    pub fn new(component: &'a Component, sim: &'a S, members: &'a BTreeSet<QueryId>) -> Self {
        Self {
            component,
            sim,
            members,
        }
    }

    /// Resolve every duplicate in `tree`.
    ///
    /// A tree without duplicates is left untouched.
    pub fn resolve(&self, tree: &mut CategoryTree) -> Result<ResolveStats, TreeError> {
        let root = tree.root();
        let scorer = CoverageScorer::new(self.component, self.sim);

        let duplicates = find_duplicates(tree);
        let before = scorer.covered_members(tree, self.members);
        let mut stats = ResolveStats {
            elements: tree.get(root).elms.len(),
            duplicates: duplicates.len(),
            weight_before: self.component.weight_of(&before),
            ..Default::default()
        };
        if duplicates.is_empty() {
            stats.weight_after_strip = stats.weight_before;
            stats.weight_after = stats.weight_before;
            return Ok(stats);
        }

        for &e in &duplicates {
            tree.remove_element_downwards(root, e);
        }
        let after = scorer.covered_members(tree, self.members);
        let uncovered: BTreeSet<QueryId> = before.difference(&after).copied().collect();
        stats.uncovered = uncovered.len();
        stats.weight_after_strip = self.component.weight_of(&after);

        let mut ctx = RepairContext {
            pending: self.collect_pending(tree, &duplicates, &uncovered),
            closeness: BTreeMap::new(),
            duplicates,
        };
        self.init_closeness(tree, &mut ctx)?;

        stats.repaired = self.repair(tree, &mut ctx);
        stats.leftover = ctx.duplicates.len();
        place_leftovers(self.component, tree, &ctx.duplicates)?;

        let repaired = scorer.covered_members(tree, self.members);
        stats.weight_after = self.component.weight_of(&repaired);

        tracing::debug!(
            component = self.component.id(),
            duplicates = stats.duplicates,
            uncovered = stats.uncovered,
            repaired = stats.repaired,
            leftover = stats.leftover,
            "resolved duplicates"
        );
        Ok(stats)
    }

    /// Categories of uncovered members that declare a duplicate belonging to
    /// their own query.
    fn collect_pending(
        &self,
        tree: &CategoryTree,
        duplicates: &BTreeSet<Element>,
        uncovered: &BTreeSet<QueryId>,
    ) -> BTreeMap<CategoryId, BTreeSet<Element>> {
        let mut pending: BTreeMap<CategoryId, BTreeSet<Element>> = BTreeMap::new();
        for &e in duplicates {
            let mut stack = vec![tree.root()];
            while let Some(id) = stack.pop() {
                let category = tree.get(id);
                if !category.elms.contains(&e) {
                    continue;
                }
                if let Some(q) = category.origin {
                    if category.depth > 0
                        && uncovered.contains(&q)
                        && self.component.query(q).elements.contains(&e)
                    {
                        pending.entry(id).or_default().insert(e);
                    }
                }
                stack.extend(category.children.iter().copied());
            }
        }
        pending
    }

    fn init_closeness(&self, tree: &CategoryTree, ctx: &mut RepairContext) -> Result<(), TreeError> {
        let candidates: Vec<(CategoryId, usize)> = ctx.pending.iter().map(|(&id, p)| (id, p.len())).collect();
        for (id, available) in candidates {
            match self.closeness(tree, id, available) {
                ClosenessState::Repairable(c) => {
                    ctx.closeness.insert(id, c);
                }
                ClosenessState::Covered => {
                    return Err(TreeError::CoveredQueryMarkedUncovered {
                        category: tree.get(id).name.clone(),
                    });
                }
                ClosenessState::Infeasible { missing } => {
                    tracing::warn!(
                        component = self.component.id(),
                        category = %tree.get(id).name,
                        missing,
                        available,
                        "category excluded from repair"
                    );
                    ctx.forget(id);
                }
            }
        }
        Ok(())
    }

    /// Evaluate how cheaply `id` can be made covering again.
    pub fn closeness(&self, tree: &CategoryTree, id: CategoryId, available: usize) -> ClosenessState {
        let category = tree.get(id);
        let Some(q) = category.origin else {
            return ClosenessState::Infeasible { missing: 0 };
        };
        let query = self.component.query(q);
        if self.sim.is_covering(&query.elements, &category.actual_elms) {
            return ClosenessState::Covered;
        }

        let exact = self.sim.num_missing(&query.elements, &category.actual_elms);
        let mut missing = exact.ceil();
        // ceil of a value sitting just above an integer
        if missing - exact > 0.99999 {
            missing -= 1.0;
        }
        let missing = missing.max(0.0) as usize;

        if missing == 0 || missing > available {
            ClosenessState::Infeasible { missing }
        } else {
            ClosenessState::Repairable(Closeness {
                missing,
                score: missing as f64 / query.weight,
            })
        }
    }

    /// Run the cheapest-first repair loop; returns the number of assigned
    /// duplicates.
    fn repair(&self, tree: &mut CategoryTree, ctx: &mut RepairContext) -> usize {
        let mut assigned = 0;

        while !ctx.duplicates.is_empty() {
            let Some((chosen, closeness)) = ctx.cheapest() else {
                break;
            };
            let elements = select_elements(tree, ctx, chosen, closeness.missing);

            for &e in &elements {
                let leaf = descend_to_leaf(tree, chosen, e);
                tree.add_element_upwards(leaf, e);
            }

            let mut affected = BTreeSet::new();
            for e in &elements {
                ctx.duplicates.remove(e);
                for (&id, pending) in ctx.pending.iter_mut() {
                    if pending.remove(e) {
                        affected.insert(id);
                    }
                }
            }
            for id in affected {
                let available = ctx.pending.get(&id).map_or(0, BTreeSet::len);
                match self.closeness(tree, id, available) {
                    ClosenessState::Repairable(c) => {
                        ctx.closeness.insert(id, c);
                    }
                    _ => ctx.forget(id),
                }
            }
            assigned += elements.len();
        }
        assigned
    }
}

/// Pending categories on the same branch as `chosen`: its pending
/// ancestors, and the chain of first pending children below it.
fn branch_categories(
    tree: &CategoryTree,
    pending: &BTreeMap<CategoryId, BTreeSet<Element>>,
    chosen: CategoryId,
) -> BTreeSet<CategoryId> {
    let mut branch: BTreeSet<CategoryId> = tree
        .ancestors(chosen)
        .filter(|c| pending.contains_key(c))
        .collect();
    branch.insert(chosen);

    let mut current = chosen;
    while let Some(&next) = tree
        .get(current)
        .children
        .iter()
        .find(|c| pending.contains_key(c))
    {
        branch.insert(next);
        current = next;
    }
    branch
}

/// Pick `missing` pending elements for `chosen`, preferring those pending at
/// the fewest other categories of its branch.
fn select_elements(
    tree: &CategoryTree,
    ctx: &RepairContext,
    chosen: CategoryId,
    missing: usize,
) -> Vec<Element> {
    let Some(relevant) = ctx.pending.get(&chosen) else {
        return Vec::new();
    };
    if relevant.len() <= missing {
        return relevant.iter().copied().collect();
    }

    let branch = branch_categories(tree, &ctx.pending, chosen);
    let mut ranked: Vec<(usize, Element)> = relevant
        .iter()
        .map(|&e| {
            let overlaps = branch
                .iter()
                .filter(|&&c| c != chosen && ctx.pending.get(&c).is_some_and(|p| p.contains(&e)))
                .count();
            (overlaps, e)
        })
        .collect();
    ranked.sort_by_key(|&(overlaps, _)| overlaps);
    ranked.into_iter().take(missing).map(|(_, e)| e).collect()
}

/// Follow the first child declaring `element` until none does.
fn descend_to_leaf(tree: &CategoryTree, from: CategoryId, element: Element) -> CategoryId {
    let mut current = from;
    while let Some(&next) = tree
        .get(current)
        .children
        .iter()
        .find(|&&c| tree.get(c).elms.contains(&element))
    {
        current = next;
    }
    current
}

/// Assign each remaining duplicate to one leaf declaring it: the one with
/// the fewest assigned elements per unit of query weight.
fn place_leftovers(
    component: &Component,
    tree: &mut CategoryTree,
    duplicates: &BTreeSet<Element>,
) -> Result<(), TreeError> {
    for &e in duplicates {
        let mut leaves = Vec::new();
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            let declaring: Vec<CategoryId> = tree
                .get(id)
                .children
                .iter()
                .copied()
                .filter(|&c| tree.get(c).elms.contains(&e))
                .collect();
            if declaring.is_empty() {
                leaves.push(id);
            } else {
                stack.extend(declaring.into_iter().rev());
            }
        }

        let load = |id: &CategoryId| {
            let category = tree.get(*id);
            category
                .origin
                .map(|q| category.actual_elms.len() as f64 / component.query(q).weight)
        };
        let leaf = leaves
            .iter()
            .filter_map(|id| load(id).map(|l| (*id, l)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
            .ok_or(TreeError::MissingLeaf {
                element: e,
                category: tree.root(),
            })?;
        tree.add_element_upwards(leaf, e);
    }
    Ok(())
}

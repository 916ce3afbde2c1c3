//! Initial tree from MUST relations among independent-set members.

use std::collections::{BTreeMap, BTreeSet};

use super::TreeError;
use crate::independent_set::IndependentSet;
use crate::relations::RelationSet;
use crate::types::{CategoryId, CategoryTree, Component, QueryId};

/// Direct parent of every member that has a MUST-ancestor inside the set.
///
/// Ancestors of ancestors are removed from each candidate set; exactly one
/// candidate must remain.
pub fn direct_parents(
    component: &Component,
    relations: &RelationSet,
    members: &BTreeSet<QueryId>,
) -> Result<BTreeMap<QueryId, QueryId>, TreeError> {
    let mut ancestors: BTreeMap<QueryId, BTreeSet<QueryId>> = BTreeMap::new();
    for &q in members {
        if let Some(must) = relations.must_parents.get(&q) {
            let inside: BTreeSet<QueryId> = must.intersection(members).copied().collect();
            if !inside.is_empty() {
                ancestors.insert(q, inside);
            }
        }
    }

    let mut direct = BTreeMap::new();
    for (&q, parents) in &ancestors {
        let grandparents: BTreeSet<QueryId> = parents
            .iter()
            .filter_map(|p| ancestors.get(p))
            .flatten()
            .copied()
            .collect();
        let candidates: Vec<QueryId> = parents.difference(&grandparents).copied().collect();
        match candidates.as_slice() {
            [parent] => {
                direct.insert(q, *parent);
            }
            _ => {
                return Err(TreeError::AmbiguousParent {
                    query: component.query(q).name.clone(),
                    candidates: candidates
                        .iter()
                        .map(|c| component.query(*c).name.clone())
                        .collect(),
                })
            }
        }
    }
    Ok(direct)
}

/// Build the raw category tree of one component.
///
/// Members are placed in size-major order, so a parent always exists before
/// its children. `elms` is then propagated bottom-up and copied into
/// `actual_elms`; the result generally still holds duplicates.
pub fn build_tree(
    component: &Component,
    relations: &RelationSet,
    independent_set: &IndependentSet,
) -> Result<CategoryTree, TreeError> {
    let parents = direct_parents(component, relations, &independent_set.members)?;

    let mut tree = CategoryTree::new();
    for &q in &independent_set.members {
        let parent_category = match parents.get(&q) {
            Some(&p) => tree
                .category_of(p)
                .ok_or(TreeError::MissingParentCategory { query: q, parent: p })?,
            None => tree.root(),
        };
        let query = component.query(q);
        tree.add_child(parent_category, query.name.clone(), Some(q), query.elements.clone());
    }

    // Children always sit after their parent in the arena.
    let ids: Vec<CategoryId> = tree.iter().map(|(id, _)| id).collect();
    for &id in ids.iter().rev() {
        if let Some(parent) = tree.get(id).parent {
            let elms = tree.get(id).elms.clone();
            tree.get_mut(parent).elms.extend(elms);
        }
    }
    for &id in &ids {
        let category = tree.get_mut(id);
        category.actual_elms = category.elms.clone();
    }

    tracing::debug!(
        component = component.id(),
        categories = tree.len(),
        depth = tree.max_depth(),
        "built raw tree"
    );
    Ok(tree)
}

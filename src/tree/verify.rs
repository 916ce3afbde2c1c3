//! Structural checks on a finished tree.
//!
//! - Containment: every category's `actual_elms` holds its children's.
//! - Single assignment: at most one child of any category holds a given
//!   element, so each element lives on one chain.

use std::collections::BTreeSet;

use crate::types::{CategoryId, CategoryTree, Element};

/// A broken tree invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// A child holds elements its parent does not.
    #[error("Category {category} is missing {} element(s) held by its children", missing.len())]
    Containment {
        /// Parent category name.
        category: String,
        /// Elements held below but not at the parent.
        missing: Vec<Element>,
    },

    /// Two children of the same category hold the element.
    #[error("Element {element} is held by several children of {category}")]
    MultipleAssignment {
        /// Offending element.
        element: Element,
        /// Parent category name.
        category: String,
    },
}

/// Check containment and single assignment over the whole tree.
pub fn verify_tree(tree: &CategoryTree) -> Result<(), InvariantViolation> {
    for id in tree.preorder() {
        check_containment(tree, id)?;
        check_single_assignment(tree, id)?;
    }
    Ok(())
}

/// Check containment only.
pub fn verify_containment(tree: &CategoryTree) -> Result<(), InvariantViolation> {
    tree.preorder()
        .into_iter()
        .try_for_each(|id| check_containment(tree, id))
}

fn check_containment(tree: &CategoryTree, id: CategoryId) -> Result<(), InvariantViolation> {
    let category = tree.get(id);
    let missing: Vec<Element> = category
        .children
        .iter()
        .flat_map(|&c| tree.get(c).actual_elms.iter())
        .filter(|e| !category.actual_elms.contains(e))
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InvariantViolation::Containment {
            category: category.name.clone(),
            missing,
        })
    }
}

fn check_single_assignment(tree: &CategoryTree, id: CategoryId) -> Result<(), InvariantViolation> {
    let category = tree.get(id);
    let mut seen = BTreeSet::new();
    for &child in &category.children {
        for &e in &tree.get(child).actual_elms {
            if !seen.insert(e) {
                return Err(InvariantViolation::MultipleAssignment {
                    element: e,
                    category: category.name.clone(),
                });
            }
        }
    }
    Ok(())
}

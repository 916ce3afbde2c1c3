//! Category tree construction, repair and expansion.
//!
//! | Stage | Module | Mutation |
//! |-------|--------|----------|
//! | build | [`builder`] | creates one category per independent-set member |
//! | repair | [`duplicates`] | content only: `actual_elms` of existing nodes |
//! | expand | [`expand`] | structural: synthetic nodes, re-parenting, depth shifts |
//! | verify | [`verify`] | none |

pub mod builder;
pub mod duplicates;
pub mod expand;
pub mod verify;

pub use builder::{build_tree, direct_parents};
pub use duplicates::{find_duplicates, DuplicateResolver, ResolveStats};
pub use expand::{ExpandStats, TreeExpander};
pub use verify::{verify_tree, InvariantViolation};

use crate::types::{CategoryId, Element, QueryId};

/// Error type for tree construction and repair.
///
/// Every variant is an invariant failure in the relation data or the tree;
/// none is recoverable by retrying.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TreeError {
    /// Direct-parent computation left zero or several candidates.
    #[error("Query {query} has {} direct parent candidates: {candidates:?}", candidates.len())]
    AmbiguousParent {
        /// Query whose parent is ambiguous.
        query: String,
        /// Remaining candidates.
        candidates: Vec<String>,
    },

    /// A direct parent was not placed before its child.
    #[error("Parent {parent} of {query} has no category")]
    MissingParentCategory {
        /// Child query.
        query: QueryId,
        /// Parent query.
        parent: QueryId,
    },

    /// A category scheduled for repair already covers its query.
    #[error("Category {category} is covering its query but was marked uncovered")]
    CoveredQueryMarkedUncovered {
        /// Offending category name.
        category: String,
    },

    /// No leaf declares a duplicate element.
    #[error("No leaf declares element {element} below {category}")]
    MissingLeaf {
        /// Element being placed.
        element: Element,
        /// Category the search started from.
        category: CategoryId,
    },
}

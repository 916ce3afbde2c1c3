//! Core types for the category kernel.

pub mod query;
pub mod relation;
pub mod component;
pub mod category;

pub use query::{Element, ElementSet, Query, QueryId, element_set};
pub use relation::{Relation, TripleConflict};
pub use component::{Component, ComponentError};
pub use category::{Category, CategoryId, CategoryTree, ROOT_NAME};

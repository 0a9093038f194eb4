//! Traversal of a walkthrough, one page at a time.

pub mod walkthrough;


pub use walkthrough::{Targets, Traversal, TraversalConfig, TraversalReport, cancellable};

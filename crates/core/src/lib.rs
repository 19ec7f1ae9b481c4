//! Domain types and the search-index seam shared by the probmark crates.

pub mod domain;
pub mod search;

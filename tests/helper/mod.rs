//! Shared test utilities

#![allow(dead_code, unused_imports)]

pub mod fetcher;
pub mod tree;

pub use fetcher::CountingFetcher;
pub use tree::{create_git_repository, module_block, write_file};

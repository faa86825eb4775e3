//! Finds the module calls of Terraform and Terragrunt configurations and
//! checks their git remotes and module registries for newer versions.
//!
//! # Modules
//!
//! - [`parser`]: configuration readers producing module call records
//! - [`source`]: classification of module source addresses
//! - [`module_call`]: current version and constraint inference
//! - [`scan`]: (recursive) module scanning
//! - [`version`]: version listing, caching and update resolution
//! - [`check`]: concurrent update checks
//! - [`output`]: result rendering

pub mod check;
pub mod config;
pub mod logging;
pub mod module_call;
pub mod output;
pub mod parser;
pub mod scan;
pub mod source;
pub mod version;

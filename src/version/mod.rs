//! Version layer: listing, caching and comparing module versions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Fetcher   │────▶│    Cache    │◀────│  Resolver   │
//! │  (list)     │     │  (per-run)  │     │  (compare)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                         ┌─────────────┐
//! │ Registries  │                         │ Constraint  │
//! │(git, module)│                         │ (matching)  │
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: per-run cache collapsing concurrent fetches of one source
//! - [`constraint`]: version constraint parsing and matching
//! - [`error`]: Error types for fetch and cache operations
//! - [`fetcher`]: Fetcher trait dispatching on the source kind
//! - [`registries`]: git remote and module registry clients
//! - [`resolver`]: matching / overall update computation
//! - [`semver`]: lenient version parsing and ordered version sets

pub mod cache;
pub mod constraint;
pub mod error;
pub mod fetcher;
pub mod registries;
pub mod resolver;
pub mod semver;

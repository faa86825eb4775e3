//! Clients listing the published versions of module sources

pub mod git;
pub mod terraform;

pub use git::GitRemoteClient;
pub use terraform::RegistryClient;

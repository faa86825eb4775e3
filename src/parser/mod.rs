//! Config reader layer
//! - traits.rs: Parser trait definition
//! - types.rs: Common types (ModuleCallRecord, ConfigKind)
//! - hcl.rs: tree-sitter helpers shared by the HCL readers
//! - terraform.rs: `*.tf` module block reader
//! - terragrunt.rs: `terragrunt.hcl` source reader

mod hcl;
pub mod terraform;
pub mod terragrunt;
pub mod traits;
pub mod types;

use std::sync::Arc;

pub use terraform::TerraformParser;
pub use terragrunt::TerragruntParser;
pub use traits::{ParseError, Parser};
pub use types::{ConfigKind, ModuleCallRecord};

/// Create the reader for a kind of configuration tree
pub fn parser_for(kind: ConfigKind) -> Arc<dyn Parser> {
    match kind {
        ConfigKind::Terraform => Arc::new(TerraformParser::new()),
        ConfigKind::Terragrunt => Arc::new(TerragruntParser::new()),
    }
}

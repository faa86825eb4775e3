//! Common types for config readers

use std::path::{Path, PathBuf};

/// A `module` block found in a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleCallRecord {
    /// Module name (the block label, or the file path for terragrunt configs)
    pub name: String,
    /// Raw `source` attribute value
    pub source: String,
    /// Raw `version` attribute value; empty when unspecified
    pub version: String,
    /// File declaring the module block
    pub file: PathBuf,
}

impl ModuleCallRecord {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        version: impl Into<String>,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            version: version.into(),
            file: file.into(),
        }
    }

    /// Directory containing the declaring file, used to resolve local sources
    pub fn declaring_dir(&self) -> &Path {
        self.file.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Kind of configuration tree being read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConfigKind {
    /// `*.tf` files with `module` blocks
    #[default]
    Terraform,
    /// `terragrunt.hcl` files with a `terraform { source = ... }` block
    Terragrunt,
}

impl ConfigKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKind::Terraform => "terraform",
            ConfigKind::Terragrunt => "terragrunt",
        }
    }
}

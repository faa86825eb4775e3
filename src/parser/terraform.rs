//! Terraform configuration reader
//!
//! Extracts `module` blocks from the `*.tf` files of a directory:
//!
//! ```text
//! module "vpc" {
//!   source  = "terraform-aws-modules/vpc/aws"
//!   version = "~> 5.0"
//! }
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::parser::hcl;
use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::ModuleCallRecord;

/// File extension of Terraform configuration files
const TERRAFORM_EXTENSION: &str = "tf";

/// Parser for Terraform module directories
pub struct TerraformParser;

impl TerraformParser {
    pub fn new() -> Self {
        Self
    }

    /// Lists the `*.tf` files of a directory, sorted by name
    fn config_files(&self, dir: &Path) -> Result<Vec<PathBuf>, ParseError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| ParseError::io(dir, e))? {
            let entry = entry.map_err(|e| ParseError::io(dir, e))?;
            let path = entry.path();
            if path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == TERRAFORM_EXTENSION)
            {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl Default for TerraformParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for TerraformParser {
    fn read_dir(&self, path: &Path) -> Result<Vec<ModuleCallRecord>, ParseError> {
        let files = if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            self.config_files(path)?
        };
        debug!("Reading {} terraform files in {:?}", files.len(), path);

        let mut results = Vec::new();
        for file in files {
            let content = std::fs::read_to_string(&file).map_err(|e| ParseError::io(&file, e))?;
            results.extend(self.parse(&content, &file)?);
        }

        Ok(results)
    }

    fn parse(&self, content: &str, file: &Path) -> Result<Vec<ModuleCallRecord>, ParseError> {
        let tree = hcl::parse_tree(content, file)?;
        let root = tree.root_node();
        let mut results = Vec::new();

        for block in hcl::top_level_blocks(root) {
            if hcl::block_type(block, content) != Some("module") {
                continue;
            }
            if let Some(record) = self.extract_module_call(block, content, file) {
                results.push(record);
            }
        }

        Ok(results)
    }
}

impl TerraformParser {
    /// Build a record from a `module "<name>" { ... }` block
    fn extract_module_call(
        &self,
        block: tree_sitter::Node,
        content: &str,
        file: &Path,
    ) -> Option<ModuleCallRecord> {
        let Some(name) = hcl::block_labels(block, content).into_iter().next() else {
            warn!("Skipping module block without a name in {:?}", file);
            return None;
        };

        let mut source: Option<String> = None;
        let mut version = String::new();

        for (key, expression) in hcl::block_attributes(block, content) {
            match key {
                "source" => match hcl::string_literal(expression, content) {
                    Some(value) => source = Some(value),
                    None => {
                        warn!(
                            "Skipping module {:?} in {:?}: source is not a string literal",
                            name, file
                        );
                        return None;
                    }
                },
                "version" => match hcl::string_literal(expression, content) {
                    Some(value) => version = value,
                    None => warn!(
                        "Ignoring non-literal version of module {:?} in {:?}",
                        name, file
                    ),
                },
                _ => {}
            }
        }

        let Some(source) = source else {
            warn!("Skipping module {:?} in {:?}: no source", name, file);
            return None;
        };

        Some(ModuleCallRecord::new(name, source, version, file))
    }
}

//! Terragrunt configuration reader
//!
//! Each `terragrunt.hcl` with a `terraform { source = "..." }` block yields one record,
//! named after the file that declares it.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::parser::hcl;
use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::ModuleCallRecord;

/// File name of terragrunt configurations
const TERRAGRUNT_FILE: &str = "terragrunt.hcl";

/// Directory terragrunt uses for downloaded sources
const TERRAGRUNT_CACHE_DIR: &str = ".terragrunt-cache";

/// Parser for terragrunt configuration trees
pub struct TerragruntParser;

impl TerragruntParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerragruntParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for TerragruntParser {
    fn read_dir(&self, path: &Path) -> Result<Vec<ModuleCallRecord>, ParseError> {
        if !path.exists() {
            return Err(ParseError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "path does not exist"),
            ));
        }

        let mut results = Vec::new();
        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != TERRAGRUNT_CACHE_DIR);

        for entry in walker {
            let entry = entry.map_err(|e| {
                let failing = e.path().unwrap_or(path).to_path_buf();
                ParseError::io(&failing, std::io::Error::other(e))
            })?;
            if !entry.file_type().is_file() || entry.file_name() != TERRAGRUNT_FILE {
                continue;
            }

            let file = entry.path();
            debug!("Reading terragrunt config {:?}", file);
            let content = std::fs::read_to_string(file).map_err(|e| ParseError::io(file, e))?;
            results.extend(self.parse(&content, file)?);
        }

        Ok(results)
    }

    fn parse(&self, content: &str, file: &Path) -> Result<Vec<ModuleCallRecord>, ParseError> {
        let tree = hcl::parse_tree(content, file)?;
        let root = tree.root_node();

        for block in hcl::top_level_blocks(root) {
            if hcl::block_type(block, content) != Some("terraform") {
                continue;
            }
            for (key, expression) in hcl::block_attributes(block, content) {
                if key != "source" {
                    continue;
                }
                let Some(source) = hcl::string_literal(expression, content) else {
                    warn!("Skipping non-literal terraform source in {:?}", file);
                    return Ok(Vec::new());
                };
                let name = file.display().to_string();
                return Ok(vec![ModuleCallRecord::new(name, source, "", file)]);
            }
        }

        Ok(Vec::new())
    }
}

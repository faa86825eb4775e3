//! Module scanner
//!
//! Reads the module calls of one or more configuration directories and, in
//! recursive mode, follows calls to local modules. Every local module
//! directory is keyed by its canonical path and read at most once per scan,
//! so diamond and cyclic references terminate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::MAX_SCAN_DEPTH;
use crate::parser::{ConfigKind, ModuleCallRecord, ParseError, Parser, parser_for};
use crate::source::{Source, classify};

/// Error type for scanning
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// A root path given by the caller could not be read; aborts the scan
    #[error("read configuration {path:?}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// The directory of a local module does not exist or cannot be resolved
    #[error("resolve local module {module:?} at {path:?}: {source}")]
    Unresolvable {
        module: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory of a local module could not be read
    #[error("read local module {module:?} at {path:?}: {source}")]
    Branch {
        module: String,
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("local module {module:?} at {path:?} is nested deeper than {max_depth} levels")]
    DepthExceeded {
        module: String,
        path: PathBuf,
        max_depth: usize,
    },
}

/// Visited local module directories of one scan.
///
/// Maps the canonical directory path to the module call that first led there;
/// `None` marks a root path.
#[derive(Debug, Default)]
pub struct ScanState {
    visited: HashMap<PathBuf, Option<ModuleCallRecord>>,
}

impl ScanState {
    /// Marks `key` as visited; returns `false` when it already was
    fn visit(&mut self, key: PathBuf, via: Option<&ModuleCallRecord>) -> bool {
        if self.visited.contains_key(&key) {
            return false;
        }
        self.visited.insert(key, via.cloned());
        true
    }

    pub fn is_visited(&self, path: &Path) -> bool {
        self.visited.contains_key(path)
    }

    /// The module call through which a directory was first reached
    pub fn reached_via(&self, path: &Path) -> Option<&ModuleCallRecord> {
        self.visited.get(path).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

/// Records found by a scan together with the local branches that failed
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub records: Vec<ModuleCallRecord>,
    pub branch_errors: Vec<ScanError>,
}

pub struct Scanner {
    /// Reader for the root paths
    parser: Arc<dyn Parser>,
    /// Reader for local module directories
    module_parser: Arc<dyn Parser>,
    max_depth: usize,
}

impl Scanner {
    /// Creates a scanner for a kind of configuration tree.
    ///
    /// Local modules are always plain Terraform directories, whatever the root kind.
    pub fn new(kind: ConfigKind) -> Self {
        Self::with_parsers(parser_for(kind), parser_for(ConfigKind::Terraform))
    }

    pub fn with_parsers(parser: Arc<dyn Parser>, module_parser: Arc<dyn Parser>) -> Self {
        Self {
            parser,
            module_parser,
            max_depth: MAX_SCAN_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Scans `paths`; see [`Scanner::scan_with_state`]
    pub fn scan(&self, paths: &[PathBuf], recursive: bool) -> Result<ScanOutput, ScanError> {
        let mut state = ScanState::default();
        self.scan_with_state(paths, recursive, &mut state)
    }

    /// Scans `paths`, recording visited local module directories in `state`.
    ///
    /// Fails only when a root path cannot be read. Failing local branches are
    /// collected in [`ScanOutput::branch_errors`] while their siblings continue.
    pub fn scan_with_state(
        &self,
        paths: &[PathBuf],
        recursive: bool,
        state: &mut ScanState,
    ) -> Result<ScanOutput, ScanError> {
        let mut output = ScanOutput::default();

        for path in paths {
            if recursive {
                if let Ok(key) = path.canonicalize() {
                    if !state.visit(key, None) {
                        debug!("Skipping {:?}: already scanned", path);
                        continue;
                    }
                }
            }

            let records = self
                .parser
                .read_dir(path)
                .map_err(|source| ScanError::Root {
                    path: path.clone(),
                    source,
                })?;
            debug!("Found {} module calls in {:?}", records.len(), path);

            for record in records {
                if recursive {
                    self.follow(&record, 1, state, &mut output);
                }
                output.records.push(record);
            }
        }

        // Local modules are discovered depth-first; restore reader order per file
        output.records.sort_by(|a, b| a.file.cmp(&b.file));

        Ok(output)
    }

    /// Reads the local module `record` points to, if any, and recurses into it
    fn follow(
        &self,
        record: &ModuleCallRecord,
        depth: usize,
        state: &mut ScanState,
        output: &mut ScanOutput,
    ) {
        let Ok(Source::Local(local)) = classify(&record.source) else {
            return;
        };

        let target = record.declaring_dir().join(&local.path);
        let key = match target.canonicalize() {
            Ok(key) => key,
            Err(source) => {
                warn!("Cannot resolve local module {:?} at {:?}: {}", record.name, target, source);
                output.branch_errors.push(ScanError::Unresolvable {
                    module: record.name.clone(),
                    path: target,
                    source,
                });
                return;
            }
        };

        if state.is_visited(&key) {
            debug!("Skipping {:?}: already scanned", key);
            return;
        }

        if depth > self.max_depth {
            warn!("Local module {:?} at {:?} exceeds the maximum depth", record.name, key);
            output.branch_errors.push(ScanError::DepthExceeded {
                module: record.name.clone(),
                path: key,
                max_depth: self.max_depth,
            });
            return;
        }

        state.visit(key.clone(), Some(record));

        match self.module_parser.read_dir(&key) {
            Ok(nested) => {
                debug!("Found {} module calls in local module {:?}", nested.len(), key);
                for nested_record in nested {
                    self.follow(&nested_record, depth + 1, state, output);
                    output.records.push(nested_record);
                }
            }
            Err(source) => {
                warn!("Cannot read local module {:?} at {:?}: {}", record.name, key, source);
                output.branch_errors.push(ScanError::Branch {
                    module: record.name.clone(),
                    path: key,
                    source,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_module(root: &Path, dir: &str, calls: &[(&str, &str)]) {
        let dir = root.join(dir);
        fs::create_dir_all(&dir).unwrap();
        let content: String = calls
            .iter()
            .map(|(name, source)| format!("module \"{}\" {{\n  source = \"{}\"\n}}\n", name, source))
            .collect();
        fs::write(dir.join("main.tf"), content).unwrap();
    }

    fn names(output: &ScanOutput) -> Vec<&str> {
        let mut names: Vec<_> = output.records.iter().map(|r| r.name.as_str()).collect();
        names.sort();
        names
    }

    #[test]
    fn scan_without_recursion_reads_root_only() {
        let tmp = TempDir::new().unwrap();
        write_module(tmp.path(), "root", &[("a", "./a"), ("vpc", "acme/vpc/aws")]);
        write_module(tmp.path(), "root/a", &[("inner", "acme/inner/aws")]);

        let output = Scanner::new(ConfigKind::Terraform)
            .scan(&[tmp.path().join("root")], false)
            .unwrap();

        assert_eq!(names(&output), vec!["a", "vpc"]);
        assert!(output.branch_errors.is_empty());
    }

    #[test]
    fn scan_reads_diamond_reference_once() {
        let tmp = TempDir::new().unwrap();
        write_module(tmp.path(), "root", &[("a", "../a"), ("b", "../b")]);
        write_module(tmp.path(), "a", &[("c_from_a", "../c")]);
        write_module(tmp.path(), "b", &[("c_from_b", "../c")]);
        write_module(tmp.path(), "c", &[("leaf", "acme/leaf/aws")]);

        let mut state = ScanState::default();
        let output = Scanner::new(ConfigKind::Terraform)
            .scan_with_state(&[tmp.path().join("root")], true, &mut state)
            .unwrap();

        assert_eq!(names(&output), vec!["a", "b", "c_from_a", "c_from_b", "leaf"]);
        let c = tmp.path().join("c").canonicalize().unwrap();
        assert!(state.is_visited(&c));
        assert_eq!(state.reached_via(&c).map(|r| r.name.as_str()), Some("c_from_a"));
        assert_eq!(state.len(), 4);
    }

    #[test]
    fn scan_terminates_on_cyclic_reference() {
        let tmp = TempDir::new().unwrap();
        write_module(tmp.path(), "a", &[("to_b", "../b")]);
        write_module(tmp.path(), "b", &[("to_a", "../a")]);

        let output = Scanner::new(ConfigKind::Terraform)
            .scan(&[tmp.path().join("a")], true)
            .unwrap();

        assert_eq!(names(&output), vec!["to_a", "to_b"]);
        assert!(output.branch_errors.is_empty());
    }

    #[test]
    fn scan_terminates_on_self_reference() {
        let tmp = TempDir::new().unwrap();
        write_module(tmp.path(), "a", &[("myself", "./")]);

        let output = Scanner::new(ConfigKind::Terraform)
            .scan(&[tmp.path().join("a")], true)
            .unwrap();

        assert_eq!(names(&output), vec!["myself"]);
    }

    #[test]
    fn scan_collects_missing_branch_and_continues_with_siblings() {
        let tmp = TempDir::new().unwrap();
        write_module(tmp.path(), "root", &[("missing", "./missing"), ("ok", "./ok")]);
        write_module(tmp.path(), "root/ok", &[("leaf", "acme/leaf/aws")]);

        let output = Scanner::new(ConfigKind::Terraform)
            .scan(&[tmp.path().join("root")], true)
            .unwrap();

        assert_eq!(names(&output), vec!["leaf", "missing", "ok"]);
        assert_eq!(output.branch_errors.len(), 1);
        assert!(matches!(
            &output.branch_errors[0],
            ScanError::Unresolvable { module, .. } if module == "missing"
        ));
    }

    #[test]
    fn scan_stops_at_max_depth() {
        let tmp = TempDir::new().unwrap();
        write_module(tmp.path(), "l0", &[("l1", "../l1")]);
        write_module(tmp.path(), "l1", &[("l2", "../l2")]);
        write_module(tmp.path(), "l2", &[("l3", "../l3")]);
        write_module(tmp.path(), "l3", &[("leaf", "acme/leaf/aws")]);

        let output = Scanner::new(ConfigKind::Terraform)
            .with_max_depth(2)
            .scan(&[tmp.path().join("l0")], true)
            .unwrap();

        assert_eq!(names(&output), vec!["l1", "l2", "l3"]);
        assert!(matches!(
            &output.branch_errors[..],
            [ScanError::DepthExceeded { module, max_depth: 2, .. }] if module == "l3"
        ));
    }

    #[test]
    fn scan_skips_visited_module_reached_again_beyond_max_depth() {
        let tmp = TempDir::new().unwrap();
        write_module(tmp.path(), "l0", &[("shared", "../shared"), ("l1", "../l1")]);
        write_module(tmp.path(), "l1", &[("l2", "../l2")]);
        write_module(tmp.path(), "l2", &[("shared_again", "../shared")]);
        write_module(tmp.path(), "shared", &[("leaf", "acme/leaf/aws")]);

        let output = Scanner::new(ConfigKind::Terraform)
            .with_max_depth(2)
            .scan(&[tmp.path().join("l0")], true)
            .unwrap();

        assert_eq!(names(&output), vec!["l1", "l2", "leaf", "shared", "shared_again"]);
        assert!(output.branch_errors.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn scan_reads_module_reached_through_symlink_once() {
        let tmp = TempDir::new().unwrap();
        write_module(tmp.path(), "root", &[("plain", "../shared"), ("linked", "../link")]);
        write_module(tmp.path(), "shared", &[("leaf", "acme/leaf/aws")]);
        std::os::unix::fs::symlink(tmp.path().join("shared"), tmp.path().join("link")).unwrap();

        let mut state = ScanState::default();
        let output = Scanner::new(ConfigKind::Terraform)
            .scan_with_state(&[tmp.path().join("root")], true, &mut state)
            .unwrap();

        assert_eq!(names(&output), vec!["leaf", "linked", "plain"]);
        assert!(output.branch_errors.is_empty());
        assert_eq!(state.len(), 2);
        let shared = tmp.path().join("shared").canonicalize().unwrap();
        assert_eq!(state.reached_via(&shared).map(|r| r.name.as_str()), Some("plain"));
    }

    #[cfg(unix)]
    #[test]
    fn scan_terminates_on_symlink_to_ancestor() {
        let tmp = TempDir::new().unwrap();
        write_module(tmp.path(), "a", &[("down", "./sub")]);
        write_module(tmp.path(), "a/sub", &[("up", "./back")]);
        std::os::unix::fs::symlink(tmp.path().join("a"), tmp.path().join("a/sub/back")).unwrap();

        let output = Scanner::new(ConfigKind::Terraform)
            .scan(&[tmp.path().join("a")], true)
            .unwrap();

        assert_eq!(names(&output), vec!["down", "up"]);
        assert!(output.branch_errors.is_empty());
    }

    #[test]
    fn scan_skips_root_already_reached_through_local_module() {
        let tmp = TempDir::new().unwrap();
        write_module(tmp.path(), "root", &[("shared", "../shared")]);
        write_module(tmp.path(), "shared", &[("leaf", "acme/leaf/aws")]);

        let output = Scanner::new(ConfigKind::Terraform)
            .scan(&[tmp.path().join("root"), tmp.path().join("shared")], true)
            .unwrap();

        assert_eq!(names(&output), vec!["leaf", "shared"]);
    }

    #[test]
    fn scan_fails_for_unreadable_root() {
        let tmp = TempDir::new().unwrap();

        let result = Scanner::new(ConfigKind::Terraform).scan(&[tmp.path().join("nope")], true);

        assert!(matches!(result, Err(ScanError::Root { .. })));
    }

    #[test]
    fn scan_terragrunt_follows_local_sources_as_terraform_modules() {
        let tmp = TempDir::new().unwrap();
        let live = tmp.path().join("live/prod");
        fs::create_dir_all(&live).unwrap();
        fs::write(
            live.join("terragrunt.hcl"),
            "terraform {\n  source = \"../../modules/app\"\n}\n",
        )
        .unwrap();
        write_module(tmp.path(), "modules/app", &[("db", "acme/db/aws")]);

        let output = Scanner::new(ConfigKind::Terragrunt)
            .scan(&[tmp.path().join("live")], true)
            .unwrap();

        assert_eq!(output.records.len(), 2);
        assert!(output.records.iter().any(|r| r.name == "db"));
    }
}

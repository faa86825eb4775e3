//! Module calls with classified source and inferred version data

use semver::Version;

use crate::parser::ModuleCallRecord;
use crate::source::{ClassifyError, Source, classify};
use crate::version::constraint::{ConstraintError, Constraints};
use crate::version::semver::parse_version;

/// Error type for module call parsing
#[derive(Debug, thiserror::Error)]
pub enum ModuleCallError {
    #[error("parse module call source: {0}")]
    Source(#[from] ClassifyError),

    #[error("parse constraint: {0}")]
    Constraint(#[from] ConstraintError),
}

/// A module call with its source classified and its version data inferred
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModuleCall {
    pub source: Source,
    /// Version the call currently pins, when one can be inferred
    pub version: Option<Version>,
    /// Text of the pinned version or git ref; empty when unknown
    pub version_text: String,
    pub constraints: Option<Constraints>,
    /// Constraint as written; empty when unspecified
    pub constraints_text: String,
    pub record: ModuleCallRecord,
}

impl ParsedModuleCall {
    /// Classifies the source of `record` and infers its current version and constraints.
    ///
    /// - git: a `ref` that is a version becomes the current version; a version
    ///   constraint is accepted even though git sources do not normally carry one
    /// - registry: a constraint naming a single version pins that version
    /// - local: never carries version data
    pub fn parse(record: ModuleCallRecord) -> Result<Self, ModuleCallError> {
        let source = classify(&record.source)?;

        let mut parsed = Self {
            source,
            version: None,
            version_text: String::new(),
            constraints: None,
            constraints_text: String::new(),
            record,
        };

        match &parsed.source {
            Source::Git(git) => {
                if let Some(reference) = &git.reference {
                    parsed.version = parse_version(reference);
                    parsed.version_text = reference.clone();
                }
                parsed.set_constraints()?;
            }
            Source::Registry(_) => {
                if let Some(version) = parse_version(&parsed.record.version) {
                    parsed.version = Some(version);
                    parsed.version_text = parsed.record.version.trim().to_string();
                }
                parsed.set_constraints()?;
            }
            Source::Local(_) => {}
        }

        Ok(parsed)
    }

    fn set_constraints(&mut self) -> Result<(), ConstraintError> {
        let raw = self.record.version.trim();
        if raw.is_empty() {
            return Ok(());
        }
        self.constraints = Some(Constraints::parse(raw)?);
        self.constraints_text = raw.to_string();
        Ok(())
    }
}

//! Concurrent update checks over a list of module calls

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{DEFAULT_CONCURRENCY, FETCH_TIMEOUT_MS};
use crate::module_call::{ModuleCallError, ParsedModuleCall};
use crate::parser::ModuleCallRecord;
use crate::version::error::CacheError;
use crate::version::resolver::{UpdateResolver, UpdateResult};

/// Error type for a single module's check
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    ModuleCall(#[from] ModuleCallError),

    #[error("fetch versions: {0}")]
    Resolve(#[from] CacheError),

    #[error("fetch versions: timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u128 },

    #[error("check cancelled")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub include_prerelease: bool,
    /// Modules checked at the same time
    pub concurrency: usize,
    /// Limit for resolving one module
    pub timeout: Duration,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            include_prerelease: false,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_millis(FETCH_TIMEOUT_MS),
        }
    }
}

/// Outcome of checking one module call
#[derive(Debug)]
pub struct ModuleCheck {
    pub record: ModuleCallRecord,
    /// `None` when the module call itself could not be parsed
    pub parsed: Option<ParsedModuleCall>,
    pub result: Result<UpdateResult, CheckError>,
}

impl ModuleCheck {
    fn failed(record: ModuleCallRecord, parsed: Option<ParsedModuleCall>, error: CheckError) -> Self {
        Self {
            record,
            parsed,
            result: Err(error),
        }
    }
}

/// Checks every module call for updates.
///
/// Up to `options.concurrency` modules are resolved at once and results are
/// returned in input order. A failing module is reported in its own
/// [`ModuleCheck`] and never stops the others.
pub async fn check_modules(
    resolver: &UpdateResolver,
    records: Vec<ModuleCallRecord>,
    options: &CheckOptions,
    cancel: &CancellationToken,
) -> Vec<ModuleCheck> {
    stream::iter(records)
        .map(|record| check_module(resolver, record, options, cancel))
        .buffered(options.concurrency.max(1))
        .collect()
        .await
}

async fn check_module(
    resolver: &UpdateResolver,
    record: ModuleCallRecord,
    options: &CheckOptions,
    cancel: &CancellationToken,
) -> ModuleCheck {
    let parsed = match ParsedModuleCall::parse(record.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("{:?} in {:?}: {}", record.name, record.file, e);
            return ModuleCheck::failed(record, None, e.into());
        }
    };

    let resolve = resolver.resolve(
        &parsed.source,
        parsed.version.as_ref(),
        parsed.constraints.as_ref(),
        options.include_prerelease,
    );

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CheckError::Cancelled),
        outcome = tokio::time::timeout(options.timeout, resolve) => match outcome {
            Ok(resolved) => resolved.map_err(CheckError::from),
            Err(_) => Err(CheckError::Timeout {
                timeout_ms: options.timeout.as_millis(),
            }),
        },
    };

    match &result {
        Ok(update) => debug!("{:?}: {:?}", record.name, update),
        Err(e) => warn!("{:?} ({}): {}", record.name, record.source, e),
    }

    ModuleCheck {
        record,
        parsed: Some(parsed),
        result,
    }
}

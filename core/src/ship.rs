//! Bulk fulfillment updates with dry-run/commit semantics.
//!
//! # Design
//! A ship run happens in two steps. `BatchEngine::plan` resolves the target
//! ids (explicit list, then id file, then a live order query, first one
//! given wins), removes duplicates keeping the first occurrence, and freezes
//! the option template. `BatchEngine::run` then either reports the plan
//! (dry run, no network) or submits it.
//!
//! Submission never fails fast. Each item outcome is recorded and the run
//! returns a tally; in the batched strategy the one call's outcome applies
//! to every id it carried. Delays go through `Sleeper` so tests can observe
//! them without waiting.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::credentials::CredentialStore;
use crate::error::{ApiError, ErrorCategory};
use crate::http::HttpExecutor;
use crate::transport::Api;
use crate::types::{IdType, OrdersQuery, ShipmentOptions};

/// Grace period between committing and the first submission.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(5);

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Where the ids to update come from.
#[derive(Debug, Clone, PartialEq)]
pub enum IdSource {
    Explicit(Vec<u64>),
    File(PathBuf),
    Query(OrdersQuery),
}

impl IdSource {
    /// Pick the first available source: explicit ids, then file, then query.
    pub fn select(
        explicit: Vec<u64>,
        file: Option<PathBuf>,
        query: Option<OrdersQuery>,
    ) -> Result<Self, ApiError> {
        if !explicit.is_empty() {
            return Ok(IdSource::Explicit(explicit));
        }
        if let Some(path) = file {
            return Ok(IdSource::File(path));
        }
        query.map(IdSource::Query).ok_or_else(|| {
            ApiError::Input("no ids given: pass ids, an id file, or a band id to query orders".into())
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStrategy {
    /// One `update_shipped` call carrying every item.
    #[default]
    Batched,
    /// One call per id, at least `interval` apart.
    Sequential,
}

impl fmt::Display for SubmitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitStrategy::Batched => write!(f, "batched"),
            SubmitStrategy::Sequential => write!(f, "sequential"),
        }
    }
}

impl FromStr for SubmitStrategy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batched" => Ok(SubmitStrategy::Batched),
            "sequential" => Ok(SubmitStrategy::Sequential),
            other => Err(ApiError::Input(format!(
                "unknown strategy {other:?}, expected \"batched\" or \"sequential\""
            ))),
        }
    }
}

/// How a plan is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipSettings {
    pub commit: bool,
    pub strategy: SubmitStrategy,
    /// Minimum delay between successive calls of the sequential strategy.
    pub interval: Duration,
    pub warmup: Duration,
}

impl Default for ShipSettings {
    fn default() -> Self {
        Self {
            commit: false,
            strategy: SubmitStrategy::Batched,
            interval: Duration::ZERO,
            warmup: DEFAULT_WARMUP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// Distinct ids in order of first occurrence.
    pub ids: Vec<u64>,
    pub options: ShipmentOptions,
    pub settings: ShipSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunReport {
    pub options: ShipmentOptions,
    pub count: usize,
    pub ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub id: u64,
    #[serde(skip)]
    pub category: ErrorCategory,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub strategy: SubmitStrategy,
    pub succeeded: Vec<u64>,
    pub failed: Vec<FailedItem>,
}

impl BatchReport {
    fn new(strategy: SubmitStrategy) -> Self {
        Self {
            strategy,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn record(&mut self, id: u64, outcome: &Result<(), ApiError>) {
        match outcome {
            Ok(()) => self.succeeded.push(id),
            Err(e) => self.failed.push(FailedItem {
                id,
                category: e.category(),
                message: e.to_string(),
            }),
        }
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShipOutcome {
    DryRun(DryRunReport),
    Committed(BatchReport),
}

/// Remove repeated ids, keeping the first occurrence of each.
pub fn dedup_ids(ids: impl IntoIterator<Item = u64>) -> Vec<u64> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Parse the contents of an id file.
///
/// Accepts a JSON array of positive integers, or integers separated by
/// whitespace and/or commas. Duplicates are kept; `plan` removes them.
pub fn parse_id_file(contents: &str) -> Result<Vec<u64>, ApiError> {
    let trimmed = contents.trim();
    let ids: Vec<u64> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
            .map_err(|e| ApiError::Input(format!("id file is not an array of ids: {e}")))?
    } else {
        trimmed
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<u64>()
                    .map_err(|_| ApiError::Input(format!("id file contains a non-integer: {token:?}")))
            })
            .collect::<Result<_, _>>()?
    };
    if ids.contains(&0) {
        return Err(ApiError::Input("ids must be positive".into()));
    }
    Ok(ids)
}

pub struct BatchEngine<'a, S, E, Z = ThreadSleeper> {
    api: &'a Api<S, E>,
    sleeper: Z,
}

impl<'a, S: CredentialStore, E: HttpExecutor> BatchEngine<'a, S, E> {
    pub fn new(api: &'a Api<S, E>) -> Self {
        Self {
            api,
            sleeper: ThreadSleeper,
        }
    }
}

impl<'a, S: CredentialStore, E: HttpExecutor, Z: Sleeper> BatchEngine<'a, S, E, Z> {
    pub fn with_sleeper(api: &'a Api<S, E>, sleeper: Z) -> Self {
        Self { api, sleeper }
    }

    /// Resolve ids from `source`. Only the query source touches the network,
    /// and only the read-only order listing.
    pub fn resolve_ids(&self, source: &IdSource, id_type: IdType) -> Result<Vec<u64>, ApiError> {
        let ids = match source {
            IdSource::Explicit(ids) => {
                if ids.contains(&0) {
                    return Err(ApiError::Input("ids must be positive".into()));
                }
                ids.clone()
            }
            IdSource::File(path) => {
                let contents = fs::read_to_string(path)
                    .map_err(|e| ApiError::Input(format!("cannot read id file {}: {e}", path.display())))?;
                parse_id_file(&contents)?
            }
            IdSource::Query(query) => {
                let orders = self.api.orders(query)?;
                info!(orders = orders.len(), band_id = query.band_id, "orders matched query");
                orders.iter().map(|order| order.id(id_type)).collect()
            }
        };
        Ok(dedup_ids(ids))
    }

    pub fn plan(
        &self,
        source: &IdSource,
        options: ShipmentOptions,
        settings: ShipSettings,
    ) -> Result<BatchPlan, ApiError> {
        let ids = self.resolve_ids(source, options.id_type)?;
        Ok(BatchPlan {
            ids,
            options,
            settings,
        })
    }

    /// Report or submit `plan`. Dry runs make no network call.
    pub fn run(&self, plan: &BatchPlan) -> ShipOutcome {
        if !plan.settings.commit {
            info!(count = plan.ids.len(), "dry run, nothing submitted");
            return ShipOutcome::DryRun(DryRunReport {
                options: plan.options.clone(),
                count: plan.ids.len(),
                ids: plan.ids.clone(),
            });
        }

        let strategy = plan.settings.strategy;
        let mut report = BatchReport::new(strategy);
        if plan.ids.is_empty() {
            info!("no ids to ship");
            return ShipOutcome::Committed(report);
        }

        info!(
            count = plan.ids.len(),
            %strategy,
            warmup_secs = plan.settings.warmup.as_secs_f64(),
            "shipping ids to bandcamp"
        );
        self.sleeper.sleep(plan.settings.warmup);

        match strategy {
            SubmitStrategy::Batched => self.submit_batched(plan, &mut report),
            SubmitStrategy::Sequential => self.submit_sequential(plan, &mut report),
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "ship finished"
        );
        ShipOutcome::Committed(report)
    }

    fn submit_batched(&self, plan: &BatchPlan, report: &mut BatchReport) {
        let items: Vec<_> = plan.ids.iter().map(|&id| plan.options.for_id(id)).collect();
        let outcome = self.api.update_shipped(&items);
        if let Err(e) = &outcome {
            warn!(error = %e, count = items.len(), "batched update rejected");
        }
        for &id in &plan.ids {
            report.record(id, &outcome);
        }
    }

    fn submit_sequential(&self, plan: &BatchPlan, report: &mut BatchReport) {
        for (index, &id) in plan.ids.iter().enumerate() {
            if index > 0 {
                self.sleeper.sleep(plan.settings.interval);
            }
            let outcome = self.api.update_shipped(&[plan.options.for_id(id)]);
            if let Err(e) = &outcome {
                warn!(id, error = %e, "update failed, continuing");
            }
            report.record(id, &outcome);
        }
    }
}

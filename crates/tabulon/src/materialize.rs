//! Incremental materialization of computed entities.
//!
//! A populate pass walks the missing-key set of one computed entity and
//! drives a production callback per key. All inserts are staged in a single
//! transaction, with a savepoint per key: a failing key is unwound without
//! touching the keys staged before it, and the pass commits exactly the
//! successful prefix (fail-fast) or all successes (permissive).
//!
//! Pass lifecycle:
//! `ComputingDiff -> Iterating(key) -> { ok -> next | failed -> Aborted }
//! -> Committing -> Done`, with cancellation checked between keys.

use crate::cancel::CancellationToken;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tabulon_db::{DbError, Key, Row, TabulonDb};
use tabulon_schema::{EntityRegistry, SchemaError, TableSchema};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure of a single production callback invocation.
#[derive(Debug, Error)]
pub enum ProduceError {
    /// The callback decided it cannot produce this key
    #[error("{0}")]
    Failed(String),

    /// A storage error while producing or staging
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// The callback returned a row that does not carry the populate key
    #[error("produced row does not carry key {key}")]
    KeyMismatch { key: Key },
}

impl ProduceError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Pass-level materialization errors.
///
/// Per-key callback failures are not errors at this level - they are
/// accounted inside the [`PopulateReport`] so callers keep run-level
/// accounting even for partially failed passes.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Db(#[from] DbError),

    /// Populate was called on a manual entity
    #[error("entity `{0}` is not computed")]
    NotComputed(String),

    /// The final commit failed; no rows from this pass are persisted
    #[error("commit failed for `{entity}`: {source}")]
    CommitFailed {
        entity: String,
        #[source]
        source: DbError,
    },

    /// A concurrent populate task panicked or was aborted
    #[error("populate task failed: {0}")]
    Task(String),
}

/// What a production callback sees besides the key.
pub struct ProduceContext<'a> {
    db: &'a TabulonDb,
    registry: &'a EntityRegistry,
    entity: &'a str,
}

impl ProduceContext<'_> {
    /// The entity being populated.
    pub fn entity(&self) -> &str {
        self.entity
    }

    pub fn db(&self) -> &TabulonDb {
        self.db
    }

    pub fn registry(&self) -> &EntityRegistry {
        self.registry
    }

    /// All rows of `parent` matching the populate key (restricted to the
    /// parent's own columns).
    pub async fn parent_rows(&self, parent: &str, key: &Key) -> Result<Vec<Row>, ProduceError> {
        let schema = self.registry.schema(parent).map_err(DbError::from)?;
        Ok(self.db.fetch_matching(schema, key).await?)
    }

    /// Exactly one row of `parent` matching the populate key.
    pub async fn parent_row(&self, parent: &str, key: &Key) -> Result<Row, ProduceError> {
        let mut rows = self.parent_rows(parent, key).await?;
        match (rows.pop(), rows.is_empty()) {
            (Some(row), true) => Ok(row),
            (None, _) => Err(ProduceError::failed(format!(
                "no `{parent}` row matches key {key}"
            ))),
            (Some(_), false) => Err(ProduceError::failed(format!(
                "multiple `{parent}` rows match key {key}"
            ))),
        }
    }
}

/// The production callback: the sole extension point for how a computed
/// entity derives its content.
///
/// Given a fully qualified key (all inherited primary-key column values),
/// return the rows to stage for this key. Every returned row must carry the
/// key's column values unchanged. Returning no rows means "legitimately skip
/// this key" and is not a failure; errors are reserved for actual failure.
/// Extra arguments travel as captured state of the implementing value.
#[async_trait]
pub trait Produce: Send + Sync {
    async fn produce(
        &self,
        key: &Key,
        ctx: &ProduceContext<'_>,
    ) -> Result<Vec<Row>, ProduceError>;
}

/// Plain synchronous closures work as callbacks when no parent lookups are
/// needed.
#[async_trait]
impl<F> Produce for F
where
    F: Fn(&Key) -> Result<Vec<Row>, ProduceError> + Send + Sync,
{
    async fn produce(
        &self,
        key: &Key,
        _ctx: &ProduceContext<'_>,
    ) -> Result<Vec<Row>, ProduceError> {
        (self)(key)
    }
}

/// What to do when a key's production fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopulatePolicy {
    /// Stop at the first failure; commit the successful prefix
    #[default]
    FailFast,
    /// Continue past failures, accumulating them; commit all successes
    Permissive,
}

/// Options for a populate pass.
#[derive(Debug, Clone, Default)]
pub struct PopulateOptions {
    pub policy: PopulatePolicy,
    pub cancel: Option<CancellationToken>,
}

impl PopulateOptions {
    /// Explicit opt-in to continue past failing keys.
    pub fn permissive() -> Self {
        Self {
            policy: PopulatePolicy::Permissive,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// How a populate pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PopulateOutcome {
    /// Every missing key was iterated
    Done,
    /// Fail-fast stopped the pass at a failing key
    Aborted,
    /// Cancellation was requested; nothing staged was committed
    Cancelled,
}

/// One per-key failure, in iteration order.
#[derive(Debug, Serialize)]
pub struct KeyFailure {
    pub key: Key,
    #[serde(serialize_with = "error_as_string")]
    pub error: ProduceError,
}

fn error_as_string<S: serde::Serializer>(
    error: &ProduceError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Structured result of a populate pass.
#[derive(Debug, Serialize)]
pub struct PopulateReport {
    /// Keys iterated before completion, abort, or cancellation
    pub attempted: usize,
    /// Callback invocations that completed without failure
    pub succeeded: usize,
    /// Per-key failures, in iteration order
    pub failures: Vec<KeyFailure>,
    pub outcome: PopulateOutcome,
}

impl PopulateReport {
    fn empty() -> Self {
        Self {
            attempted: 0,
            succeeded: 0,
            failures: Vec::new(),
            outcome: PopulateOutcome::Done,
        }
    }

    /// True when the pass iterated every missing key without failures.
    pub fn is_complete(&self) -> bool {
        self.outcome == PopulateOutcome::Done && self.failures.is_empty()
    }
}

/// Drives populate passes over registered computed entities.
pub struct Materializer<'a> {
    db: &'a TabulonDb,
    registry: &'a EntityRegistry,
}

impl<'a> Materializer<'a> {
    pub fn new(db: &'a TabulonDb, registry: &'a EntityRegistry) -> Self {
        Self { db, registry }
    }

    /// Run one populate pass for `entity`.
    ///
    /// Computes the missing-key set, then drives `make` once per key, in key
    /// order, staging everything in a single transaction. See the module docs
    /// for the commit and failure semantics.
    pub async fn populate(
        &self,
        entity: &str,
        make: &dyn Produce,
        options: &PopulateOptions,
    ) -> Result<PopulateReport, MaterializeError> {
        let record = self.registry.get(entity)?;
        if !record.role.is_computed() {
            return Err(MaterializeError::NotComputed(entity.to_string()));
        }
        if record.parents.is_empty() {
            info!(entity, "computed entity has no parents; nothing to populate");
            return Ok(PopulateReport::empty());
        }

        let parents: Vec<&TableSchema> = record
            .parents
            .iter()
            .map(|p| self.registry.schema(p))
            .collect::<Result<_, _>>()?;
        let missing = self.db.missing_keys(&record.schema, &parents).await?;
        info!(entity, missing = missing.len(), "populate pass starting");
        if missing.is_empty() {
            return Ok(PopulateReport::empty());
        }

        let ctx = ProduceContext {
            db: self.db,
            registry: self.registry,
            entity,
        };

        let mut report = PopulateReport::empty();
        let mut tx = self.db.begin().await?;

        for (index, key) in missing.iter().enumerate() {
            if options
                .cancel
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                warn!(entity, attempted = report.attempted, "populate cancelled");
                tx.rollback().await?;
                report.outcome = PopulateOutcome::Cancelled;
                return Ok(report);
            }

            report.attempted += 1;
            let savepoint = format!("produce_{index}");
            tx.savepoint(&savepoint).await?;

            let staged = match make.produce(key, &ctx).await {
                Ok(rows) => self.stage_rows(&mut tx, &record.schema, key, rows).await,
                Err(error) => Err(error),
            };

            match staged {
                Ok(()) => {
                    tx.release(&savepoint).await?;
                    report.succeeded += 1;
                    debug!(entity, %key, "key produced");
                }
                Err(error) => {
                    tx.rollback_to(&savepoint).await?;
                    warn!(entity, %key, %error, "key production failed");
                    report.failures.push(KeyFailure {
                        key: key.clone(),
                        error,
                    });
                    if options.policy == PopulatePolicy::FailFast {
                        report.outcome = PopulateOutcome::Aborted;
                        break;
                    }
                }
            }
        }

        tx.commit()
            .await
            .map_err(|source| MaterializeError::CommitFailed {
                entity: entity.to_string(),
                source,
            })?;

        info!(
            entity,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "populate pass finished"
        );
        Ok(report)
    }

    /// Stage the rows produced for one key inside its savepoint.
    ///
    /// A duplicate-key violation here means another driver produced the key
    /// first; the storage primary-key constraint is the authoritative
    /// deduplication, so that row is skipped as "already produced".
    async fn stage_rows(
        &self,
        tx: &mut tabulon_db::TabulonTx,
        schema: &TableSchema,
        key: &Key,
        rows: Vec<Row>,
    ) -> Result<(), ProduceError> {
        for row in &rows {
            if !key.matches_row(row) {
                return Err(ProduceError::KeyMismatch { key: key.clone() });
            }
            match tx.insert(schema, row).await {
                Ok(()) => {}
                Err(err) if err.is_duplicate_key() => {
                    debug!(table = %schema.table, %key, "key already produced; skipping row");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

/// One entity's worth of work for [`populate_many`].
pub struct PopulateJob {
    pub entity: String,
    pub make: Arc<dyn Produce>,
    pub options: PopulateOptions,
}

impl PopulateJob {
    pub fn new(entity: impl Into<String>, make: Arc<dyn Produce>) -> Self {
        Self {
            entity: entity.into(),
            make,
            options: PopulateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PopulateOptions) -> Self {
        self.options = options;
        self
    }
}

/// Populate several independent computed entities concurrently.
///
/// Cross-entity production is embarrassingly parallel: each pass owns its own
/// transaction and the entities' key spaces are disjoint by construction.
/// Results are returned sorted by entity name.
pub async fn populate_many(
    db: &TabulonDb,
    registry: Arc<EntityRegistry>,
    jobs: Vec<PopulateJob>,
) -> Result<Vec<(String, PopulateReport)>, MaterializeError> {
    let mut set = tokio::task::JoinSet::new();
    for job in jobs {
        let db = db.clone();
        let registry = Arc::clone(&registry);
        set.spawn(async move {
            let materializer = Materializer::new(&db, &registry);
            let report = materializer
                .populate(&job.entity, job.make.as_ref(), &job.options)
                .await;
            (job.entity, report)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (entity, report) = joined.map_err(|e| MaterializeError::Task(e.to_string()))?;
        results.push((entity, report?));
    }
    results.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(results)
}

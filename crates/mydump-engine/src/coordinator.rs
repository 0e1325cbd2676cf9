//! Parallel dump coordination
//!
//! A dump request is planned into [`DumpTarget`]s, each a list of schemas
//! plus one sink. Targets run concurrently on a [`JoinSet`], at most
//! `parallelism` at a time; a target's own schemas run one after another.

use std::io::{BufWriter, Write};
use std::sync::Arc;

use mydump_core::{Connector, DumpOptions};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::dump::{DumpSummary, SchemaSummary, dump_schema_in_snapshot};
use crate::error::DumpError;
use crate::render::Renderer;
use crate::schemas::{list_user_schemas, validate_schema_name};

const SINK_BUFFER_BYTES: usize = 64 * 1024;

/// Schemas dumped, in order, into one sink
pub struct DumpTarget {
    pub schemas: Vec<String>,
    pub writer: Box<dyn Write + Send>,
}

impl DumpTarget {
    pub fn new(schemas: Vec<String>, writer: impl Write + Send + 'static) -> Self {
        Self {
            schemas,
            writer: Box::new(writer),
        }
    }
}

impl std::fmt::Debug for DumpTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpTarget")
            .field("schemas", &self.schemas)
            .finish_non_exhaustive()
    }
}

struct TargetOutcome {
    index: usize,
    schemas: Vec<SchemaSummary>,
    error: Option<DumpError>,
}

/// Runs dump targets against one server
pub struct DumpCoordinator {
    connector: Arc<dyn Connector>,
    options: DumpOptions,
}

impl DumpCoordinator {
    pub fn new(connector: Arc<dyn Connector>, options: DumpOptions) -> Self {
        Self { connector, options }
    }

    /// Pair schemas with sinks.
    ///
    /// An empty schema list means every non-system schema. One sink receives
    /// all schemas; otherwise each schema needs a sink of its own.
    pub async fn plan(
        &self,
        schemas: Vec<String>,
        sinks: Vec<Box<dyn Write + Send>>,
    ) -> Result<Vec<DumpTarget>, DumpError> {
        if sinks.is_empty() {
            return Err(DumpError::Configuration("at least one sink is required".into()));
        }
        for schema in &schemas {
            validate_schema_name(schema)?;
        }

        let schemas = if schemas.is_empty() {
            list_user_schemas(self.connector.as_ref()).await?
        } else {
            schemas
        };

        if sinks.len() == 1 {
            let writer = sinks
                .into_iter()
                .next()
                .ok_or_else(|| DumpError::Configuration("at least one sink is required".into()))?;
            return Ok(vec![DumpTarget { schemas, writer }]);
        }

        if sinks.len() != schemas.len() {
            return Err(DumpError::Configuration(format!(
                "{} sinks cannot be paired with {} schemas",
                sinks.len(),
                schemas.len()
            )));
        }

        Ok(schemas
            .into_iter()
            .zip(sinks)
            .map(|(schema, writer)| DumpTarget {
                schemas: vec![schema],
                writer,
            })
            .collect())
    }

    /// Plan and run in one step
    pub async fn dump(
        &self,
        schemas: Vec<String>,
        sinks: Vec<Box<dyn Write + Send>>,
    ) -> Result<DumpSummary, DumpError> {
        self.options.validate()?;
        let targets = self.plan(schemas, sinks).await?;
        self.run(targets).await
    }

    /// Run every target and wait for all of them.
    ///
    /// A failing schema stops its own target only. Every failure is collected
    /// into one [`DumpError::Aggregate`].
    #[tracing::instrument(skip_all, fields(targets = targets.len(), parallelism = self.options.parallelism))]
    pub async fn run(&self, targets: Vec<DumpTarget>) -> Result<DumpSummary, DumpError> {
        self.options.validate()?;
        for target in &targets {
            for schema in &target.schemas {
                validate_schema_name(schema)?;
            }
        }

        let renderer = Arc::new(Renderer::new(self.options.compact)?);
        let total = targets.len();
        let semaphore = Arc::new(Semaphore::new(self.options.parallelism.min(total.max(1))));
        let mut jobs = JoinSet::new();

        for (index, target) in targets.into_iter().enumerate() {
            let connector = Arc::clone(&self.connector);
            let renderer = Arc::clone(&renderer);
            let semaphore = Arc::clone(&semaphore);
            let options = self.options.clone();

            jobs.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return TargetOutcome {
                            index,
                            schemas: Vec::new(),
                            error: Some(DumpError::Worker(e.to_string())),
                        };
                    }
                };
                run_target(index, connector.as_ref(), target, &options, &renderer).await
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        let mut errors = Vec::new();
        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => errors.push(DumpError::Worker(e.to_string())),
            }
        }
        outcomes.sort_by_key(|o| o.index);

        let mut summary = DumpSummary::default();
        for outcome in outcomes {
            summary.schemas.extend(outcome.schemas);
            if let Some(error) = outcome.error {
                errors.push(error);
            }
        }

        if errors.is_empty() {
            tracing::info!(
                schemas = summary.schemas.len(),
                rows = summary.total_rows(),
                "dump finished"
            );
            Ok(summary)
        } else {
            tracing::error!(failed = errors.len(), total, "dump finished with errors");
            Err(DumpError::Aggregate { total, errors })
        }
    }
}

async fn run_target(
    index: usize,
    connector: &dyn Connector,
    target: DumpTarget,
    options: &DumpOptions,
    renderer: &Renderer,
) -> TargetOutcome {
    let DumpTarget { schemas, writer } = target;
    // Sinks are synchronous; batch writes so the worker blocks on them rarely
    let mut writer = BufWriter::with_capacity(SINK_BUFFER_BYTES, writer);
    let mut outcome = TargetOutcome {
        index,
        schemas: Vec::new(),
        error: None,
    };

    for schema in &schemas {
        match dump_schema_in_snapshot(connector, schema, options, renderer, &mut writer).await {
            Ok(summary) => outcome.schemas.push(summary),
            Err(e) => {
                tracing::error!(schema = %schema, error = %e, "schema dump failed");
                if let Err(flush_error) = writer.flush() {
                    tracing::warn!(schema = %schema, error = %flush_error, "failed to flush sink after dump error");
                }
                outcome.error = Some(DumpError::Schema {
                    schema: schema.clone(),
                    source: Box::new(e),
                });
                return outcome;
            }
        }
    }

    if let Err(e) = writer.flush() {
        outcome.error = Some(e.into());
    }
    outcome
}

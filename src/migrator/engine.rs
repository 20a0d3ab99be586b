//! Per-series migration loop

use super::config::MigrationConfig;
use super::strategy::TransferStrategy;
use super::window::WindowWalker;
use super::MigrationError;
use crate::metrics;
use crate::resume::{CheckpointStore, ProgressKey};
use crate::store::SeriesStore;
use crate::TimeWindow;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Result of asking the store whether a window holds rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowProbe {
    /// The window holds this many rows
    Rows(u64),
    /// The window is empty; the series is drained
    Empty,
    /// The probe failed; nothing is known about the window
    Unknown,
}

/// Totals of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Series listed by the source
    pub series_total: usize,
    /// Series skipped because they were already checkpointed
    pub skipped: usize,
    /// Series drained and checkpointed during this run
    pub completed: usize,
    /// Series left unfinished (retried on the next run)
    pub incomplete: usize,
    /// Windows handed to the strategy successfully
    pub windows_transferred: u64,
    /// Windows whose transfer failed and were dropped
    pub windows_failed: u64,
    /// Rows written or copied
    pub rows_transferred: u64,
}

enum SeriesOutcome {
    Drained,
    Interrupted,
}

/// Drives a [`TransferStrategy`] over every series of one source database
pub struct MigrationEngine<S: SeriesStore> {
    store: Arc<S>,
    source: String,
    config: MigrationConfig,
    checkpoints: CheckpointStore,
}

impl<S: SeriesStore> MigrationEngine<S> {
    /// Create an engine reading from `store`, checkpointed under `source`
    pub fn new(store: Arc<S>, source: impl Into<String>, config: MigrationConfig) -> Self {
        let checkpoints = CheckpointStore::new(config.state_dir.clone());
        Self {
            store,
            source: source.into(),
            config,
            checkpoints,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Checkpoint key for runs of this engine with `strategy`
    pub fn progress_key(&self, strategy: &dyn TransferStrategy) -> ProgressKey {
        ProgressKey::new(self.source.clone(), strategy.target_label())
    }

    /// Migrate every series not yet checkpointed for this source/target pair.
    ///
    /// Fails only when the series cannot be listed or the checkpoint cannot
    /// be loaded or saved.
    pub async fn run(
        &self,
        strategy: &mut dyn TransferStrategy,
    ) -> Result<RunSummary, MigrationError> {
        self.config.validate().map_err(MigrationError::InvalidConfig)?;

        let key = self.progress_key(strategy);
        let span = info_span!("migration_run", source = %key.source(), target = %key.target());

        async move {
            let series_list = self.store.list_series().await.map_err(|e| {
                error!(error = %e, "Failed to list series");
                e
            })?;
            let mut completed = self.checkpoints.load_or_default(&key)?;
            info!(
                series = series_list.len(),
                completed = completed.len(),
                "Loaded progress"
            );

            let mut summary = RunSummary {
                series_total: series_list.len(),
                ..RunSummary::default()
            };

            for (idx, series) in series_list.iter().enumerate() {
                if completed.contains(series) {
                    info!(series = %series, "Series already processed, skipping");
                    summary.skipped += 1;
                    continue;
                }

                info!(
                    series = %series,
                    "Processing series ({}/{})",
                    idx + 1,
                    series_list.len()
                );

                let outcome = self
                    .migrate_series(series, strategy, &mut summary)
                    .instrument(info_span!("migrate_series", series = %series))
                    .await;

                match outcome {
                    SeriesOutcome::Drained => {
                        completed.insert(series.as_str());
                        self.checkpoints.save(&key, &completed)?;
                        metrics::record_series_completed(key.target());
                        summary.completed += 1;
                    }
                    SeriesOutcome::Interrupted => {
                        summary.incomplete += 1;
                    }
                }
            }

            info!(
                completed = summary.completed,
                skipped = summary.skipped,
                incomplete = summary.incomplete,
                windows = summary.windows_transferred,
                rows = summary.rows_transferred,
                "Migration run finished"
            );
            Ok::<_, MigrationError>(summary)
        }
        .instrument(span)
        .await
    }

    async fn migrate_series(
        &self,
        series: &str,
        strategy: &mut dyn TransferStrategy,
        summary: &mut RunSummary,
    ) -> SeriesOutcome {
        let latest = match self.store.latest_timestamp(series).await {
            Ok(Some(latest)) => latest,
            Ok(None) => {
                info!("Series has no data");
                return SeriesOutcome::Drained;
            }
            Err(e) => {
                warn!(error = %e, "Failed to query latest timestamp, treating series as exhausted");
                return SeriesOutcome::Drained;
            }
        };

        if let Err(e) = strategy.begin_series(series, latest).await {
            error!(error = %e, "Failed to start series");
            return SeriesOutcome::Interrupted;
        }

        let target = strategy.target_label();
        let mut walker = WindowWalker::new(latest, self.config.window_hours, self.config.hours_limit);
        let mut outcome = SeriesOutcome::Drained;
        let mut ran_out_of_data = false;

        for window in walker.by_ref() {
            let rows = match self.probe_window(series, &window).await {
                WindowProbe::Rows(rows) => rows,
                WindowProbe::Empty => {
                    debug!(window = %window, "No rows in window, series drained");
                    ran_out_of_data = true;
                    break;
                }
                WindowProbe::Unknown => {
                    outcome = SeriesOutcome::Interrupted;
                    break;
                }
            };

            debug!(window = %window, rows, "Window has rows");
            match strategy
                .transfer_window(&*self.store, series, &window)
                .await
            {
                Ok(report) => {
                    summary.windows_transferred += 1;
                    summary.rows_transferred += report.rows;
                    metrics::record_window_transferred(&target, report.rows);
                }
                Err(e) => {
                    error!(window = %window, error = %e, "Window transfer failed, dropping window");
                    summary.windows_failed += 1;
                    metrics::record_window_failed(&target);
                }
            }

            if !self.config.window_pause.is_zero() {
                tokio::time::sleep(self.config.window_pause).await;
            }
        }

        if matches!(outcome, SeriesOutcome::Drained) && !ran_out_of_data && walker.limit_reached() {
            info!(hours = walker.hours_consumed(), "Hours limit reached");
        }

        if let Err(e) = strategy.finish_series(series).await {
            warn!(error = %e, "Failed to finish series");
        }

        outcome
    }

    async fn probe_window(&self, series: &str, window: &TimeWindow) -> WindowProbe {
        match self.store.count_in_range(series, window).await {
            Ok(0) => WindowProbe::Empty,
            Ok(rows) => WindowProbe::Rows(rows),
            Err(e) => {
                warn!(
                    window = %window,
                    error = %e,
                    "Window probe failed, leaving series for the next run"
                );
                metrics::record_probe_failure(series);
                WindowProbe::Unknown
            }
        }
    }
}

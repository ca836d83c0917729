//! Concurrent analysis of many events.

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::calculator::ProbabilityCalculator;
use super::context::{AnalysisContext, InvalidContext};
use super::result::AnalysisResult;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("batch worker failed: {0}")]
    Worker(String),
}

#[derive(Debug)]
pub struct BatchItem {
    pub id: String,
    pub outcome: Result<AnalysisResult, InvalidContext>,
}

#[derive(Debug)]
pub struct BatchReport {
    /// Completed analyses, in the order they were submitted.
    pub items: Vec<BatchItem>,
    /// Analyses abandoned because the batch was cancelled.
    pub cancelled: usize,
}

/// Runs calculations on the blocking pool, at most `concurrency` at a time.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    calculator: Arc<ProbabilityCalculator>,
    concurrency: usize,
}

impl BatchRunner {
    pub fn new(calculator: Arc<ProbabilityCalculator>, concurrency: usize) -> Self {
        Self {
            calculator,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run(&self, contexts: Vec<(String, AnalysisContext)>) -> Result<BatchReport, BatchError> {
        let (_keep_open, cancel) = watch::channel(false);
        self.run_until_cancelled(contexts, cancel).await
    }

    /// Like [`Self::run`], but stops handing out work once `cancel` reads
    /// `true`. Finished analyses are kept; the rest are counted as cancelled.
    pub async fn run_until_cancelled(
        &self,
        contexts: Vec<(String, AnalysisContext)>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<BatchReport, BatchError> {
        let total = contexts.len();
        if *cancel.borrow_and_update() {
            return Ok(BatchReport {
                items: Vec::new(),
                cancelled: total,
            });
        }

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        for (position, (id, context)) in contexts.into_iter().enumerate() {
            let calculator = Arc::clone(&self.calculator);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|err| BatchError::Worker(err.to_string()))?;
                let outcome = tokio::task::spawn_blocking(move || calculator.calculate(&context))
                    .await
                    .map_err(|err| BatchError::Worker(err.to_string()))?;
                Ok::<_, BatchError>((position, BatchItem { id, outcome }))
            });
        }

        let mut finished: Vec<(usize, BatchItem)> = Vec::with_capacity(total);
        let mut cancel_open = true;
        let mut cancelled = false;
        loop {
            tokio::select! {
                changed = cancel.changed(), if cancel_open => match changed {
                    Ok(()) if *cancel.borrow_and_update() => {
                        warn!(remaining = tasks.len(), "batch cancelled");
                        tasks.abort_all();
                        cancelled = true;
                        break;
                    }
                    Ok(()) => {}
                    Err(_) => cancel_open = false,
                },
                joined = tasks.join_next() => match joined {
                    Some(Ok(item)) => finished.push(item?),
                    Some(Err(err)) if err.is_cancelled() => {}
                    Some(Err(err)) => return Err(BatchError::Worker(err.to_string())),
                    None => break,
                },
            }
        }

        if cancelled {
            while let Some(joined) = tasks.join_next().await {
                if let Ok(Ok(item)) = joined {
                    finished.push(item);
                }
            }
        }

        finished.sort_by_key(|(position, _)| *position);
        let items: Vec<BatchItem> = finished.into_iter().map(|(_, item)| item).collect();
        let cancelled = total - items.len();
        info!(completed = items.len(), cancelled, "batch finished");
        Ok(BatchReport { items, cancelled })
    }
}

//! Concurrent batch translation.
//!
//! [`BatchDispatcher`] spawns one tokio task per input text and hands back a
//! [`PendingBatch`] whose units are indexed by input position.
//! [`ResultAggregator`] joins those units into a single [`BatchOutcome`]:
//! either every translation in input order, or one failure for the whole
//! batch.

mod aggregate;
mod dispatch;

use crate::translate::ProviderError;
use tokio::task::JoinError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use aggregate::ResultAggregator;
pub use dispatch::BatchDispatcher;

const LOG_TARGET: &str = "translator::batch";

#[derive(thiserror::Error, Debug)]
pub enum UnitError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("unit of work was cancelled")]
    Cancelled,
    #[error("unit of work panicked")]
    Panicked,
}

impl From<JoinError> for UnitError {
    fn from(e: JoinError) -> Self {
        if e.is_panic() {
            UnitError::Panicked
        } else {
            UnitError::Cancelled
        }
    }
}

/// The failure reported for a batch, tagged with the input index it came
/// from.
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub error: UnitError,
}

#[derive(Debug)]
pub enum BatchOutcome {
    Success(Vec<String>),
    Failure(BatchFailure),
}

impl BatchOutcome {
    pub fn into_result(self) -> Result<Vec<String>, BatchFailure> {
        match self {
            BatchOutcome::Success(texts) => Ok(texts),
            BatchOutcome::Failure(failure) => Err(failure),
        }
    }
}

/// One spawned unit of work; `index` is the slot its result belongs to.
pub struct PendingUnit {
    index: usize,
    handle: JoinHandle<Result<String, UnitError>>,
}

impl PendingUnit {
    pub fn index(&self) -> usize {
        self.index
    }

    async fn finish(self) -> (usize, Result<String, UnitError>) {
        let result = match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(UnitError::from(e)),
        };
        (self.index, result)
    }
}

/// Units spawned for one batch, plus the token that stops all of them.
pub struct PendingBatch {
    units: Vec<PendingUnit>,
    cancel: CancellationToken,
}

impl PendingBatch {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[PendingUnit] {
        &self.units
    }

    /// Asks every unit that has not finished yet to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

use super::{BatchFailure, BatchOutcome, PendingBatch, UnitError, LOG_TARGET};
use crate::config::FailurePolicy;
use futures::stream::{FuturesUnordered, StreamExt};

#[derive(Clone, Copy, Debug, Default)]
pub struct ResultAggregator {
    policy: FailurePolicy,
}

impl ResultAggregator {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    /// Waits for the batch and reconciles it into one outcome. Every unit
    /// has finished by the time this returns, under either policy.
    pub async fn join(&self, pending: PendingBatch) -> BatchOutcome {
        if pending.is_empty() {
            return BatchOutcome::Success(Vec::new());
        }
        match self.policy {
            FailurePolicy::WaitAll => join_all(pending).await,
            FailurePolicy::FailFast => join_fail_fast(pending).await,
        }
    }
}

async fn join_all(pending: PendingBatch) -> BatchOutcome {
    let PendingBatch { units, .. } = pending;
    let mut slots: Vec<Option<Result<String, UnitError>>> =
        std::iter::repeat_with(|| None).take(units.len()).collect();

    let finished = futures::future::join_all(units.into_iter().map(|u| u.finish())).await;
    for (index, result) in finished {
        slots[index] = Some(result);
    }

    let mut texts = Vec::with_capacity(slots.len());
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(Ok(text)) => texts.push(text),
            Some(Err(error)) => return failed(index, error),
            None => return failed(index, UnitError::Cancelled),
        }
    }
    BatchOutcome::Success(texts)
}

async fn join_fail_fast(pending: PendingBatch) -> BatchOutcome {
    let PendingBatch { units, cancel } = pending;
    let mut slots: Vec<Option<String>> = std::iter::repeat_with(|| None).take(units.len()).collect();

    let mut in_flight: FuturesUnordered<_> = units.into_iter().map(|u| u.finish()).collect();
    while let Some((index, result)) = in_flight.next().await {
        match result {
            Ok(text) => slots[index] = Some(text),
            Err(error) => {
                cancel.cancel();
                // Siblings stop at their next suspension point; reap them so
                // none outlives the batch.
                while in_flight.next().await.is_some() {}
                return failed(index, error);
            }
        }
    }

    BatchOutcome::Success(slots.into_iter().map(Option::unwrap_or_default).collect())
}

fn failed(index: usize, error: UnitError) -> BatchOutcome {
    tracing::warn!(target: LOG_TARGET, index, error = %error, "batch item failed");
    BatchOutcome::Failure(BatchFailure { index, error })
}

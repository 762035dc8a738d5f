use super::{PendingBatch, PendingUnit, UnitError, LOG_TARGET};
use crate::config::DispatchPolicy;
use crate::lang::LanguagePair;
use crate::translate::Translator;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, Default)]
pub struct BatchDispatcher {
    policy: DispatchPolicy,
}

impl BatchDispatcher {
    pub fn new(policy: DispatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Spawns one unit per text. Unit `i` translates `texts[i]` and its
    /// result stays tied to index `i` whatever order the units finish in.
    ///
    /// Must be called from within a tokio runtime. Cancelling `cancel` stops
    /// every unit at its next suspension point.
    pub fn dispatch<P>(
        &self,
        provider: &Arc<P>,
        texts: Vec<String>,
        pair: Arc<LanguagePair>,
        cancel: CancellationToken,
    ) -> PendingBatch
    where
        P: Translator + ?Sized + 'static,
    {
        let limiter = self
            .policy
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n.get())));

        tracing::debug!(
            target: LOG_TARGET,
            items = texts.len(),
            pair = %pair,
            max_concurrency = ?self.policy.max_concurrency,
            "dispatching batch"
        );

        let units = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let provider = Arc::clone(provider);
                let pair = Arc::clone(&pair);
                let limiter = limiter.clone();
                let cancel = cancel.clone();
                let handle = tokio::spawn(async move {
                    let _permit = match limiter {
                        Some(sem) => match cancel.run_until_cancelled(sem.acquire_owned()).await {
                            Some(Ok(permit)) => Some(permit),
                            _ => return Err(UnitError::Cancelled),
                        },
                        None => None,
                    };
                    match cancel
                        .run_until_cancelled(provider.translate(text, &pair))
                        .await
                    {
                        Some(result) => result.map_err(UnitError::from),
                        None => Err(UnitError::Cancelled),
                    }
                });
                PendingUnit { index, handle }
            })
            .collect();

        PendingBatch { units, cancel }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ResultAggregator;
    use crate::test_support::StubTranslator;
    use std::num::NonZeroUsize;

    fn pair() -> Arc<LanguagePair> {
        Arc::new(LanguagePair::parse("en", "de").expect("valid"))
    }

    #[tokio::test]
    async fn one_unit_per_text_in_index_order() {
        let provider = Arc::new(StubTranslator::new());
        let texts: Vec<String> = (0..5).map(|i| format!("{}|w{i}", 10 * (5 - i))).collect();
        let pending =
            BatchDispatcher::default().dispatch(&provider, texts, pair(), CancellationToken::new());

        assert_eq!(pending.len(), 5);
        let indices: Vec<usize> = pending.units().iter().map(PendingUnit::index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);

        let out = ResultAggregator::default()
            .join(pending)
            .await
            .into_result()
            .expect("success");
        assert_eq!(out, vec!["de:w0", "de:w1", "de:w2", "de:w3", "de:w4"]);
    }

    #[tokio::test]
    async fn empty_input_spawns_nothing() {
        let provider = Arc::new(StubTranslator::new());
        let pending = BatchDispatcher::default().dispatch(
            &provider,
            Vec::new(),
            pair(),
            CancellationToken::new(),
        );
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn max_concurrency_bounds_provider_calls_in_flight() {
        let stub = StubTranslator::new();
        let provider = Arc::new(stub.clone());
        let policy = DispatchPolicy {
            max_concurrency: NonZeroUsize::new(2),
            ..DispatchPolicy::default()
        };
        let texts: Vec<String> = (0..8).map(|i| format!("20|w{i}")).collect();
        let pending =
            BatchDispatcher::new(policy).dispatch(&provider, texts, pair(), CancellationToken::new());

        let out = ResultAggregator::new(policy.on_failure)
            .join(pending)
            .await
            .into_result()
            .expect("success");
        assert_eq!(out.len(), 8);
        assert_eq!(out[7], "de:w7");
        assert_eq!(stub.calls(), 8);
        assert!(stub.max_in_flight() <= 2);
    }

    #[tokio::test]
    async fn cancelling_pending_batch_stops_waiting_units() {
        let stub = StubTranslator::new();
        let provider = Arc::new(stub.clone());
        let policy = DispatchPolicy {
            max_concurrency: NonZeroUsize::new(1),
            ..DispatchPolicy::default()
        };
        let texts = vec!["2000|a".to_owned(), "2000|b".to_owned()];
        let pending =
            BatchDispatcher::new(policy).dispatch(&provider, texts, pair(), CancellationToken::new());

        pending.cancel();
        let outcome = ResultAggregator::default().join(pending).await;
        assert!(outcome.into_result().is_err());
        assert_eq!(stub.completed(), 0);
    }
}

use crate::batch::{BatchDispatcher, BatchFailure, ResultAggregator, UnitError};
use crate::config::DispatchPolicy;
use crate::lang::{LangError, LanguagePair};
use crate::translate::{ProviderError, Translator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "translator::service";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchTranslationRequest {
    pub texts: Vec<String>,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslateResponse {
    pub translated_text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchTranslateResponse {
    pub translated_texts: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum TranslationError {
    #[error(transparent)]
    InvalidLanguageTag(#[from] LangError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("batch item {index} was aborted")]
    UnitAborted { index: usize },
    #[error("request cancelled")]
    Cancelled,
}

impl From<BatchFailure> for TranslationError {
    fn from(failure: BatchFailure) -> Self {
        match failure.error {
            UnitError::Provider(e) => TranslationError::Provider(e),
            UnitError::Cancelled => TranslationError::Cancelled,
            UnitError::Panicked => TranslationError::UnitAborted {
                index: failure.index,
            },
        }
    }
}

/// Entry point for the `Translate` and `BatchTranslate` operations.
///
/// Nothing is cached; every call goes to the provider.
pub struct TranslationService<P: ?Sized> {
    provider: Arc<P>,
    dispatcher: BatchDispatcher,
    aggregator: ResultAggregator,
}

impl<P: ?Sized> Clone for TranslationService<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            dispatcher: self.dispatcher.clone(),
            aggregator: self.aggregator,
        }
    }
}

impl<P> TranslationService<P>
where
    P: Translator + ?Sized + 'static,
{
    pub fn new(provider: Arc<P>, policy: DispatchPolicy) -> Self {
        Self {
            provider,
            dispatcher: BatchDispatcher::new(policy),
            aggregator: ResultAggregator::new(policy.on_failure),
        }
    }

    pub async fn translate(&self, req: TranslationRequest) -> Result<String, TranslationError> {
        self.translate_with_cancel(req, CancellationToken::new())
            .await
    }

    pub async fn translate_with_cancel(
        &self,
        req: TranslationRequest,
        cancel: CancellationToken,
    ) -> Result<String, TranslationError> {
        let pair = LanguagePair::parse(&req.source_lang, &req.target_lang)?;
        tracing::debug!(target: LOG_TARGET, pair = %pair, chars = req.text.len(), "translate");

        match cancel
            .run_until_cancelled(self.provider.translate(req.text, &pair))
            .await
        {
            Some(result) => Ok(result?),
            None => Err(TranslationError::Cancelled),
        }
    }

    pub async fn batch_translate(
        &self,
        req: BatchTranslationRequest,
    ) -> Result<Vec<String>, TranslationError> {
        self.batch_translate_with_cancel(req, CancellationToken::new())
            .await
    }

    /// Translates every text or none of them. The language pair is validated
    /// once, before any unit is spawned.
    pub async fn batch_translate_with_cancel(
        &self,
        req: BatchTranslationRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<String>, TranslationError> {
        let pair = Arc::new(LanguagePair::parse(&req.source_lang, &req.target_lang)?);
        let items = req.texts.len();

        // A child token lets a fail-fast batch stop its own units without
        // cancelling the caller.
        let pending =
            self.dispatcher
                .dispatch(&self.provider, req.texts, Arc::clone(&pair), cancel.child_token());
        let texts = self.aggregator.join(pending).await.into_result()?;

        tracing::debug!(target: LOG_TARGET, pair = %pair, items, "batch translated");
        Ok(texts)
    }
}

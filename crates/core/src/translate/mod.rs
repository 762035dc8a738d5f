mod deepl;
mod echo;
mod google;

use crate::config::{ConfigError, ProviderKind, ServiceConfig};
use crate::lang::LanguagePair;
use futures::future::BoxFuture;
use std::sync::Arc;

pub use deepl::DeepLTranslator;
pub use echo::EchoTranslator;
pub use google::GoogleTranslator;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("unsupported language pair {0}")]
    UnsupportedLanguage(String),
}

/// A text-to-text translation capability.
///
/// Implementations perform exactly one remote call per invocation and never
/// retry; the caller decides what a failure means for the request.
pub trait Translator: Send + Sync {
    fn translate<'a>(
        &'a self,
        text: String,
        pair: &'a LanguagePair,
    ) -> BoxFuture<'a, Result<String, ProviderError>>;
}

impl<T: Translator + ?Sized> Translator for Arc<T> {
    fn translate<'a>(
        &'a self,
        text: String,
        pair: &'a LanguagePair,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        (**self).translate(text, pair)
    }
}

impl<T: Translator + ?Sized> Translator for Box<T> {
    fn translate<'a>(
        &'a self,
        text: String,
        pair: &'a LanguagePair,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        (**self).translate(text, pair)
    }
}

pub fn build_translator(cfg: &ServiceConfig) -> Result<Arc<dyn Translator>, ConfigError> {
    let translator: Arc<dyn Translator> = match cfg.provider {
        ProviderKind::Google => Arc::new(GoogleTranslator::new()),
        ProviderKind::DeepL => {
            let key = cfg
                .api_keys
                .deepl
                .as_ref()
                .ok_or(ConfigError::MissingApiKey("deepl"))?;
            Arc::new(DeepLTranslator::new(key.expose().to_owned()))
        }
        ProviderKind::Echo => Arc::new(EchoTranslator::new()),
    };
    Ok(translator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiKeys};

    #[test]
    fn deepl_requires_api_key() {
        let cfg = ServiceConfig {
            provider: ProviderKind::DeepL,
            ..ServiceConfig::default()
        };
        let err = build_translator(&cfg).err().expect("missing key");
        assert_eq!(err, ConfigError::MissingApiKey("deepl"));

        let cfg = ServiceConfig {
            provider: ProviderKind::DeepL,
            api_keys: ApiKeys {
                deepl: Some(ApiKey::new("secret:fx").expect("valid")),
            },
            ..ServiceConfig::default()
        };
        assert!(build_translator(&cfg).is_ok());
    }

    #[tokio::test]
    async fn boxed_and_shared_translators_delegate() {
        let pair = LanguagePair::parse("en", "ja").expect("valid");

        let boxed: Box<dyn Translator> = Box::new(EchoTranslator::new());
        assert_eq!(boxed.translate("hi".into(), &pair).await.unwrap(), "hi");

        let shared: Arc<dyn Translator> = Arc::new(EchoTranslator::new());
        assert_eq!(shared.translate("yo".into(), &pair).await.unwrap(), "yo");
    }
}

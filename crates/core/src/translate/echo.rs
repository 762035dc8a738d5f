use crate::lang::LanguagePair;
use crate::translate::{ProviderError, Translator};
use futures::future::BoxFuture;
use futures::FutureExt;

/// Returns every input unchanged. Useful for wiring checks without network
/// access.
#[derive(Clone)]
pub struct EchoTranslator;

impl EchoTranslator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EchoTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for EchoTranslator {
    fn translate<'a>(
        &'a self,
        text: String,
        _pair: &'a LanguagePair,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        async move { Ok(text) }.boxed()
    }
}

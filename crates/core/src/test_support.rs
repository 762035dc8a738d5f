use crate::lang::LanguagePair;
use crate::translate::{ProviderError, Translator};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted provider for tests.
///
/// Input `"<delay_ms>|<word>"` sleeps for the delay, then answers
/// `"<target>:<word>"`; a word starting with `!` fails with that word as the
/// message and `panic` panics. Inputs without a `|` answer immediately.
#[derive(Clone, Default)]
pub struct StubTranslator {
    pub stats: Arc<StubStats>,
}

#[derive(Default)]
pub struct StubStats {
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl StubTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.stats.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.stats.completed.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }
}

fn split(text: &str) -> (u64, &str) {
    match text.split_once('|') {
        Some((ms, word)) => (ms.parse().unwrap_or(0), word),
        None => (0, text),
    }
}

impl Translator for StubTranslator {
    fn translate<'a>(
        &'a self,
        text: String,
        pair: &'a LanguagePair,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        async move {
            let stats = &self.stats;
            stats.calls.fetch_add(1, Ordering::SeqCst);
            let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let (delay_ms, word) = split(&text);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            stats.in_flight.fetch_sub(1, Ordering::SeqCst);
            stats.completed.fetch_add(1, Ordering::SeqCst);

            if word == "panic" {
                panic!("stub translator asked to panic");
            }
            if let Some(msg) = word.strip_prefix('!') {
                return Err(ProviderError::InvalidResponse(msg.to_owned()));
            }
            Ok(format!("{}:{}", pair.target, word))
        }
        .boxed()
    }
}

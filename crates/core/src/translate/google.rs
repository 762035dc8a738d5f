use crate::lang::{LanguagePair, LanguageTag};
use crate::translate::{ProviderError, Translator};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, Url};
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";
const AUTO_DETECT: &str = "auto";

/// Client for the keyless Google Translate web endpoint (`client=gtx`).
#[derive(Clone)]
pub struct GoogleTranslator {
    client: Client,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_url(&self, text: &str, pair: &LanguagePair) -> Result<Url, ProviderError> {
        let source = if pair.source.is_undetermined() {
            AUTO_DETECT.to_owned()
        } else {
            lang_code(&pair.source)
        };
        let target = lang_code(&pair.target);
        Url::parse_with_params(
            &format!("{}/translate_a/single", self.base_url),
            &[
                ("client", "gtx"),
                ("sl", source.as_str()),
                ("tl", target.as_str()),
                ("dt", "t"),
                ("q", text),
            ],
        )
        .map_err(|e| ProviderError::InvalidResponse(format!("bad endpoint url: {e}")))
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

/// Google keys its languages on `lang` or `lang-REGION` (`zh-TW`, `pt-BR`),
/// so scripts, variants and extensions are dropped.
fn lang_code(tag: &LanguageTag) -> String {
    match tag.region() {
        Some(region) => format!("{}-{}", tag.language(), region),
        None => tag.language().to_owned(),
    }
}

/// The endpoint answers with nested arrays; the first element holds one
/// `[translated, original, ...]` entry per sentence.
fn parse_segments(body: &Value) -> Result<String, ProviderError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidResponse("missing sentence list".to_owned()))?;

    let mut out = String::new();
    for segment in segments {
        if let Some(piece) = segment.get(0).and_then(Value::as_str) {
            out.push_str(piece);
        }
    }
    Ok(out)
}

impl Translator for GoogleTranslator {
    fn translate<'a>(
        &'a self,
        text: String,
        pair: &'a LanguagePair,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        async move {
            if pair.target.is_undetermined() {
                return Err(ProviderError::UnsupportedLanguage(pair.to_string()));
            }
            // The endpoint returns no sentence list at all for empty input.
            if text.is_empty() {
                return Ok(text);
            }

            let url = self.request_url(&text, pair)?;
            let response = self.client.get(url).send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_owned());
                return Err(ProviderError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse JSON: {e}")))?;
            parse_segments(&body)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn joins_sentence_segments() {
        let body = serde_json::json!([
            [["Hallo. ", "Hello. ", null, null, 10], ["Wie geht's?", "How are you?", null, null, 10]],
            null,
            "en"
        ]);
        assert_eq!(parse_segments(&body).unwrap(), "Hallo. Wie geht's?");
    }

    #[test]
    fn rejects_body_without_sentences() {
        let body = serde_json::json!({ "error": "nope" });
        assert!(matches!(
            parse_segments(&body),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn lang_codes_keep_region_but_drop_variants() {
        let tag = |s: &str| LanguageTag::parse(s).expect("valid");
        assert_eq!(lang_code(&tag("zh-TW")), "zh-TW");
        assert_eq!(lang_code(&tag("zh-Hant-TW")), "zh-TW");
        assert_eq!(lang_code(&tag("ja")), "ja");
        assert_eq!(lang_code(&tag("sl-Latn-IT-nedis")), "sl-IT");
        assert_eq!(lang_code(&tag("de-1996")), "de");
        assert_eq!(lang_code(&tag("en-US-u-ca-buddhist")), "en-US");
    }

    #[tokio::test]
    async fn translates_through_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("client", "gtx"))
            .and(query_param("sl", "auto"))
            .and(query_param("tl", "ja"))
            .and(query_param("q", "good morning"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                [["おはよう", "good morning", null, null, 1]],
                null,
                "en"
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new().with_base_url(server.uri());
        let pair = LanguagePair::parse("und", "ja").expect("valid");
        let out = translator
            .translate("good morning".into(), &pair)
            .await
            .unwrap();
        assert_eq!(out, "おはよう");
    }

    #[tokio::test]
    async fn empty_text_skips_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new().with_base_url(server.uri());
        let pair = LanguagePair::parse("en", "ja").expect("valid");
        assert_eq!(translator.translate(String::new(), &pair).await.unwrap(), "");
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new().with_base_url(server.uri());
        let pair = LanguagePair::parse("en", "fr").expect("valid");
        let err = translator.translate("hi".into(), &pair).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 429, .. }));
    }
}

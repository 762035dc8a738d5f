use crate::lang::{LanguagePair, LanguageTag};
use crate::translate::{ProviderError, Translator};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const FREE_API_URL: &str = "https://api-free.deepl.com";
const PRO_API_URL: &str = "https://api.deepl.com";

#[derive(Clone)]
pub struct DeepLTranslator {
    client: Client,
    api_key: String,
    base_url: String,
}

impl DeepLTranslator {
    pub fn new(api_key: String) -> Self {
        // Free-tier keys carry a ":fx" suffix and live on a separate host.
        let base_url = if api_key.ends_with(":fx") {
            FREE_API_URL
        } else {
            PRO_API_URL
        };
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct DeepLRequest<'a> {
    text: [&'a str; 1],
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
}

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// DeepL only knows a handful of regional targets; everything else is the
/// bare upper-cased language.
fn target_code(tag: &LanguageTag) -> String {
    match tag.as_str().to_lowercase().as_str() {
        "pt-br" => "PT-BR".to_owned(),
        "pt-pt" => "PT-PT".to_owned(),
        "en-gb" => "EN-GB".to_owned(),
        "en-us" => "EN-US".to_owned(),
        _ => tag.language().to_uppercase(),
    }
}

fn source_code(tag: &LanguageTag) -> Option<String> {
    if tag.is_undetermined() {
        None
    } else {
        Some(tag.language().to_uppercase())
    }
}

impl Translator for DeepLTranslator {
    fn translate<'a>(
        &'a self,
        text: String,
        pair: &'a LanguagePair,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        async move {
            if pair.target.is_undetermined() {
                return Err(ProviderError::UnsupportedLanguage(pair.to_string()));
            }

            let request = DeepLRequest {
                text: [text.as_str()],
                target_lang: target_code(&pair.target),
                source_lang: source_code(&pair.source),
            };

            let response = self
                .client
                .post(format!("{}/v2/translate", self.base_url))
                .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
                .json(&request)
                .send()
                .await?;

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

            let deepl_response: DeepLResponse = response.json().await.map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse JSON: {e}"))
            })?;

            deepl_response
                .translations
                .into_iter()
                .next()
                .map(|t| t.text)
                .ok_or_else(|| {
                    ProviderError::InvalidResponse("No translations in response".to_owned())
                })
        }
        .boxed()
    }
}

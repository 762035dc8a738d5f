//! Anki vocabulary decks: word pairs in, `Front,Back,POS,Tags` CSV out.

use crate::service::{BatchTranslationRequest, TranslationError, TranslationService};
use crate::translate::Translator;
use std::io::{Read, Write};

const LOG_TARGET: &str = "translator::anki";

pub const DEFAULT_DECK_TAG: &str = "vocab3kyu";
pub const DECK_HEADER: [&str; 4] = ["Front", "Back", "POS", "Tags"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordPair {
    pub front: String,
    pub back: String,
}

#[derive(thiserror::Error, Debug)]
pub enum AnkiError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("translating deck backs failed: {0}")]
    Translation(#[from] TranslationError),
}

/// Languages used to rewrite every card's back before the deck is written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackTranslation {
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeckOptions {
    pub tag: String,
    pub translate_back: Option<BackTranslation>,
}

impl Default for DeckOptions {
    fn default() -> Self {
        Self {
            tag: DEFAULT_DECK_TAG.to_owned(),
            translate_back: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deck {
    pub cards: Vec<WordPair>,
    pub tag: String,
}

impl Deck {
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Header row first, then one row per card with an empty part of speech.
    pub fn write_csv<W: Write>(&self, output: W) -> Result<(), AnkiError> {
        let mut writer = csv::Writer::from_writer(output);
        writer.write_record(DECK_HEADER)?;
        for card in &self.cards {
            writer.write_record([card.front.as_str(), card.back.as_str(), "", self.tag.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Reads `front,back` rows. Extra columns are ignored; rows missing either
/// side are skipped, as is a leading `Front,Back` header.
pub fn read_word_pairs<R: Read>(input: R) -> Result<Vec<WordPair>, AnkiError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut pairs = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let front = record.get(0).unwrap_or_default();
        let back = record.get(1).unwrap_or_default();
        if front.is_empty() || back.is_empty() {
            tracing::debug!(target: LOG_TARGET, row, "skipping incomplete row");
            continue;
        }
        if row == 0 && front.eq_ignore_ascii_case("front") && back.eq_ignore_ascii_case("back") {
            continue;
        }
        pairs.push(WordPair {
            front: front.to_owned(),
            back: back.to_owned(),
        });
    }
    Ok(pairs)
}

/// Reads the word list and, when asked, replaces every back with its
/// translation. All backs go out as one batch, so either every card is
/// translated or the deck is not built.
pub async fn build_deck<P, R>(
    service: &TranslationService<P>,
    input: R,
    options: &DeckOptions,
) -> Result<Deck, AnkiError>
where
    P: Translator + ?Sized + 'static,
    R: Read,
{
    let mut cards = read_word_pairs(input)?;

    if let Some(langs) = &options.translate_back {
        let backs = service
            .batch_translate(BatchTranslationRequest {
                texts: cards.iter().map(|c| c.back.clone()).collect(),
                source_lang: langs.source_lang.clone(),
                target_lang: langs.target_lang.clone(),
            })
            .await?;
        for (card, back) in cards.iter_mut().zip(backs) {
            card.back = back;
        }
        tracing::info!(
            target: LOG_TARGET,
            cards = cards.len(),
            target_lang = %langs.target_lang,
            "deck backs translated"
        );
    }

    Ok(Deck {
        cards,
        tag: options.tag.clone(),
    })
}

use reqwest::{blocking::Client, Url};
use serde_json::Value;
use std::time::Duration;

use crate::{
  db::{models::DictionaryEntry, now_millis, DictionaryRepository},
  domain::required_text,
  FLError,
};

pub const DEFAULT_TRANSLATE_URL: &str = "https://api.mymemory.translated.net";
pub const DEFAULT_PRONOUNCE_URL: &str = "https://api.dictionaryapi.dev";
const LANGUAGE_PAIR: &str = "en|vi";

/// External source of translations and pronunciation audio.
pub trait DictionaryProvider: Send + Sync {
  /// Translated meaning of an already normalized word. An empty string means
  /// the provider knows no translation.
  fn translate(&self, word: &str) -> Result<String, FLError>;

  /// URL of a pronunciation recording, if the provider has one.
  fn pronunciation(&self, word: &str) -> Result<Option<String>, FLError>;
}

/// Talks to MyMemory for translations and dictionaryapi.dev for audio.
pub struct HttpDictionary {
  client: Client,
  translate_url: String,
  pronounce_url: String,
}

impl HttpDictionary {
  pub fn new(timeout: Duration, translate_url: &str, pronounce_url: &str) -> Result<Self, FLError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(HttpDictionary {
      client,
      translate_url: translate_url.trim_end_matches('/').to_string(),
      pronounce_url: pronounce_url.to_string(),
    })
  }

  fn entries_url(&self, word: &str) -> Result<Url, FLError> {
    let mut url =
      Url::parse(&self.pronounce_url).map_err(|err| FLError::External(err.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|_| FLError::External(format!("Unusable base URL: {}", self.pronounce_url)))?
      .pop_if_empty()
      .extend(&["api", "v2", "entries", "en", word]);
    Ok(url)
  }
}

impl DictionaryProvider for HttpDictionary {
  fn translate(&self, word: &str) -> Result<String, FLError> {
    let response = self
      .client
      .get(&format!("{}/get", self.translate_url))
      .query(&[("q", word), ("langpair", LANGUAGE_PAIR)])
      .send()?;
    if !response.status().is_success() {
      return Err(FLError::External(format!(
        "Translation provider answered {}",
        response.status()
      )));
    }
    let body: Value = response.json()?;
    Ok(translated_text(&body).unwrap_or_default())
  }

  fn pronunciation(&self, word: &str) -> Result<Option<String>, FLError> {
    let response = self.client.get(self.entries_url(word)?).send()?;
    if !response.status().is_success() {
      debug!("No dictionary entry for {} ({})", word, response.status());
      return Ok(None);
    }
    let body: Value = response.json()?;
    Ok(first_audio(&body))
  }
}

/// `responseData.translatedText` of a MyMemory reply.
pub fn translated_text(body: &Value) -> Option<String> {
  body
    .get("responseData")?
    .get("translatedText")?
    .as_str()
    .map(str::to_string)
}

/// First non-empty `audio` among the phonetics of the first dictionaryapi.dev
/// entry.
pub fn first_audio(body: &Value) -> Option<String> {
  body
    .as_array()?
    .first()?
    .get("phonetics")?
    .as_array()?
    .iter()
    .filter_map(|phonetic| phonetic.get("audio").and_then(Value::as_str))
    .find(|audio| !audio.is_empty())
    .map(str::to_string)
}

pub fn normalize(word: &str) -> String {
  word.trim().to_lowercase()
}

/// Checks a word submitted to the lookup endpoint and returns it normalized.
pub fn validate_word(word: &str) -> Result<String, FLError> {
  required_text(word, "Word", 200).map(|w| normalize(&w))
}

/// Lookup-or-fetch-and-store in front of a [`DictionaryProvider`]. Every
/// failure degrades to an empty value.
pub struct DictionaryCache<'a> {
  provider: &'a dyn DictionaryProvider,
}

impl<'a> DictionaryCache<'a> {
  pub fn new(provider: &'a dyn DictionaryProvider) -> Self {
    DictionaryCache { provider }
  }

  pub fn lookup_meaning<S: DictionaryRepository>(&self, store: &mut S, word: &str) -> String {
    let word = normalize(word);
    if word.is_empty() {
      return String::new();
    }

    match store.entry_by_word(&word) {
      Ok(Some(entry)) => {
        info!("Cache hit for word: {}", word);
        return entry.meaning;
      }
      Ok(None) => info!("Cache miss for word: {}", word),
      Err(err) => {
        error!("Dictionary cache unavailable for {}: {}", word, err);
        return String::new();
      }
    }

    let meaning = match self.provider.translate(&word) {
      Ok(meaning) => meaning,
      Err(err) => {
        warn!("Translation of {} failed: {}", word, err);
        return String::new();
      }
    };
    if meaning.is_empty() {
      return meaning;
    }

    let entry = DictionaryEntry {
      id: 0,
      word: word.clone(),
      meaning: meaning.clone(),
      cached_at: now_millis(),
    };
    match store.add(entry) {
      Ok(_) => info!("Cached new word: {}", word),
      Err(err) => warn!("Could not cache {}: {}", word, err),
    }
    meaning
  }

  pub fn fetch_audio_url(&self, word: &str) -> Option<String> {
    let word = normalize(word);
    if word.is_empty() {
      return None;
    }
    match self.provider.pronunciation(&word) {
      Ok(audio) => audio,
      Err(err) => {
        warn!("Pronunciation lookup for {} failed: {}", word, err);
        None
      }
    }
  }
}

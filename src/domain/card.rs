use crate::{
  db::{
    models::{Deck, Flashcard},
    now_millis, Repository, Store,
  },
  domain::{
    deck::can_view,
    dictionary::{DictionaryCache, DictionaryProvider},
    load, Caller,
  },
  FLError,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardRequest {
  pub id: Option<i32>,
  pub deck_id: i32,
  pub term: String,
  pub definition: String,
  pub example: Option<String>,
  pub image_url: Option<String>,
  pub audio_url: Option<String>,
}

fn require_term(term: &str) -> Result<String, FLError> {
  let term = term.trim();
  if term.is_empty() {
    return Err(FLError::argument("Term is required"));
  }
  Ok(term.to_string())
}

fn deck_of<S: Store>(store: &mut S, card: &Flashcard) -> Result<Deck, FLError> {
  load(store, card.deck_id)
}

/// Unlike decks, a card the caller may not see is reported as forbidden.
pub fn get<S: Store>(store: &mut S, id: i32, caller: &Caller) -> Result<Flashcard, FLError> {
  let card: Flashcard = load(store, id)?;
  let deck = deck_of(store, &card)?;
  if !can_view(&deck, caller) {
    return Err(FLError::unauthorized("This flashcard belongs to a private deck"));
  }
  Ok(card)
}

fn writable_deck<S: Store>(store: &mut S, deck_id: i32, caller: &Caller) -> Result<Deck, FLError> {
  let deck = Repository::<Deck>::get(store, deck_id)?
    .ok_or_else(|| FLError::invalid("Deck does not exist"))?;
  if !caller.may_modify(deck.user_id) {
    return Err(FLError::unauthorized("Only the deck owner may add flashcards"));
  }
  Ok(deck)
}

/// The audio URL a new card gets: the one supplied, else whatever the
/// pronunciation dictionary knows, else an empty string. Never fails.
pub fn resolve_audio(provider: &dyn DictionaryProvider, request: &FlashcardRequest) -> String {
  match &request.audio_url {
    Some(url) if !url.trim().is_empty() => url.clone(),
    _ => {
      let term = request.term.trim();
      if term.is_empty() {
        return String::new();
      }
      debug!("Looking up pronunciation for {}", term);
      DictionaryCache::new(provider)
        .fetch_audio_url(term)
        .unwrap_or_default()
    }
  }
}

/// Missing audio is looked up in the pronunciation dictionary. The lookup
/// never makes creation fail.
pub fn create<S: Store>(
  store: &mut S,
  provider: &dyn DictionaryProvider,
  request: FlashcardRequest,
  caller: &Caller,
) -> Result<Flashcard, FLError> {
  writable_deck(store, request.deck_id, caller)?;
  require_term(&request.term)?;
  let audio_url = resolve_audio(provider, &request);
  create_with_audio(store, request, audio_url, caller)
}

/// Like [`create`], for callers that resolved the audio beforehand.
pub fn create_with_audio<S: Store>(
  store: &mut S,
  request: FlashcardRequest,
  audio_url: String,
  caller: &Caller,
) -> Result<Flashcard, FLError> {
  let deck = writable_deck(store, request.deck_id, caller)?;
  let term = require_term(&request.term)?;

  let card = Repository::<Flashcard>::add(
    store,
    Flashcard {
      id: 0,
      deck_id: deck.id,
      term,
      definition: request.definition,
      example: Some(request.example.unwrap_or_default()),
      image_url: Some(request.image_url.unwrap_or_default()),
      audio_url: Some(audio_url),
      created_at: now_millis(),
    },
  )?;
  Ok(card)
}

/// Only the term, definition, example and image can change.
pub fn update<S: Store>(
  store: &mut S,
  id: i32,
  request: FlashcardRequest,
  caller: &Caller,
) -> Result<(), FLError> {
  if request.id != Some(id) {
    return Err(FLError::argument("Flashcard id does not match the request path"));
  }
  let mut card: Flashcard = load(store, id)?;
  let deck = deck_of(store, &card)?;
  if !caller.may_modify(deck.user_id) {
    return Err(FLError::unauthorized("Only the deck owner may edit flashcards"));
  }

  card.term = require_term(&request.term)?;
  card.definition = request.definition;
  card.example = Some(request.example.unwrap_or_default());
  card.image_url = Some(request.image_url.unwrap_or_default());
  Repository::<Flashcard>::update(store, &card)?;
  Ok(())
}

pub fn delete<S: Store>(store: &mut S, id: i32, caller: &Caller) -> Result<(), FLError> {
  let card: Flashcard = load(store, id)?;
  let deck = deck_of(store, &card)?;
  if !caller.may_modify(deck.user_id) {
    return Err(FLError::unauthorized("Only the deck owner may delete flashcards"));
  }
  Repository::<Flashcard>::delete(store, &card)?;
  Ok(())
}

use std::collections::HashMap;

use crate::{
  db::{
    models::{Deck, Flashcard, Folder},
    now_millis, Repository, Store,
  },
  domain::{load, optional_text, required_text, Caller},
  FLError,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckRequest {
  pub title: String,
  pub description: Option<String>,
  #[serde(default)]
  pub is_public: bool,
  pub folder_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckResponse {
  pub id: i32,
  pub title: String,
  pub description: String,
  pub is_public: bool,
  pub created_at: i64,
  pub user_id: i32,
  pub folder_id: Option<i32>,
  pub flashcard_count: i64,
}

impl DeckResponse {
  fn new(deck: Deck, flashcard_count: i64) -> Self {
    DeckResponse {
      id: deck.id,
      title: deck.title,
      description: deck.description,
      is_public: deck.is_public,
      created_at: deck.created_at,
      user_id: deck.user_id,
      folder_id: deck.folder_id,
      flashcard_count,
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckDetail {
  #[serde(flatten)]
  pub deck: DeckResponse,
  pub flashcards: Vec<Flashcard>,
}

struct ValidDeck {
  title: String,
  description: String,
  is_public: bool,
  folder_id: Option<i32>,
}

fn validate(request: DeckRequest) -> Result<ValidDeck, FLError> {
  Ok(ValidDeck {
    title: required_text(&request.title, "Title", 200)?,
    description: optional_text(request.description.as_deref(), "Description", 1000)?
      .unwrap_or_default(),
    is_public: request.is_public,
    folder_id: request.folder_id,
  })
}

/// Owner, public deck, or admin.
pub fn can_view(deck: &Deck, caller: &Caller) -> bool {
  deck.is_public || caller.may_modify(deck.user_id)
}

/// The folder has to exist and belong to the caller, unless `any_owner` is set.
fn check_folder<S: Store>(
  store: &mut S,
  folder_id: Option<i32>,
  caller: &Caller,
  any_owner: bool,
) -> Result<(), FLError> {
  if let Some(folder_id) = folder_id {
    let folder = Repository::<Folder>::get(store, folder_id)?
      .ok_or_else(|| FLError::invalid("Folder does not exist"))?;
    if folder.user_id != caller.user_id && !any_owner {
      return Err(FLError::unauthorized("Folder belongs to another user"));
    }
  }
  Ok(())
}

/// Decks annotated with their flashcard counts, in the given order.
pub fn with_counts<S: Store>(
  store: &mut S,
  decks: Vec<Deck>,
) -> Result<Vec<DeckResponse>, FLError> {
  let ids: Vec<i32> = decks.iter().map(|d| d.id).collect();
  let counts: HashMap<i32, i64> = store.card_counts(&ids)?;
  Ok(
    decks
      .into_iter()
      .map(|deck| {
        let count = counts.get(&deck.id).cloned().unwrap_or(0);
        DeckResponse::new(deck, count)
      })
      .collect(),
  )
}

pub fn list_for_user<S: Store>(
  store: &mut S,
  caller: &Caller,
) -> Result<Vec<DeckResponse>, FLError> {
  let decks = store.decks_visible_to(caller.user_id, caller.is_admin())?;
  with_counts(store, decks)
}

/// Decks the caller may not see are reported as missing.
pub fn get_by_id<S: Store>(store: &mut S, id: i32, caller: &Caller) -> Result<DeckDetail, FLError> {
  let deck: Deck = load(store, id)?;
  if !can_view(&deck, caller) {
    return Err(FLError::NotFound);
  }
  let flashcards = store.cards_in_deck(deck.id)?;
  let count = flashcards.len() as i64;
  Ok(DeckDetail {
    deck: DeckResponse::new(deck, count),
    flashcards,
  })
}

pub fn create<S: Store>(
  store: &mut S,
  request: DeckRequest,
  caller: &Caller,
) -> Result<DeckResponse, FLError> {
  let valid = validate(request)?;
  check_folder(store, valid.folder_id, caller, false)?;

  let deck = Repository::<Deck>::add(
    store,
    Deck {
      id: 0,
      title: valid.title,
      description: valid.description,
      is_public: valid.is_public,
      user_id: caller.user_id,
      folder_id: valid.folder_id,
      created_at: now_millis(),
    },
  )?;
  info!("User {} created deck {}", caller.user_id, deck.id);
  Ok(DeckResponse::new(deck, 0))
}

/// Admins may edit any deck and file it into any existing folder. Owners are
/// limited to their own folders.
pub fn update<S: Store>(
  store: &mut S,
  id: i32,
  request: DeckRequest,
  caller: &Caller,
) -> Result<(), FLError> {
  let mut deck: Deck = load(store, id)?;
  if !caller.may_modify(deck.user_id) {
    return Err(FLError::unauthorized("Only the owner may edit this deck"));
  }
  let valid = validate(request)?;
  check_folder(store, valid.folder_id, caller, caller.is_admin())?;

  deck.title = valid.title;
  deck.description = valid.description;
  deck.is_public = valid.is_public;
  deck.folder_id = valid.folder_id;
  Repository::<Deck>::update(store, &deck)?;
  Ok(())
}

/// Flashcards and study sessions of the deck go with it.
pub fn delete<S: Store>(store: &mut S, id: i32, caller: &Caller) -> Result<(), FLError> {
  let deck: Deck = load(store, id)?;
  if !caller.may_modify(deck.user_id) {
    return Err(FLError::unauthorized("Only the owner may delete this deck"));
  }
  Repository::<Deck>::delete(store, &deck)?;
  info!("Deck {} deleted by user {}", deck.id, caller.user_id);
  Ok(())
}

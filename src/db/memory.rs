use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{
  models::{Deck, DictionaryEntry, Entity, Flashcard, Folder, StudySession, User},
  Backend, DeckRepository, DictionaryRepository, FlashcardRepository, FolderRepository,
  Repository, Store, StoreError, StoreResult, StudySessionRepository, UserRepository,
};
use crate::FLError;

/// Volatile store that keeps every table in process memory. Clones share the
/// same tables. Foreign keys, cascades and unique constraints follow the SQL
/// schema.
#[derive(Clone, Default)]
pub struct MemoryStore {
  tables: Arc<Mutex<Tables>>,
}

#[derive(Clone, Default)]
pub struct Tables {
  next_id: i32,
  users: Vec<User>,
  folders: Vec<Folder>,
  decks: Vec<Deck>,
  flashcards: Vec<Flashcard>,
  study_sessions: Vec<StudySession>,
  dictionary_entries: Vec<DictionaryEntry>,
}

/// Binds an entity kind to its table inside [`Tables`], plus the integrity
/// rules the SQL schema declares for it.
pub trait Table: Entity + Sized {
  fn rows(tables: &Tables) -> &Vec<Self>;
  fn rows_mut(tables: &mut Tables) -> &mut Vec<Self>;

  /// Checks foreign keys and unique constraints before `row` is written.
  fn check(_tables: &Tables, _row: &Self) -> StoreResult<()> {
    Ok(())
  }

  /// Applies the effects of deleting `row` on dependent tables.
  fn cascade(_tables: &mut Tables, _row: &Self) -> StoreResult<()> {
    Ok(())
  }
}

fn conflict(message: &str) -> StoreError {
  StoreError::Conflict(message.to_string())
}

impl Table for User {
  fn rows(tables: &Tables) -> &Vec<Self> {
    &tables.users
  }

  fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
    &mut tables.users
  }

  fn check(tables: &Tables, row: &Self) -> StoreResult<()> {
    if tables
      .users
      .iter()
      .any(|u| u.id != row.id && u.email == row.email)
    {
      return Err(conflict("users.email must be unique"));
    }
    Ok(())
  }

  fn cascade(tables: &mut Tables, row: &Self) -> StoreResult<()> {
    let owned: Vec<Deck> = tables
      .decks
      .iter()
      .filter(|d| d.user_id == row.id)
      .cloned()
      .collect();
    for deck in &owned {
      Deck::cascade(tables, deck)?;
    }
    tables.decks.retain(|d| d.user_id != row.id);
    tables.folders.retain(|f| f.user_id != row.id);
    if tables.study_sessions.iter().any(|s| s.user_id == row.id) {
      return Err(conflict("study_sessions still reference this user"));
    }
    Ok(())
  }
}

impl Table for Folder {
  fn rows(tables: &Tables) -> &Vec<Self> {
    &tables.folders
  }

  fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
    &mut tables.folders
  }

  fn check(tables: &Tables, row: &Self) -> StoreResult<()> {
    if !tables.users.iter().any(|u| u.id == row.user_id) {
      return Err(conflict("folders.user_id references a missing user"));
    }
    if tables
      .folders
      .iter()
      .any(|f| f.id != row.id && f.user_id == row.user_id && f.name == row.name)
    {
      return Err(conflict("folder names must be unique per owner"));
    }
    Ok(())
  }

  fn cascade(tables: &mut Tables, row: &Self) -> StoreResult<()> {
    for deck in tables
      .decks
      .iter_mut()
      .filter(|d| d.folder_id == Some(row.id))
    {
      deck.folder_id = None;
    }
    Ok(())
  }
}

impl Table for Deck {
  fn rows(tables: &Tables) -> &Vec<Self> {
    &tables.decks
  }

  fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
    &mut tables.decks
  }

  fn check(tables: &Tables, row: &Self) -> StoreResult<()> {
    if !tables.users.iter().any(|u| u.id == row.user_id) {
      return Err(conflict("decks.user_id references a missing user"));
    }
    if let Some(folder_id) = row.folder_id {
      if !tables.folders.iter().any(|f| f.id == folder_id) {
        return Err(conflict("decks.folder_id references a missing folder"));
      }
    }
    Ok(())
  }

  fn cascade(tables: &mut Tables, row: &Self) -> StoreResult<()> {
    tables.flashcards.retain(|c| c.deck_id != row.id);
    tables.study_sessions.retain(|s| s.deck_id != row.id);
    Ok(())
  }
}

impl Table for Flashcard {
  fn rows(tables: &Tables) -> &Vec<Self> {
    &tables.flashcards
  }

  fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
    &mut tables.flashcards
  }

  fn check(tables: &Tables, row: &Self) -> StoreResult<()> {
    if !tables.decks.iter().any(|d| d.id == row.deck_id) {
      return Err(conflict("flashcards.deck_id references a missing deck"));
    }
    Ok(())
  }
}

impl Table for StudySession {
  fn rows(tables: &Tables) -> &Vec<Self> {
    &tables.study_sessions
  }

  fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
    &mut tables.study_sessions
  }

  fn check(tables: &Tables, row: &Self) -> StoreResult<()> {
    if !tables.users.iter().any(|u| u.id == row.user_id) {
      return Err(conflict("study_sessions.user_id references a missing user"));
    }
    if !tables.decks.iter().any(|d| d.id == row.deck_id) {
      return Err(conflict("study_sessions.deck_id references a missing deck"));
    }
    Ok(())
  }
}

impl Table for DictionaryEntry {
  fn rows(tables: &Tables) -> &Vec<Self> {
    &tables.dictionary_entries
  }

  fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
    &mut tables.dictionary_entries
  }

  fn check(tables: &Tables, row: &Self) -> StoreResult<()> {
    if tables
      .dictionary_entries
      .iter()
      .any(|e| e.id != row.id && e.word == row.word)
    {
      return Err(conflict("dictionary_entries.word must be unique"));
    }
    Ok(())
  }
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Tables> {
    self.tables.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn select<T, F>(&self, keep: F) -> Vec<T>
  where
    T: Table,
    F: Fn(&T) -> bool,
  {
    T::rows(&self.lock())
      .iter()
      .filter(|row| keep(*row))
      .cloned()
      .collect()
  }
}

fn newest_first<T, K: Ord>(rows: &mut [T], key: impl Fn(&T) -> (K, i32)) {
  rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

impl<T: Table> Repository<T> for MemoryStore {
  fn get(&mut self, id: i32) -> StoreResult<Option<T>> {
    Ok(T::rows(&self.lock()).iter().find(|row| row.id() == id).cloned())
  }

  fn list(&mut self) -> StoreResult<Vec<T>> {
    Ok(T::rows(&self.lock()).clone())
  }

  fn find(&mut self, predicate: &dyn Fn(&T) -> bool) -> StoreResult<Vec<T>> {
    Ok(self.select(|row: &T| predicate(row)))
  }

  fn add(&mut self, mut item: T) -> StoreResult<T> {
    let mut tables = self.lock();
    tables.next_id += 1;
    item.assign_id(tables.next_id);
    T::check(&tables, &item)?;
    T::rows_mut(&mut tables).push(item.clone());
    Ok(item)
  }

  fn update(&mut self, item: &T) -> StoreResult<()> {
    let mut tables = self.lock();
    if !T::rows(&tables).iter().any(|row| row.id() == item.id()) {
      return Err(StoreError::Missing);
    }
    T::check(&tables, item)?;
    if let Some(row) = T::rows_mut(&mut tables)
      .iter_mut()
      .find(|row| row.id() == item.id())
    {
      *row = item.clone();
    }
    Ok(())
  }

  fn delete(&mut self, item: &T) -> StoreResult<()> {
    let mut tables = self.lock();
    let mut draft = tables.clone();
    let rows = T::rows_mut(&mut draft);
    let before = rows.len();
    rows.retain(|row| row.id() != item.id());
    if rows.len() == before {
      return Err(StoreError::Missing);
    }
    T::cascade(&mut draft, item)?;
    *tables = draft;
    Ok(())
  }

  fn exists(&mut self, id: i32) -> StoreResult<bool> {
    Ok(T::rows(&self.lock()).iter().any(|row| row.id() == id))
  }

  fn count(&mut self) -> StoreResult<i64> {
    Ok(T::rows(&self.lock()).len() as i64)
  }
}

impl UserRepository for MemoryStore {
  fn user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
    Ok(self.select(|u: &User| u.email == email).into_iter().next())
  }

  fn users_by_name(&mut self) -> StoreResult<Vec<User>> {
    let mut users: Vec<User> = self.select(|_: &User| true);
    users.sort_by(|a, b| (&a.username, a.id).cmp(&(&b.username, b.id)));
    Ok(users)
  }

  fn users_by_ids(&mut self, ids: &[i32]) -> StoreResult<Vec<User>> {
    Ok(self.select(|u: &User| ids.contains(&u.id)))
  }
}

impl DeckRepository for MemoryStore {
  fn decks_visible_to(&mut self, user_id: i32, is_admin: bool) -> StoreResult<Vec<Deck>> {
    let mut decks = self.select(|d: &Deck| is_admin || d.user_id == user_id || d.is_public);
    newest_first(&mut decks, |d| (d.created_at, d.id));
    Ok(decks)
  }

  fn decks_in_folder(&mut self, folder_id: i32) -> StoreResult<Vec<Deck>> {
    let mut decks = self.select(|d: &Deck| d.folder_id == Some(folder_id));
    newest_first(&mut decks, |d| (d.created_at, d.id));
    Ok(decks)
  }

  fn unassigned_decks(&mut self, user_id: i32) -> StoreResult<Vec<Deck>> {
    let mut decks = self.select(|d: &Deck| d.user_id == user_id && d.folder_id.is_none());
    newest_first(&mut decks, |d| (d.created_at, d.id));
    Ok(decks)
  }

  fn decks_by_ids(&mut self, ids: &[i32]) -> StoreResult<Vec<Deck>> {
    Ok(self.select(|d: &Deck| ids.contains(&d.id)))
  }

  fn deck_count_of(&mut self, user_id: i32) -> StoreResult<i64> {
    Ok(self.select(|d: &Deck| d.user_id == user_id).len() as i64)
  }

  fn deck_counts_by_folder(&mut self, folder_ids: &[i32]) -> StoreResult<HashMap<i32, i64>> {
    let mut counts = HashMap::new();
    for deck in self.select(|d: &Deck| d.folder_id.map_or(false, |f| folder_ids.contains(&f))) {
      if let Some(folder_id) = deck.folder_id {
        *counts.entry(folder_id).or_insert(0) += 1;
      }
    }
    Ok(counts)
  }
}

impl FolderRepository for MemoryStore {
  fn folders_owned_by(&mut self, user_id: i32) -> StoreResult<Vec<Folder>> {
    let mut folders = self.select(|f: &Folder| f.user_id == user_id);
    newest_first(&mut folders, |f| (f.created_at, f.id));
    Ok(folders)
  }

  fn folder_by_name(&mut self, user_id: i32, name: &str) -> StoreResult<Option<Folder>> {
    Ok(
      self
        .select(|f: &Folder| f.user_id == user_id && f.name == name)
        .into_iter()
        .next(),
    )
  }
}

impl FlashcardRepository for MemoryStore {
  fn cards_in_deck(&mut self, deck_id: i32) -> StoreResult<Vec<Flashcard>> {
    let mut cards = self.select(|c: &Flashcard| c.deck_id == deck_id);
    cards.sort_by_key(|c| (c.created_at, c.id));
    Ok(cards)
  }

  fn card_counts(&mut self, deck_ids: &[i32]) -> StoreResult<HashMap<i32, i64>> {
    let mut counts = HashMap::new();
    for card in self.select(|c: &Flashcard| deck_ids.contains(&c.deck_id)) {
      *counts.entry(card.deck_id).or_insert(0) += 1;
    }
    Ok(counts)
  }
}

impl StudySessionRepository for MemoryStore {
  fn sessions_of_user(&mut self, user_id: i32) -> StoreResult<Vec<StudySession>> {
    let mut sessions = self.select(|s: &StudySession| s.user_id == user_id);
    newest_first(&mut sessions, |s| (s.studied_at, s.id));
    Ok(sessions)
  }

  fn sessions_for_deck(&mut self, deck_id: i32) -> StoreResult<Vec<StudySession>> {
    let mut sessions = self.select(|s: &StudySession| s.deck_id == deck_id);
    sessions.sort_by(|a, b| {
      b.score
        .cmp(&a.score)
        .then(a.studied_at.cmp(&b.studied_at))
        .then(a.id.cmp(&b.id))
    });
    Ok(sessions)
  }

  fn all_sessions(&mut self) -> StoreResult<Vec<StudySession>> {
    let mut sessions = self.select(|_: &StudySession| true);
    newest_first(&mut sessions, |s| (s.studied_at, s.id));
    Ok(sessions)
  }

  fn purge_sessions_of_user(&mut self, user_id: i32) -> StoreResult<usize> {
    let mut tables = self.lock();
    let before = tables.study_sessions.len();
    tables.study_sessions.retain(|s| s.user_id != user_id);
    Ok(before - tables.study_sessions.len())
  }
}

impl DictionaryRepository for MemoryStore {
  fn entry_by_word(&mut self, word: &str) -> StoreResult<Option<DictionaryEntry>> {
    Ok(
      self
        .select(|e: &DictionaryEntry| e.word == word)
        .into_iter()
        .next(),
    )
  }
}

impl Store for MemoryStore {
  fn transaction<R, F>(&mut self, f: F) -> Result<R, FLError>
  where
    F: FnOnce(&mut Self) -> Result<R, FLError>,
  {
    // Other clones wait on the shared tables until the draft is settled.
    let mut shared = self.lock();
    let mut draft = MemoryStore {
      tables: Arc::new(Mutex::new(shared.clone())),
    };
    let value = f(&mut draft)?;
    *shared = std::mem::take(&mut *draft.lock());
    Ok(value)
  }
}

impl Backend for MemoryStore {
  type Store = MemoryStore;

  fn store(&self) -> StoreResult<MemoryStore> {
    Ok(self.clone())
  }
}

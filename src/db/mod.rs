use diesel::{
  r2d2::{ConnectionManager, Pool, PoolError, PooledConnection},
  PgConnection,
};
use std::collections::HashMap;

use crate::FLError;

pub mod memory;
pub mod models;
pub mod pg;
pub mod schema;

use models::{Deck, DictionaryEntry, Entity, Flashcard, Folder, StudySession, User};

pub type DBConnection = PgConnection;
pub type DBPool = Pool<ConnectionManager<DBConnection>>;
pub type DBPooledConnection = PooledConnection<ConnectionManager<DBConnection>>;

#[derive(Debug, Fail)]
pub enum StoreError {
  #[fail(display = "Database error: {}", _0)]
  Database(#[fail(cause)] diesel::result::Error),
  #[fail(display = "Connection pool error: {}", _0)]
  Pool(String),
  #[fail(display = "Constraint violated: {}", _0)]
  Conflict(String),
  #[fail(display = "Row no longer exists")]
  Missing,
}

impl From<diesel::result::Error> for StoreError {
  fn from(err: diesel::result::Error) -> StoreError {
    use diesel::result::{DatabaseErrorKind, Error};

    match err {
      Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
      | Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
        StoreError::Conflict(info.message().to_string())
      }
      other => StoreError::Database(other),
    }
  }
}

impl From<PoolError> for StoreError {
  fn from(err: PoolError) -> StoreError {
    StoreError::Pool(err.to_string())
  }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Generic row access for one entity kind. Writes take effect immediately
/// unless they run inside [`Store::transaction`].
pub trait Repository<T: Entity> {
  fn get(&mut self, id: i32) -> StoreResult<Option<T>>;
  fn list(&mut self) -> StoreResult<Vec<T>>;
  fn find(&mut self, predicate: &dyn Fn(&T) -> bool) -> StoreResult<Vec<T>>;
  /// Inserts `item`, ignoring its id, and returns the stored row.
  fn add(&mut self, item: T) -> StoreResult<T>;
  /// Fails with [`StoreError::Missing`] when the row vanished in the meantime.
  fn update(&mut self, item: &T) -> StoreResult<()>;
  fn delete(&mut self, item: &T) -> StoreResult<()>;
  fn exists(&mut self, id: i32) -> StoreResult<bool>;
  fn count(&mut self) -> StoreResult<i64>;
}

pub trait UserRepository: Repository<User> {
  fn user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
  /// All users ordered by username.
  fn users_by_name(&mut self) -> StoreResult<Vec<User>>;
  fn users_by_ids(&mut self, ids: &[i32]) -> StoreResult<Vec<User>>;
}

pub trait DeckRepository: Repository<Deck> {
  /// Every deck for admins, otherwise the user's own decks plus public ones.
  /// Newest first.
  fn decks_visible_to(&mut self, user_id: i32, is_admin: bool) -> StoreResult<Vec<Deck>>;
  fn decks_in_folder(&mut self, folder_id: i32) -> StoreResult<Vec<Deck>>;
  /// The user's decks that sit in no folder, newest first.
  fn unassigned_decks(&mut self, user_id: i32) -> StoreResult<Vec<Deck>>;
  fn decks_by_ids(&mut self, ids: &[i32]) -> StoreResult<Vec<Deck>>;
  fn deck_count_of(&mut self, user_id: i32) -> StoreResult<i64>;
  fn deck_counts_by_folder(&mut self, folder_ids: &[i32]) -> StoreResult<HashMap<i32, i64>>;
}

pub trait FolderRepository: Repository<Folder> {
  fn folders_owned_by(&mut self, user_id: i32) -> StoreResult<Vec<Folder>>;
  /// Exact, case-sensitive match scoped to one owner.
  fn folder_by_name(&mut self, user_id: i32, name: &str) -> StoreResult<Option<Folder>>;
}

pub trait FlashcardRepository: Repository<Flashcard> {
  fn cards_in_deck(&mut self, deck_id: i32) -> StoreResult<Vec<Flashcard>>;
  fn card_counts(&mut self, deck_ids: &[i32]) -> StoreResult<HashMap<i32, i64>>;
}

pub trait StudySessionRepository: Repository<StudySession> {
  fn sessions_of_user(&mut self, user_id: i32) -> StoreResult<Vec<StudySession>>;
  fn sessions_for_deck(&mut self, deck_id: i32) -> StoreResult<Vec<StudySession>>;
  fn all_sessions(&mut self) -> StoreResult<Vec<StudySession>>;
  fn purge_sessions_of_user(&mut self, user_id: i32) -> StoreResult<usize>;
}

pub trait DictionaryRepository: Repository<DictionaryEntry> {
  fn entry_by_word(&mut self, word: &str) -> StoreResult<Option<DictionaryEntry>>;
}

/// The whole persistence gateway as seen by the service layer.
pub trait Store:
  UserRepository
  + DeckRepository
  + FolderRepository
  + FlashcardRepository
  + StudySessionRepository
  + DictionaryRepository
{
  /// Runs `f` as one unit of work. Changes made by `f` are discarded when it
  /// returns an error.
  fn transaction<R, F>(&mut self, f: F) -> Result<R, FLError>
  where
    F: FnOnce(&mut Self) -> Result<R, FLError>;
}

/// Hands out one [`Store`] per request.
pub trait Backend: Clone + Send + Sync + 'static {
  type Store: Store;

  fn store(&self) -> StoreResult<Self::Store>;
}

pub fn now_millis() -> i64 {
  use std::time::{SystemTime, UNIX_EPOCH};

  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as i64)
    .unwrap_or_default()
}

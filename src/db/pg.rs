use diesel::{
  connection::{AnsiTransactionManager, TransactionManager},
  dsl::count_star,
  pg::Pg,
  prelude::*,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;

use super::{
  models::{Deck, DictionaryEntry, Flashcard, Folder, Role, StudyMode, StudySession, User},
  schema::{decks, dictionary_entries, flashcards, folders, study_sessions, users},
  Backend, DBConnection, DBPool, DBPooledConnection, DeckRepository, DictionaryRepository,
  FlashcardRepository, FolderRepository, Repository, Store, StoreError, StoreResult,
  StudySessionRepository, UserRepository,
};
use crate::FLError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn run_migrations(conn: &mut DBConnection) -> Result<usize, FLError> {
  let applied = conn
    .run_pending_migrations(MIGRATIONS)
    .map_err(|err| FLError::Unknown(format!("Migration failed: {}", err)))?;
  Ok(applied.len())
}

#[derive(Clone)]
pub struct PgBackend {
  pool: DBPool,
}

impl PgBackend {
  pub fn new(pool: DBPool) -> Self {
    Self { pool }
  }
}

impl Backend for PgBackend {
  type Store = PgStore;

  fn store(&self) -> StoreResult<PgStore> {
    Ok(PgStore {
      conn: self.pool.get()?,
    })
  }
}

/// A [`Store`] over one pooled PostgreSQL connection.
pub struct PgStore {
  conn: DBPooledConnection,
}

impl PgStore {
  pub fn conn(&mut self) -> &mut DBConnection {
    &mut self.conn
  }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = users, treat_none_as_null = true)]
struct UserForm<'a> {
  username: &'a str,
  email: &'a str,
  password_hash: &'a str,
  role: Role,
  avatar_url: Option<&'a str>,
  created_at: i64,
}

impl<'a> From<&'a User> for UserForm<'a> {
  fn from(user: &'a User) -> Self {
    UserForm {
      username: &user.username,
      email: &user.email,
      password_hash: &user.password_hash,
      role: user.role,
      avatar_url: user.avatar_url.as_deref(),
      created_at: user.created_at,
    }
  }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = folders, treat_none_as_null = true)]
struct FolderForm<'a> {
  name: &'a str,
  description: Option<&'a str>,
  user_id: i32,
  created_at: i64,
}

impl<'a> From<&'a Folder> for FolderForm<'a> {
  fn from(folder: &'a Folder) -> Self {
    FolderForm {
      name: &folder.name,
      description: folder.description.as_deref(),
      user_id: folder.user_id,
      created_at: folder.created_at,
    }
  }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = decks, treat_none_as_null = true)]
struct DeckForm<'a> {
  title: &'a str,
  description: &'a str,
  is_public: bool,
  user_id: i32,
  folder_id: Option<i32>,
  created_at: i64,
}

impl<'a> From<&'a Deck> for DeckForm<'a> {
  fn from(deck: &'a Deck) -> Self {
    DeckForm {
      title: &deck.title,
      description: &deck.description,
      is_public: deck.is_public,
      user_id: deck.user_id,
      folder_id: deck.folder_id,
      created_at: deck.created_at,
    }
  }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = flashcards, treat_none_as_null = true)]
struct FlashcardForm<'a> {
  deck_id: i32,
  term: &'a str,
  definition: &'a str,
  example: Option<&'a str>,
  image_url: Option<&'a str>,
  audio_url: Option<&'a str>,
  created_at: i64,
}

impl<'a> From<&'a Flashcard> for FlashcardForm<'a> {
  fn from(card: &'a Flashcard) -> Self {
    FlashcardForm {
      deck_id: card.deck_id,
      term: &card.term,
      definition: &card.definition,
      example: card.example.as_deref(),
      image_url: card.image_url.as_deref(),
      audio_url: card.audio_url.as_deref(),
      created_at: card.created_at,
    }
  }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = study_sessions)]
struct StudySessionForm {
  user_id: i32,
  deck_id: i32,
  score: i32,
  total_cards: i32,
  mode: StudyMode,
  studied_at: i64,
}

impl<'a> From<&'a StudySession> for StudySessionForm {
  fn from(session: &'a StudySession) -> Self {
    StudySessionForm {
      user_id: session.user_id,
      deck_id: session.deck_id,
      score: session.score,
      total_cards: session.total_cards,
      mode: session.mode,
      studied_at: session.studied_at,
    }
  }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = dictionary_entries)]
struct DictionaryEntryForm<'a> {
  word: &'a str,
  meaning: &'a str,
  cached_at: i64,
}

impl<'a> From<&'a DictionaryEntry> for DictionaryEntryForm<'a> {
  fn from(entry: &'a DictionaryEntry) -> Self {
    DictionaryEntryForm {
      word: &entry.word,
      meaning: &entry.meaning,
      cached_at: entry.cached_at,
    }
  }
}

macro_rules! pg_repository {
  ($entity:ident, $table:ident, $form:ident) => {
    impl Repository<$entity> for PgStore {
      fn get(&mut self, id: i32) -> StoreResult<Option<$entity>> {
        Ok(
          $table::table
            .find(id)
            .first::<$entity>(self.conn())
            .optional()?,
        )
      }

      fn list(&mut self) -> StoreResult<Vec<$entity>> {
        Ok($table::table.order($table::id).load::<$entity>(self.conn())?)
      }

      fn find(&mut self, predicate: &dyn Fn(&$entity) -> bool) -> StoreResult<Vec<$entity>> {
        let rows = Repository::<$entity>::list(self)?;
        Ok(rows.into_iter().filter(|row| predicate(row)).collect())
      }

      fn add(&mut self, item: $entity) -> StoreResult<$entity> {
        Ok(
          diesel::insert_into($table::table)
            .values($form::from(&item))
            .get_result::<$entity>(self.conn())?,
        )
      }

      fn update(&mut self, item: &$entity) -> StoreResult<()> {
        let changed = diesel::update($table::table.find(item.id))
          .set($form::from(item))
          .execute(self.conn())?;
        if changed == 0 {
          return Err(StoreError::Missing);
        }
        Ok(())
      }

      fn delete(&mut self, item: &$entity) -> StoreResult<()> {
        let removed = diesel::delete($table::table.find(item.id)).execute(self.conn())?;
        if removed == 0 {
          return Err(StoreError::Missing);
        }
        Ok(())
      }

      fn exists(&mut self, id: i32) -> StoreResult<bool> {
        Ok(
          diesel::select(diesel::dsl::exists($table::table.find(id)))
            .get_result::<bool>(self.conn())?,
        )
      }

      fn count(&mut self) -> StoreResult<i64> {
        Ok($table::table.count().get_result::<i64>(self.conn())?)
      }
    }
  };
}

pg_repository!(User, users, UserForm);
pg_repository!(Folder, folders, FolderForm);
pg_repository!(Deck, decks, DeckForm);
pg_repository!(Flashcard, flashcards, FlashcardForm);
pg_repository!(StudySession, study_sessions, StudySessionForm);
pg_repository!(DictionaryEntry, dictionary_entries, DictionaryEntryForm);

impl UserRepository for PgStore {
  fn user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
    Ok(
      users::table
        .filter(users::email.eq(email))
        .first::<User>(self.conn())
        .optional()?,
    )
  }

  fn users_by_name(&mut self) -> StoreResult<Vec<User>> {
    Ok(
      users::table
        .order((users::username.asc(), users::id.asc()))
        .load::<User>(self.conn())?,
    )
  }

  fn users_by_ids(&mut self, ids: &[i32]) -> StoreResult<Vec<User>> {
    Ok(
      users::table
        .filter(users::id.eq_any(ids.to_vec()))
        .load::<User>(self.conn())?,
    )
  }
}

impl DeckRepository for PgStore {
  fn decks_visible_to(&mut self, user_id: i32, is_admin: bool) -> StoreResult<Vec<Deck>> {
    let mut query: decks::BoxedQuery<'_, Pg> = decks::table.into_boxed();
    if !is_admin {
      query = query.filter(decks::user_id.eq(user_id).or(decks::is_public.eq(true)));
    }
    Ok(
      query
        .order((decks::created_at.desc(), decks::id.desc()))
        .load::<Deck>(self.conn())?,
    )
  }

  fn decks_in_folder(&mut self, folder_id: i32) -> StoreResult<Vec<Deck>> {
    Ok(
      decks::table
        .filter(decks::folder_id.eq(folder_id))
        .order((decks::created_at.desc(), decks::id.desc()))
        .load::<Deck>(self.conn())?,
    )
  }

  fn unassigned_decks(&mut self, user_id: i32) -> StoreResult<Vec<Deck>> {
    Ok(
      decks::table
        .filter(decks::user_id.eq(user_id))
        .filter(decks::folder_id.is_null())
        .order((decks::created_at.desc(), decks::id.desc()))
        .load::<Deck>(self.conn())?,
    )
  }

  fn decks_by_ids(&mut self, ids: &[i32]) -> StoreResult<Vec<Deck>> {
    Ok(
      decks::table
        .filter(decks::id.eq_any(ids.to_vec()))
        .load::<Deck>(self.conn())?,
    )
  }

  fn deck_count_of(&mut self, user_id: i32) -> StoreResult<i64> {
    Ok(
      decks::table
        .filter(decks::user_id.eq(user_id))
        .count()
        .get_result::<i64>(self.conn())?,
    )
  }

  fn deck_counts_by_folder(&mut self, folder_ids: &[i32]) -> StoreResult<HashMap<i32, i64>> {
    let rows = decks::table
      .filter(decks::folder_id.eq_any(folder_ids.to_vec()))
      .group_by(decks::folder_id)
      .select((decks::folder_id, count_star()))
      .load::<(Option<i32>, i64)>(self.conn())?;
    Ok(
      rows
        .into_iter()
        .filter_map(|(folder_id, n)| folder_id.map(|id| (id, n)))
        .collect(),
    )
  }
}

impl FolderRepository for PgStore {
  fn folders_owned_by(&mut self, user_id: i32) -> StoreResult<Vec<Folder>> {
    Ok(
      folders::table
        .filter(folders::user_id.eq(user_id))
        .order((folders::created_at.desc(), folders::id.desc()))
        .load::<Folder>(self.conn())?,
    )
  }

  fn folder_by_name(&mut self, user_id: i32, name: &str) -> StoreResult<Option<Folder>> {
    Ok(
      folders::table
        .filter(folders::user_id.eq(user_id))
        .filter(folders::name.eq(name))
        .first::<Folder>(self.conn())
        .optional()?,
    )
  }
}

impl FlashcardRepository for PgStore {
  fn cards_in_deck(&mut self, deck_id: i32) -> StoreResult<Vec<Flashcard>> {
    Ok(
      flashcards::table
        .filter(flashcards::deck_id.eq(deck_id))
        .order((flashcards::created_at.asc(), flashcards::id.asc()))
        .load::<Flashcard>(self.conn())?,
    )
  }

  fn card_counts(&mut self, deck_ids: &[i32]) -> StoreResult<HashMap<i32, i64>> {
    let rows = flashcards::table
      .filter(flashcards::deck_id.eq_any(deck_ids.to_vec()))
      .group_by(flashcards::deck_id)
      .select((flashcards::deck_id, count_star()))
      .load::<(i32, i64)>(self.conn())?;
    Ok(rows.into_iter().collect())
  }
}

impl StudySessionRepository for PgStore {
  fn sessions_of_user(&mut self, user_id: i32) -> StoreResult<Vec<StudySession>> {
    Ok(
      study_sessions::table
        .filter(study_sessions::user_id.eq(user_id))
        .order((study_sessions::studied_at.desc(), study_sessions::id.desc()))
        .load::<StudySession>(self.conn())?,
    )
  }

  fn sessions_for_deck(&mut self, deck_id: i32) -> StoreResult<Vec<StudySession>> {
    Ok(
      study_sessions::table
        .filter(study_sessions::deck_id.eq(deck_id))
        .order((
          study_sessions::score.desc(),
          study_sessions::studied_at.asc(),
          study_sessions::id.asc(),
        ))
        .load::<StudySession>(self.conn())?,
    )
  }

  fn all_sessions(&mut self) -> StoreResult<Vec<StudySession>> {
    Ok(
      study_sessions::table
        .order((study_sessions::studied_at.desc(), study_sessions::id.desc()))
        .load::<StudySession>(self.conn())?,
    )
  }

  fn purge_sessions_of_user(&mut self, user_id: i32) -> StoreResult<usize> {
    Ok(
      diesel::delete(study_sessions::table.filter(study_sessions::user_id.eq(user_id)))
        .execute(self.conn())?,
    )
  }
}

impl DictionaryRepository for PgStore {
  fn entry_by_word(&mut self, word: &str) -> StoreResult<Option<DictionaryEntry>> {
    Ok(
      dictionary_entries::table
        .filter(dictionary_entries::word.eq(word))
        .first::<DictionaryEntry>(self.conn())
        .optional()?,
    )
  }
}

impl Store for PgStore {
  fn transaction<R, F>(&mut self, f: F) -> Result<R, FLError>
  where
    F: FnOnce(&mut Self) -> Result<R, FLError>,
  {
    AnsiTransactionManager::begin_transaction(self.conn()).map_err(StoreError::from)?;
    match f(self) {
      Ok(value) => {
        AnsiTransactionManager::commit_transaction(self.conn()).map_err(StoreError::from)?;
        Ok(value)
      }
      Err(err) => {
        if let Err(rollback) = AnsiTransactionManager::rollback_transaction(self.conn()) {
          warn!("Rollback failed: {}", rollback);
        }
        Err(err)
      }
    }
  }
}

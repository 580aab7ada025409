use actix_web::web::Data;
use diesel::{
  r2d2::{ConnectionManager, Pool},
  Connection,
};
use dotenv::dotenv;
use std::{
  env,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use crate::{
  db::{
    memory::MemoryStore,
    models::{Role, User},
    now_millis,
    pg::{run_migrations, PgBackend, PgStore},
    Backend, DBConnection, Repository,
  },
  domain::{auth::hash_password, dictionary::DictionaryProvider, Caller},
  service::{jwt::Authenticator, AppState},
  FLError,
};

/// Builds the full application over `$state` and `$auth` for `actix_web::test`.
macro_rules! test_app {
  ($state:expr, $auth:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data($state.clone())
        .app_data($auth.clone())
        .app_data(crate::service::json_config())
        .configure(crate::service::routes::<crate::db::memory::MemoryStore>),
    )
    .await
  };
}

mod card;
mod endpoints;

pub const PASSWORD: &str = "password";
pub const SECRET: &str = "test-secret";

/// Scripted stand-in for the external dictionary services.
#[derive(Default)]
pub struct FakeDictionary {
  pub translation: Option<String>,
  pub audio: Option<String>,
  pub unreachable: bool,
  pub calls: AtomicUsize,
}

impl FakeDictionary {
  pub fn with_audio(url: &str) -> Self {
    FakeDictionary {
      audio: Some(url.to_string()),
      ..Default::default()
    }
  }

  pub fn with_translation(meaning: &str) -> Self {
    FakeDictionary {
      translation: Some(meaning.to_string()),
      ..Default::default()
    }
  }

  pub fn unreachable() -> Self {
    FakeDictionary {
      unreachable: true,
      ..Default::default()
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn answer<T>(&self, value: T) -> Result<T, FLError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.unreachable {
      return Err(FLError::External(String::from("operation timed out")));
    }
    Ok(value)
  }
}

impl DictionaryProvider for FakeDictionary {
  fn translate(&self, _word: &str) -> Result<String, FLError> {
    self.answer(self.translation.clone().unwrap_or_default())
  }

  fn pronunciation(&self, _word: &str) -> Result<Option<String>, FLError> {
    self.answer(self.audio.clone())
  }
}

/// Inserts a user directly, bypassing registration, so admins can be seeded.
pub fn seed_user<S: Repository<User>>(store: &mut S, name: &str, role: Role) -> Caller {
  let user = Repository::<User>::add(
    store,
    User {
      id: 0,
      username: name.to_string(),
      email: format!("{}@example.com", name.to_lowercase()),
      password_hash: hash_password(PASSWORD).unwrap(),
      role,
      avatar_url: None,
      created_at: now_millis(),
    },
  )
  .unwrap();
  Caller::new(user.id, role)
}

pub fn init(
  dictionary: FakeDictionary,
) -> (MemoryStore, Data<AppState<MemoryStore>>, Data<Authenticator>) {
  let store = MemoryStore::new();
  let state = AppState::new(store.clone(), Arc::new(dictionary));
  (
    store,
    Data::new(state),
    Data::new(Authenticator::new(SECRET, 1)),
  )
}

pub fn bearer(auth: &Authenticator, caller: &Caller) -> String {
  format!("Bearer {}", auth.issue(caller.user_id, caller.role).unwrap())
}

/// A store on one PostgreSQL connection inside a test transaction, so nothing
/// is ever committed. `None` when `DATABASE_URL` is not set.
pub fn pg_store() -> Option<PgStore> {
  dotenv().ok();
  let db_url = env::var("DATABASE_URL").ok()?;
  let manager = ConnectionManager::<DBConnection>::new(db_url);
  let pool = Pool::builder()
    .max_size(1)
    .build(manager)
    .expect("Failed to initialize connection pool");
  let mut store = PgBackend::new(pool)
    .store()
    .expect("Failed to get db connection");
  run_migrations(store.conn()).expect("Failed to run migrations");
  store
    .conn()
    .begin_test_transaction()
    .expect("Failed to start transaction");
  Some(store)
}

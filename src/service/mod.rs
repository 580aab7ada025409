use actix_web::{
  dev::Payload,
  web::{self, Data, ServiceConfig},
  FromRequest, HttpRequest,
};
use std::{
  future::{ready, Ready},
  sync::Arc,
};

use crate::{
  db::Backend,
  domain::{dictionary::DictionaryProvider, Caller},
  FLError,
};

pub mod endpoints;
pub mod jwt;

use endpoints::{auth, card, deck, dictionary, folder, session, user};
use jwt::Authenticator;

pub struct AppState<B: Backend> {
  pub backend: B,
  pub dictionary: Arc<dyn DictionaryProvider>,
}

impl<B: Backend> AppState<B> {
  pub fn new(backend: B, dictionary: Arc<dyn DictionaryProvider>) -> Self {
    AppState {
      backend,
      dictionary,
    }
  }

  /// Runs `f` on the blocking thread pool with a fresh store.
  pub async fn run<F, R>(&self, f: F) -> Result<R, FLError>
  where
    F: FnOnce(&mut B::Store, &dyn DictionaryProvider) -> Result<R, FLError> + Send + 'static,
    R: Send + 'static,
  {
    let backend = self.backend.clone();
    let dictionary = self.dictionary.clone();
    web::block(move || {
      let mut store = backend.store()?;
      f(&mut store, dictionary.as_ref())
    })
    .await?
  }

  /// Runs a dictionary call on the blocking thread pool without holding a store.
  pub async fn enrich<F, R>(&self, f: F) -> Result<R, FLError>
  where
    F: FnOnce(&dyn DictionaryProvider) -> R + Send + 'static,
    R: Send + 'static,
  {
    let dictionary = self.dictionary.clone();
    Ok(web::block(move || f(dictionary.as_ref())).await?)
  }
}

impl FromRequest for Caller {
  type Error = FLError;
  type Future = Ready<Result<Caller, FLError>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(caller_of(req))
  }
}

fn caller_of(req: &HttpRequest) -> Result<Caller, FLError> {
  let authenticator = req
    .app_data::<Data<Authenticator>>()
    .ok_or_else(|| FLError::Unknown(String::from("Authenticator is not configured")))?;
  let header = req
    .headers()
    .get("Authorization")
    .and_then(|value| value.to_str().ok())
    .ok_or(FLError::Unauthenticated)?;
  authenticator.verify(header)
}

/// Reports unreadable JSON bodies as bad arguments.
pub fn json_config() -> web::JsonConfig {
  web::JsonConfig::default()
    .error_handler(|err, _| FLError::Argument(format!("Malformed request body: {}", err)).into())
}

/// Registers every route. Expects `Data<AppState<B>>` and
/// `Data<Authenticator>` as app data.
pub fn routes<B: Backend>(cfg: &mut ServiceConfig) {
  cfg
    .service(
      web::scope("/auth")
        .route("/register", web::post().to(auth::register::<B>))
        .route("/login", web::post().to(auth::login::<B>)),
    )
    .service(
      web::scope("/decks")
        .service(
          web::resource("")
            .route(web::get().to(deck::list::<B>))
            .route(web::post().to(deck::create::<B>)),
        )
        .service(
          web::resource("/{id}")
            .route(web::get().to(deck::get::<B>))
            .route(web::put().to(deck::update::<B>))
            .route(web::delete().to(deck::delete::<B>)),
        ),
    )
    .service(
      web::scope("/folders")
        .service(
          web::resource("")
            .route(web::get().to(folder::list::<B>))
            .route(web::post().to(folder::create::<B>)),
        )
        .service(web::resource("/unassigned-decks").route(web::get().to(folder::unassigned::<B>)))
        .service(
          web::resource("/{id}")
            .route(web::get().to(folder::get::<B>))
            .route(web::put().to(folder::update::<B>))
            .route(web::delete().to(folder::delete::<B>)),
        ),
    )
    .service(
      web::scope("/flashcards")
        .service(web::resource("").route(web::post().to(card::create::<B>)))
        .service(
          web::resource("/{id}")
            .route(web::get().to(card::get::<B>))
            .route(web::put().to(card::update::<B>))
            .route(web::delete().to(card::delete::<B>)),
        ),
    )
    .service(
      web::scope("/study-sessions")
        .service(web::resource("").route(web::post().to(session::create::<B>)))
        .service(web::resource("/history").route(web::get().to(session::history::<B>)))
        .service(
          web::resource("/leaderboard/{deck_id}").route(web::get().to(session::leaderboard::<B>)),
        )
        .service(
          web::resource("/admin/all-history").route(web::get().to(session::all_history::<B>)),
        )
        .service(web::resource("/admin/{id}").route(web::delete().to(session::delete::<B>))),
    )
    .service(
      web::scope("/users")
        .service(web::resource("").route(web::get().to(user::list::<B>)))
        .service(
          web::resource("/profile")
            .route(web::get().to(user::profile::<B>))
            .route(web::put().to(user::update_profile::<B>)),
        )
        .service(
          web::resource("/change-password").route(web::put().to(user::change_password::<B>)),
        )
        .service(
          web::resource("/admin/update-user").route(web::put().to(user::admin_update::<B>)),
        )
        .service(web::resource("/{id}").route(web::delete().to(user::delete::<B>))),
    )
    .service(
      web::scope("/dictionary")
        .service(web::resource("/lookup").route(web::get().to(dictionary::lookup::<B>))),
    );
}

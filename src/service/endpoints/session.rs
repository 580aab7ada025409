use actix_web::{
  web::{Data, Json, Path},
  HttpResponse,
};

use crate::{
  db::Backend,
  domain::{self, session::SessionRequest, Caller},
  service::AppState,
  FLError,
};

pub async fn create<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  Json(request): Json<SessionRequest>,
) -> Result<HttpResponse, FLError> {
  let session = state
    .run(move |store, _| domain::session::create(store, request, &caller))
    .await?;
  Ok(HttpResponse::Created().json(session))
}

pub async fn history<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
) -> Result<HttpResponse, FLError> {
  let history = state
    .run(move |store, _| domain::session::my_history(store, &caller))
    .await?;
  Ok(HttpResponse::Ok().json(history))
}

pub async fn leaderboard<B: Backend>(
  _: Caller,
  state: Data<AppState<B>>,
  deck_id: Path<i32>,
) -> Result<HttpResponse, FLError> {
  let deck_id = deck_id.into_inner();
  let entries = state
    .run(move |store, _| domain::session::leaderboard(store, deck_id))
    .await?;
  Ok(HttpResponse::Ok().json(entries))
}

pub async fn all_history<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
) -> Result<HttpResponse, FLError> {
  caller.require_admin()?;
  let history = state
    .run(|store, _| domain::session::all_history(store))
    .await?;
  Ok(HttpResponse::Ok().json(history))
}

pub async fn delete<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  id: Path<i32>,
) -> Result<HttpResponse, FLError> {
  caller.require_admin()?;
  let id = id.into_inner();
  state
    .run(move |store, _| domain::session::delete_session(store, id))
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

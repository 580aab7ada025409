use actix_web::{
  web::{Data, Json, Path},
  HttpResponse,
};

use crate::{
  db::Backend,
  domain::{self, deck::DeckRequest, Caller},
  service::AppState,
  FLError,
};

pub async fn list<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
) -> Result<HttpResponse, FLError> {
  let decks = state
    .run(move |store, _| domain::deck::list_for_user(store, &caller))
    .await?;
  Ok(HttpResponse::Ok().json(decks))
}

pub async fn get<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  id: Path<i32>,
) -> Result<HttpResponse, FLError> {
  let id = id.into_inner();
  let deck = state
    .run(move |store, _| domain::deck::get_by_id(store, id, &caller))
    .await?;
  Ok(HttpResponse::Ok().json(deck))
}

pub async fn create<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  Json(request): Json<DeckRequest>,
) -> Result<HttpResponse, FLError> {
  let deck = state
    .run(move |store, _| domain::deck::create(store, request, &caller))
    .await?;
  Ok(HttpResponse::Created().json(deck))
}

pub async fn update<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  id: Path<i32>,
  Json(request): Json<DeckRequest>,
) -> Result<HttpResponse, FLError> {
  let id = id.into_inner();
  state
    .run(move |store, _| domain::deck::update(store, id, request, &caller))
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

pub async fn delete<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  id: Path<i32>,
) -> Result<HttpResponse, FLError> {
  let id = id.into_inner();
  state
    .run(move |store, _| domain::deck::delete(store, id, &caller))
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

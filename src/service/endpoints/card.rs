use actix_web::{
  web::{Data, Json, Path},
  HttpResponse,
};

use crate::{
  db::Backend,
  domain::{self, card::FlashcardRequest, Caller},
  service::AppState,
  FLError,
};

pub async fn get<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  id: Path<i32>,
) -> Result<HttpResponse, FLError> {
  let id = id.into_inner();
  let card = state
    .run(move |store, _| domain::card::get(store, id, &caller))
    .await?;
  Ok(HttpResponse::Ok().json(card))
}

pub async fn create<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  Json(request): Json<FlashcardRequest>,
) -> Result<HttpResponse, FLError> {
  let lookup = request.clone();
  let audio_url = state
    .enrich(move |dictionary| domain::card::resolve_audio(dictionary, &lookup))
    .await?;
  let card = state
    .run(move |store, _| domain::card::create_with_audio(store, request, audio_url, &caller))
    .await?;
  Ok(HttpResponse::Created().json(card))
}

pub async fn update<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  id: Path<i32>,
  Json(request): Json<FlashcardRequest>,
) -> Result<HttpResponse, FLError> {
  let id = id.into_inner();
  state
    .run(move |store, _| domain::card::update(store, id, request, &caller))
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
    .run(move |store, _| domain::card::delete(store, id, &caller))
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

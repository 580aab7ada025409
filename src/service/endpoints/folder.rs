use actix_web::{
  web::{Data, Json, Path},
  HttpResponse,
};

use crate::{
  db::Backend,
  domain::{self, folder::FolderRequest, Caller},
  service::AppState,
  FLError,
};

pub async fn list<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
) -> Result<HttpResponse, FLError> {
  let folders = state
    .run(move |store, _| domain::folder::list_for_user(store, &caller))
    .await?;
  Ok(HttpResponse::Ok().json(folders))
}

pub async fn get<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  id: Path<i32>,
) -> Result<HttpResponse, FLError> {
  let id = id.into_inner();
  let folder = state
    .run(move |store, _| domain::folder::get_by_id(store, id, &caller))
    .await?;
  Ok(HttpResponse::Ok().json(folder))
}

pub async fn create<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  Json(request): Json<FolderRequest>,
) -> Result<HttpResponse, FLError> {
  let folder = state
    .run(move |store, _| domain::folder::create(store, request, &caller))
    .await?;
  Ok(HttpResponse::Created().json(folder))
}

pub async fn update<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  id: Path<i32>,
  Json(request): Json<FolderRequest>,
) -> Result<HttpResponse, FLError> {
  let id = id.into_inner();
  state
    .run(move |store, _| domain::folder::update(store, id, request, &caller))
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
    .run(move |store, _| domain::folder::delete(store, id, &caller))
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

pub async fn unassigned<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
) -> Result<HttpResponse, FLError> {
  let decks = state
    .run(move |store, _| domain::folder::list_unassigned_decks(store, &caller))
    .await?;
  Ok(HttpResponse::Ok().json(decks))
}

use actix_web::{
  web::{Data, Json},
  HttpResponse,
};

use crate::{
  db::Backend,
  domain::{
    self,
    auth::{LoginRequest, RegisterRequest},
  },
  service::{jwt::Authenticator, AppState},
  FLError,
};

pub async fn register<B: Backend>(
  state: Data<AppState<B>>,
  Json(request): Json<RegisterRequest>,
) -> Result<HttpResponse, FLError> {
  let registered = state
    .run(move |store, _| domain::auth::register(store, request))
    .await?;
  Ok(HttpResponse::Ok().json(registered))
}

pub async fn login<B: Backend>(
  state: Data<AppState<B>>,
  authenticator: Data<Authenticator>,
  Json(request): Json<LoginRequest>,
) -> Result<HttpResponse, FLError> {
  let session = state
    .run(move |store, _| domain::auth::login(store, &authenticator, request))
    .await?;
  Ok(HttpResponse::Ok().json(session))
}

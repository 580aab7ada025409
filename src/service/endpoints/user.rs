use actix_web::{
  web::{Data, Json, Path},
  HttpResponse,
};

use crate::{
  db::Backend,
  domain::{
    self,
    user::{AdminUserUpdate, PasswordChange, ProfileUpdate},
    Caller,
  },
  service::AppState,
  FLError,
};

pub async fn profile<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
) -> Result<HttpResponse, FLError> {
  let profile = state
    .run(move |store, _| domain::user::get_profile(store, caller.user_id))
    .await?;
  Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_profile<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  Json(update): Json<ProfileUpdate>,
) -> Result<HttpResponse, FLError> {
  state
    .run(move |store, _| domain::user::update_profile(store, &caller, update))
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

pub async fn change_password<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  Json(change): Json<PasswordChange>,
) -> Result<HttpResponse, FLError> {
  state
    .run(move |store, _| domain::user::change_password(store, &caller, change))
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

pub async fn list<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
) -> Result<HttpResponse, FLError> {
  caller.require_admin()?;
  let users = state
    .run(|store, _| domain::user::list_all_users(store))
    .await?;
  Ok(HttpResponse::Ok().json(users))
}

pub async fn admin_update<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  Json(update): Json<AdminUserUpdate>,
) -> Result<HttpResponse, FLError> {
  caller.require_admin()?;
  state
    .run(move |store, _| domain::user::admin_update_user(store, update))
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

pub async fn delete<B: Backend>(
  caller: Caller,
  state: Data<AppState<B>>,
  id: Path<i32>,
) -> Result<HttpResponse, FLError> {
  caller.require_admin()?;
  let id = id.into_inner();
  state
    .run(move |store, _| domain::user::delete_user(store, id, &caller))
    .await?;
  Ok(HttpResponse::NoContent().finish())
}

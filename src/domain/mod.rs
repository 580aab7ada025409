use crate::{
  db::{models::Entity, models::Role, Repository},
  FLError,
};

pub mod auth;
pub mod card;
pub mod deck;
pub mod dictionary;
pub mod folder;
pub mod session;
pub mod user;

/// The resolved identity behind a request.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Caller {
  pub user_id: i32,
  pub role: Role,
}

impl Caller {
  pub fn new(user_id: i32, role: Role) -> Self {
    Caller { user_id, role }
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn require_admin(&self) -> Result<(), FLError> {
    if self.is_admin() {
      Ok(())
    } else {
      Err(FLError::unauthorized("Administrator role required"))
    }
  }

  /// Owner or admin.
  pub fn may_modify(&self, owner_id: i32) -> bool {
    self.is_admin() || self.user_id == owner_id
  }
}

/// Loads a row or fails with [`FLError::NotFound`].
pub fn load<T, S>(store: &mut S, id: i32) -> Result<T, FLError>
where
  T: Entity,
  S: Repository<T>,
{
  store.get(id)?.ok_or(FLError::NotFound)
}

/// Trims `value` and rejects it when blank or longer than `max` characters.
pub fn required_text(value: &str, field: &str, max: usize) -> Result<String, FLError> {
  let value = value.trim();
  if value.is_empty() {
    return Err(FLError::Argument(format!("{} is required", field)));
  }
  bounded_text(value, field, max)
}

pub fn bounded_text(value: &str, field: &str, max: usize) -> Result<String, FLError> {
  if value.chars().count() > max {
    return Err(FLError::Argument(format!(
      "{} can not be more than {} characters",
      field, max
    )));
  }
  Ok(value.to_string())
}

/// Like [`bounded_text`] but maps blank input to `None`.
pub fn optional_text(
  value: Option<&str>,
  field: &str,
  max: usize,
) -> Result<Option<String>, FLError> {
  match value.map(str::trim) {
    Some(v) if !v.is_empty() => bounded_text(v, field, max).map(Some),
    _ => Ok(None),
  }
}

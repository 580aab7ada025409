use crate::{
  db::{
    models::{Role, User},
    Repository, Store,
  },
  domain::{
    auth::{hash_password, validate_email, verify_password},
    load, optional_text, required_text, Caller,
  },
  FLError,
};

const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub id: i32,
  pub username: String,
  pub email: String,
  pub role: Role,
  pub avatar_url: Option<String>,
  pub created_at: i64,
  pub deck_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
  pub id: i32,
  pub username: String,
  pub email: String,
  pub role: Role,
  pub created_at: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
  pub username: Option<String>,
  pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
  pub old_password: String,
  pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
  pub email: String,
  pub new_email: Option<String>,
  pub new_password: Option<String>,
}

pub fn get_profile<S: Store>(store: &mut S, user_id: i32) -> Result<Profile, FLError> {
  let user: User = load(store, user_id)?;
  Ok(Profile {
    deck_count: store.deck_count_of(user.id)?,
    id: user.id,
    username: user.username,
    email: user.email,
    role: user.role,
    avatar_url: user.avatar_url,
    created_at: user.created_at,
  })
}

/// The avatar is always replaced, even by nothing. The username only changes
/// when a non-blank one is given.
pub fn update_profile<S: Store>(
  store: &mut S,
  caller: &Caller,
  update: ProfileUpdate,
) -> Result<(), FLError> {
  let mut user: User = load(store, caller.user_id)?;
  user.avatar_url = optional_text(update.avatar_url.as_deref(), "Avatar URL", 1000)?;
  if let Some(username) = update.username.filter(|name| !name.trim().is_empty()) {
    user.username = required_text(&username, "Username", 100)?;
  }
  Repository::<User>::update(store, &user)?;
  Ok(())
}

pub fn change_password<S: Store>(
  store: &mut S,
  caller: &Caller,
  change: PasswordChange,
) -> Result<(), FLError> {
  let mut user: User = load(store, caller.user_id)?;
  if !verify_password(&change.old_password, &user.password_hash) {
    return Err(FLError::invalid("Old password is incorrect"));
  }
  if change.new_password.is_empty() {
    return Err(FLError::argument("New password is required"));
  }
  user.password_hash = hash_password(&change.new_password)?;
  Repository::<User>::update(store, &user)?;
  Ok(())
}

pub fn list_all_users<S: Store>(store: &mut S) -> Result<Vec<UserSummary>, FLError> {
  Ok(
    store
      .users_by_name()?
      .into_iter()
      .map(|u| UserSummary {
        id: u.id,
        username: u.username,
        email: u.email,
        role: u.role,
        created_at: u.created_at,
      })
      .collect(),
  )
}

pub fn admin_update_user<S: Store>(store: &mut S, update: AdminUserUpdate) -> Result<(), FLError> {
  let mut user = store
    .user_by_email(update.email.trim())?
    .ok_or(FLError::NotFound)?;

  if let Some(new_email) = update.new_email.filter(|e| !e.trim().is_empty()) {
    let new_email = validate_email(&new_email)?;
    if let Some(other) = store.user_by_email(&new_email)? {
      if other.id != user.id {
        return Err(FLError::invalid("Email existed"));
      }
    }
    user.email = new_email;
  }

  if let Some(new_password) = update.new_password.filter(|p| !p.is_empty()) {
    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
      return Err(FLError::Argument(format!(
        "Password must be at least {} characters",
        MIN_PASSWORD_LENGTH
      )));
    }
    user.password_hash = hash_password(&new_password)?;
  }

  Repository::<User>::update(store, &user)?;
  info!("Administrator updated user {}", user.id);
  Ok(())
}

/// Removes the user's own study history first; decks and folders cascade.
pub fn delete_user<S: Store>(
  store: &mut S,
  target_id: i32,
  caller: &Caller,
) -> Result<(), FLError> {
  if target_id == caller.user_id {
    return Err(FLError::invalid("You can not delete your own account"));
  }
  let user: User = load(store, target_id)?;
  store.transaction(|store| {
    let purged = store.purge_sessions_of_user(user.id)?;
    debug!("Purged {} study sessions of user {}", purged, user.id);
    Repository::<User>::delete(store, &user)?;
    Ok(())
  })?;
  info!("User {} deleted by {}", target_id, caller.user_id);
  Ok(())
}

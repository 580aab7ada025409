use bcrypt::{hash, verify};

use crate::{
  db::{
    models::{Role, User},
    now_millis, Repository, Store,
  },
  domain::required_text,
  service::jwt::Authenticator,
  FLError,
};

#[cfg(not(test))]
const HASH_COST: u32 = 10;
#[cfg(test)]
const HASH_COST: u32 = bcrypt::DEFAULT_COST - 8;

const BAD_CREDENTIALS: &str = "Email or password is incorrect";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
  pub username: String,
  pub email: String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
  pub user_id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
  pub token: String,
  pub username: String,
  pub role: Role,
  pub user_id: i32,
}

pub fn hash_password(password: &str) -> Result<String, FLError> {
  Ok(hash(password, HASH_COST)?)
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  verify(password, password_hash).unwrap_or(false)
}

pub fn validate_email(email: &str) -> Result<String, FLError> {
  let email = required_text(email, "Email", 256)?;
  match email.find('@') {
    Some(at) if at > 0 && at < email.len() - 1 => Ok(email),
    _ => Err(FLError::argument("Email is not a valid address")),
  }
}

pub fn register<S: Store>(
  store: &mut S,
  request: RegisterRequest,
) -> Result<RegisterResponse, FLError> {
  let username = required_text(&request.username, "Username", 100)?;
  let email = validate_email(&request.email)?;
  if request.password.is_empty() {
    return Err(FLError::argument("Password is required"));
  }

  if store.user_by_email(&email)?.is_some() {
    return Err(FLError::invalid("Email existed"));
  }

  let user = Repository::<User>::add(
    store,
    User {
      id: 0,
      username,
      email,
      password_hash: hash_password(&request.password)?,
      role: Role::User,
      avatar_url: None,
      created_at: now_millis(),
    },
  )?;
  info!("Registered user {}", user.id);
  Ok(RegisterResponse { user_id: user.id })
}

pub fn login<S: Store>(
  store: &mut S,
  authenticator: &Authenticator,
  request: LoginRequest,
) -> Result<LoginResponse, FLError> {
  let user = store
    .user_by_email(request.email.trim())?
    .ok_or_else(|| FLError::invalid(BAD_CREDENTIALS))?;
  if !verify_password(&request.password, &user.password_hash) {
    return Err(FLError::invalid(BAD_CREDENTIALS));
  }

  Ok(LoginResponse {
    token: authenticator.issue(user.id, user.role)?,
    username: user.username,
    role: user.role,
    user_id: user.id,
  })
}

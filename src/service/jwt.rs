use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{db::models::Role, domain::Caller, FLError};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub user_id: i32,
  pub role: Role,
  pub exp: u64,
}

/// Issues and verifies HS256 identity tokens.
#[derive(Clone)]
pub struct Authenticator {
  encoding: EncodingKey,
  decoding: DecodingKey,
  token_days: u64,
}

impl Authenticator {
  pub fn new(secret: &str, token_days: u64) -> Self {
    Authenticator {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      token_days,
    }
  }

  pub fn issue(&self, user_id: i32, role: Role) -> Result<String, FLError> {
    let now = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_secs())
      .unwrap_or_default();
    let claims = Claims {
      user_id,
      role,
      exp: now + self.token_days * SECONDS_PER_DAY,
    };
    Ok(encode(&Header::default(), &claims, &self.encoding)?)
  }

  /// Accepts `Bearer <token>` as well as the bare token.
  pub fn verify(&self, header: &str) -> Result<Caller, FLError> {
    let token = header.trim();
    let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
    let data = decode::<Claims>(token, &self.decoding, &Validation::default())
      .map_err(|_| FLError::Unauthenticated)?;
    Ok(Caller::new(data.claims.user_id, data.claims.role))
  }
}

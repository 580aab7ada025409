#[macro_use]
extern crate diesel;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod db;
pub mod domain;
pub mod service;

#[cfg(test)]
mod test;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use db::StoreError;

#[derive(Debug, Fail)]
pub enum FLError {
  #[fail(display = "Not found")]
  NotFound,
  #[fail(display = "Authentication required")]
  Unauthenticated,
  #[fail(display = "Unauthorized: {}", _0)]
  Unauthorized(String),
  #[fail(display = "Invalid operation: {}", _0)]
  InvalidOperation(String),
  #[fail(display = "Invalid argument: {}", _0)]
  Argument(String),
  #[fail(display = "External dependency failure: {}", _0)]
  External(String),
  #[fail(display = "Store error: {}", _0)]
  Store(#[fail(cause)] StoreError),
  #[fail(display = "Unknown error: {}", _0)]
  Unknown(String),
}

impl FLError {
  pub fn unauthorized(message: &str) -> FLError {
    FLError::Unauthorized(message.to_string())
  }

  pub fn invalid(message: &str) -> FLError {
    FLError::InvalidOperation(message.to_string())
  }

  pub fn argument(message: &str) -> FLError {
    FLError::Argument(message.to_string())
  }
}

impl From<StoreError> for FLError {
  fn from(err: StoreError) -> FLError {
    match err {
      StoreError::Missing => FLError::NotFound,
      StoreError::Conflict(message) => FLError::InvalidOperation(message),
      other => FLError::Store(other),
    }
  }
}

impl From<bcrypt::BcryptError> for FLError {
  fn from(err: bcrypt::BcryptError) -> FLError {
    FLError::Unknown(format!("Password hashing failed: {}", err))
  }
}

impl From<jsonwebtoken::errors::Error> for FLError {
  fn from(err: jsonwebtoken::errors::Error) -> FLError {
    FLError::Unknown(format!("Token error: {}", err))
  }
}

impl From<reqwest::Error> for FLError {
  fn from(err: reqwest::Error) -> FLError {
    FLError::External(err.to_string())
  }
}

impl From<actix_web::error::BlockingError> for FLError {
  fn from(err: actix_web::error::BlockingError) -> FLError {
    FLError::Unknown(err.to_string())
  }
}

impl ResponseError for FLError {
  fn status_code(&self) -> StatusCode {
    match *self {
      FLError::NotFound => StatusCode::NOT_FOUND,
      FLError::Unauthenticated => StatusCode::UNAUTHORIZED,
      FLError::Unauthorized(_) => StatusCode::FORBIDDEN,
      FLError::InvalidOperation(_) | FLError::Argument(_) => StatusCode::BAD_REQUEST,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let message = match *self {
      FLError::NotFound => String::from("Not found"),
      FLError::Unauthenticated => String::from("Authentication required"),
      FLError::Unauthorized(ref msg)
      | FLError::InvalidOperation(ref msg)
      | FLError::Argument(ref msg) => msg.clone(),
      _ => {
        error!("{}", self);
        String::from("Internal server error")
      }
    };
    HttpResponse::build(self.status_code()).json(json!({ "error": message }))
  }
}

//! One handler module per resource. Handlers resolve the caller, hand the
//! work to the domain layer on the blocking pool and shape the response.

pub mod auth;
pub mod card;
pub mod deck;
pub mod dictionary;
pub mod folder;
pub mod session;
pub mod user;

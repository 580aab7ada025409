use diesel::{
  deserialize::{self, FromSql},
  pg::{Pg, PgValue},
  serialize::{self, IsNull, Output, ToSql},
  sql_types::Text,
  AsExpression, FromSqlRow, Queryable,
};
use std::{fmt, io::Write, str::FromStr};

/// Common shape of every persisted row: a store-assigned integer key.
pub trait Entity: Clone {
  fn id(&self) -> i32;
  fn assign_id(&mut self, id: i32);
}

macro_rules! entity {
  ($($name:ident),*) => {
    $(
      impl Entity for $name {
        fn id(&self) -> i32 {
          self.id
        }

        fn assign_id(&mut self, id: i32) {
          self.id = id;
        }
      }
    )*
  };
}

#[derive(
  Debug, Copy, Clone, AsExpression, FromSqlRow, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[diesel(sql_type = Text)]
pub enum Role {
  User,
  Admin,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Role::User => "User",
      Role::Admin => "Admin",
    }
  }
}

impl ToSql<Text, Pg> for Role {
  fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
    out.write_all(self.as_str().as_bytes())?;
    Ok(IsNull::No)
  }
}

impl FromSql<Text, Pg> for Role {
  fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
    match bytes.as_bytes() {
      b"User" => Ok(Role::User),
      b"Admin" => Ok(Role::Admin),
      other => Err(format!("Unrecognized role: {}", String::from_utf8_lossy(other)).into()),
    }
  }
}

#[derive(
  Debug, Copy, Clone, AsExpression, FromSqlRow, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[diesel(sql_type = Text)]
pub enum StudyMode {
  Flashcard,
  Quiz,
  Match,
}

impl Default for StudyMode {
  fn default() -> Self {
    StudyMode::Flashcard
  }
}

impl StudyMode {
  pub fn as_str(self) -> &'static str {
    match self {
      StudyMode::Flashcard => "Flashcard",
      StudyMode::Quiz => "Quiz",
      StudyMode::Match => "Match",
    }
  }
}

impl fmt::Display for StudyMode {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StudyMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "flashcard" => Ok(StudyMode::Flashcard),
      "quiz" => Ok(StudyMode::Quiz),
      "match" => Ok(StudyMode::Match),
      _ => Err(format!("Unknown study mode: {}", s)),
    }
  }
}

impl ToSql<Text, Pg> for StudyMode {
  fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
    out.write_all(self.as_str().as_bytes())?;
    Ok(IsNull::No)
  }
}

impl FromSql<Text, Pg> for StudyMode {
  fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
    let raw = String::from_utf8_lossy(bytes.as_bytes()).into_owned();
    raw.parse::<StudyMode>().map_err(Into::into)
  }
}

#[derive(Clone, Debug, PartialEq, Queryable)]
pub struct User {
  pub id: i32,
  pub username: String,
  pub email: String,
  pub password_hash: String,
  pub role: Role,
  pub avatar_url: Option<String>,
  pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
  pub id: i32,
  pub name: String,
  pub description: Option<String>,
  pub user_id: i32,
  pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
  pub id: i32,
  pub title: String,
  pub description: String,
  pub is_public: bool,
  pub user_id: i32,
  pub folder_id: Option<i32>,
  pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
  pub id: i32,
  pub deck_id: i32,
  pub term: String,
  pub definition: String,
  pub example: Option<String>,
  pub image_url: Option<String>,
  pub audio_url: Option<String>,
  pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
  pub id: i32,
  pub user_id: i32,
  pub deck_id: i32,
  pub score: i32,
  pub total_cards: i32,
  pub mode: StudyMode,
  pub studied_at: i64,
}

#[derive(Clone, Debug, PartialEq, Queryable)]
pub struct DictionaryEntry {
  pub id: i32,
  pub word: String,
  pub meaning: String,
  pub cached_at: i64,
}

entity!(User, Folder, Deck, Flashcard, StudySession, DictionaryEntry);

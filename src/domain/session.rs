use std::collections::{HashMap, HashSet};

use crate::{
  db::{
    models::{Deck, StudyMode, StudySession},
    now_millis, Repository, Store,
  },
  domain::{load, Caller},
  FLError,
};

pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
  pub deck_id: i32,
  pub score: i32,
  pub total_cards: i32,
  pub mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
  pub id: i32,
  pub deck_id: i32,
  pub deck_title: String,
  pub score: i32,
  pub total_cards: i32,
  pub mode: StudyMode,
  pub studied_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
  pub user_id: i32,
  pub username: String,
  pub avatar: Option<String>,
  pub score: i32,
  pub total_cards: i32,
  pub date: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminHistoryEntry {
  pub id: i32,
  pub user_id: i32,
  pub username: String,
  pub deck_id: i32,
  pub deck_title: String,
  pub score: i32,
  pub total_cards: i32,
  pub mode: StudyMode,
  pub studied_at: i64,
}

fn parse_mode(mode: Option<&str>) -> Result<StudyMode, FLError> {
  match mode.map(str::trim) {
    None | Some("") => Ok(StudyMode::default()),
    Some(mode) => mode.parse().map_err(FLError::Argument),
  }
}

fn deck_titles<S: Store>(
  store: &mut S,
  sessions: &[StudySession],
) -> Result<HashMap<i32, String>, FLError> {
  let ids: Vec<i32> = sessions.iter().map(|s| s.deck_id).collect();
  Ok(
    store
      .decks_by_ids(&ids)?
      .into_iter()
      .map(|deck| (deck.id, deck.title))
      .collect(),
  )
}

pub fn create<S: Store>(
  store: &mut S,
  request: SessionRequest,
  caller: &Caller,
) -> Result<StudySession, FLError> {
  if request.score < 0 || request.total_cards < 0 {
    return Err(FLError::argument("Score and total cards can not be negative"));
  }
  if !Repository::<Deck>::exists(store, request.deck_id)? {
    return Err(FLError::invalid("Deck does not exist"));
  }
  if request.total_cards > 0 && request.score > request.total_cards {
    return Err(FLError::invalid("Score can not exceed the number of cards"));
  }
  let mode = parse_mode(request.mode.as_deref())?;

  let session = Repository::<StudySession>::add(
    store,
    StudySession {
      id: 0,
      user_id: caller.user_id,
      deck_id: request.deck_id,
      score: request.score,
      total_cards: request.total_cards,
      mode,
      studied_at: now_millis(),
    },
  )?;
  Ok(session)
}

/// The caller's sessions, newest first.
pub fn my_history<S: Store>(store: &mut S, caller: &Caller) -> Result<Vec<HistoryEntry>, FLError> {
  let sessions = store.sessions_of_user(caller.user_id)?;
  let titles = deck_titles(store, &sessions)?;
  Ok(
    sessions
      .into_iter()
      .filter_map(|s| {
        let deck_title = titles.get(&s.deck_id)?.clone();
        Some(HistoryEntry {
          id: s.id,
          deck_id: s.deck_id,
          deck_title,
          score: s.score,
          total_cards: s.total_cards,
          mode: s.mode,
          studied_at: s.studied_at,
        })
      })
      .collect(),
  )
}

/// Each user's best session, highest score first. Equal scores go to whoever
/// got there first.
pub fn rank(mut sessions: Vec<StudySession>, limit: usize) -> Vec<StudySession> {
  sessions.sort_by(|a, b| {
    b.score
      .cmp(&a.score)
      .then(a.studied_at.cmp(&b.studied_at))
      .then(a.id.cmp(&b.id))
  });
  let mut seen = HashSet::new();
  sessions
    .into_iter()
    .filter(|s| seen.insert(s.user_id))
    .take(limit)
    .collect()
}

pub fn leaderboard<S: Store>(
  store: &mut S,
  deck_id: i32,
) -> Result<Vec<LeaderboardEntry>, FLError> {
  let deck: Deck = load(store, deck_id)?;
  let best = rank(store.sessions_for_deck(deck.id)?, LEADERBOARD_SIZE);
  let user_ids: Vec<i32> = best.iter().map(|s| s.user_id).collect();
  let users: HashMap<i32, _> = store
    .users_by_ids(&user_ids)?
    .into_iter()
    .map(|u| (u.id, u))
    .collect();

  Ok(
    best
      .into_iter()
      .map(|s| {
        let user = users.get(&s.user_id);
        LeaderboardEntry {
          user_id: s.user_id,
          username: user.map_or_else(|| String::from("Unknown"), |u| u.username.clone()),
          avatar: user.and_then(|u| u.avatar_url.clone()),
          score: s.score,
          total_cards: s.total_cards,
          date: s.studied_at,
        }
      })
      .collect(),
  )
}

/// Every recorded session. Callers check for the admin role.
pub fn all_history<S: Store>(store: &mut S) -> Result<Vec<AdminHistoryEntry>, FLError> {
  let sessions = store.all_sessions()?;
  let titles = deck_titles(store, &sessions)?;
  let user_ids: Vec<i32> = sessions.iter().map(|s| s.user_id).collect();
  let usernames: HashMap<i32, String> = store
    .users_by_ids(&user_ids)?
    .into_iter()
    .map(|u| (u.id, u.username))
    .collect();

  Ok(
    sessions
      .into_iter()
      .map(|s| AdminHistoryEntry {
        id: s.id,
        user_id: s.user_id,
        username: usernames.get(&s.user_id).cloned().unwrap_or_default(),
        deck_id: s.deck_id,
        deck_title: titles.get(&s.deck_id).cloned().unwrap_or_default(),
        score: s.score,
        total_cards: s.total_cards,
        mode: s.mode,
        studied_at: s.studied_at,
      })
      .collect(),
  )
}

pub fn delete_session<S: Store>(store: &mut S, id: i32) -> Result<(), FLError> {
  let session: StudySession = load(store, id)?;
  Repository::<StudySession>::delete(store, &session)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn session(id: i32, user_id: i32, score: i32, studied_at: i64) -> StudySession {
    StudySession {
      id,
      user_id,
      deck_id: 1,
      score,
      total_cards: 10,
      mode: StudyMode::Quiz,
      studied_at,
    }
  }

  #[test]
  fn keeps_best_session_per_user() {
    let ranked = rank(
      vec![
        session(1, 1, 9, 100),
        session(2, 1, 10, 300),
        session(3, 2, 10, 200),
      ],
      LEADERBOARD_SIZE,
    );
    let order: Vec<(i32, i32)> = ranked.iter().map(|s| (s.user_id, s.score)).collect();
    assert_eq!(order, vec![(2, 10), (1, 10)]);
  }

  #[test]
  fn truncates_to_limit() {
    let sessions = (1..=15).map(|i| session(i, i, i, 0)).collect();
    let ranked = rank(sessions, LEADERBOARD_SIZE);
    assert_eq!(ranked.len(), LEADERBOARD_SIZE);
    assert_eq!(ranked[0].score, 15);
    assert_eq!(ranked[9].score, 6);
  }

  #[test]
  fn parses_modes() {
    assert_eq!(parse_mode(None).unwrap(), StudyMode::Flashcard);
    assert_eq!(parse_mode(Some("  ")).unwrap(), StudyMode::Flashcard);
    assert_eq!(parse_mode(Some("quiz")).unwrap(), StudyMode::Quiz);
    assert!(parse_mode(Some("speed")).is_err());
  }
}

use crate::{
  db::{
    models::{Deck, Folder},
    now_millis, Repository, Store,
  },
  domain::{
    deck::{with_counts, DeckResponse},
    load, optional_text, required_text, Caller,
  },
  FLError,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRequest {
  pub name: String,
  pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderResponse {
  pub id: i32,
  pub name: String,
  pub description: Option<String>,
  pub user_id: i32,
  pub created_at: i64,
  pub deck_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDetail {
  pub id: i32,
  pub name: String,
  pub description: Option<String>,
  pub user_id: i32,
  pub created_at: i64,
  pub decks: Vec<DeckResponse>,
}

impl FolderResponse {
  fn new(folder: Folder, deck_count: i64) -> Self {
    FolderResponse {
      id: folder.id,
      name: folder.name,
      description: folder.description,
      user_id: folder.user_id,
      created_at: folder.created_at,
      deck_count,
    }
  }
}

fn validate(request: &FolderRequest) -> Result<(String, Option<String>), FLError> {
  Ok((
    required_text(&request.name, "Name", 200)?,
    optional_text(request.description.as_deref(), "Description", 1000)?,
  ))
}

/// Folders are never shared, so a foreign folder is reported as forbidden
/// rather than missing.
fn owned_folder<S: Store>(store: &mut S, id: i32, caller: &Caller) -> Result<Folder, FLError> {
  let folder: Folder = load(store, id)?;
  if folder.user_id != caller.user_id {
    return Err(FLError::unauthorized("Folder belongs to another user"));
  }
  Ok(folder)
}

fn ensure_unique_name<S: Store>(
  store: &mut S,
  user_id: i32,
  name: &str,
  editing: Option<i32>,
) -> Result<(), FLError> {
  match store.folder_by_name(user_id, name)? {
    Some(existing) if Some(existing.id) != editing => Err(FLError::InvalidOperation(format!(
      "A folder named {} already exists",
      name
    ))),
    _ => Ok(()),
  }
}

pub fn list_for_user<S: Store>(
  store: &mut S,
  caller: &Caller,
) -> Result<Vec<FolderResponse>, FLError> {
  let folders = store.folders_owned_by(caller.user_id)?;
  let ids: Vec<i32> = folders.iter().map(|f| f.id).collect();
  let counts = store.deck_counts_by_folder(&ids)?;
  Ok(
    folders
      .into_iter()
      .map(|folder| {
        let count = counts.get(&folder.id).cloned().unwrap_or(0);
        FolderResponse::new(folder, count)
      })
      .collect(),
  )
}

pub fn get_by_id<S: Store>(
  store: &mut S,
  id: i32,
  caller: &Caller,
) -> Result<FolderDetail, FLError> {
  let folder = owned_folder(store, id, caller)?;
  let decks = store.decks_in_folder(folder.id)?;
  Ok(FolderDetail {
    id: folder.id,
    name: folder.name,
    description: folder.description,
    user_id: folder.user_id,
    created_at: folder.created_at,
    decks: with_counts(store, decks)?,
  })
}

pub fn create<S: Store>(
  store: &mut S,
  request: FolderRequest,
  caller: &Caller,
) -> Result<FolderResponse, FLError> {
  let (name, description) = validate(&request)?;
  ensure_unique_name(store, caller.user_id, &name, None)?;

  let folder = Repository::<Folder>::add(
    store,
    Folder {
      id: 0,
      name,
      description,
      user_id: caller.user_id,
      created_at: now_millis(),
    },
  )?;
  Ok(FolderResponse::new(folder, 0))
}

pub fn update<S: Store>(
  store: &mut S,
  id: i32,
  request: FolderRequest,
  caller: &Caller,
) -> Result<(), FLError> {
  let mut folder = owned_folder(store, id, caller)?;
  let (name, description) = validate(&request)?;
  ensure_unique_name(store, caller.user_id, &name, Some(folder.id))?;

  folder.name = name;
  folder.description = description;
  Repository::<Folder>::update(store, &folder)?;
  Ok(())
}

/// Contained decks survive: they are moved out of the folder first.
pub fn delete<S: Store>(store: &mut S, id: i32, caller: &Caller) -> Result<(), FLError> {
  let folder: Folder = load(store, id)?;
  if !caller.may_modify(folder.user_id) {
    return Err(FLError::unauthorized("Only the owner may delete this folder"));
  }

  store.transaction(|store| {
    let decks = store.decks_in_folder(folder.id)?;
    for mut deck in decks {
      deck.folder_id = None;
      Repository::<Deck>::update(store, &deck)?;
    }
    Repository::<Folder>::delete(store, &folder)?;
    Ok(())
  })?;
  info!("Folder {} deleted by user {}", folder.id, caller.user_id);
  Ok(())
}

pub fn list_unassigned_decks<S: Store>(
  store: &mut S,
  caller: &Caller,
) -> Result<Vec<DeckResponse>, FLError> {
  let decks = store.unassigned_decks(caller.user_id)?;
  with_counts(store, decks)
}

use actix_web::{
  web::{Data, Query},
  HttpResponse,
};

use crate::{
  db::Backend,
  domain::{
    dictionary::{validate_word, DictionaryCache},
    Caller,
  },
  service::AppState,
  FLError,
};

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
  #[serde(default)]
  word: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
  pub word: String,
  pub meaning: String,
  pub success: bool,
}

pub async fn lookup<B: Backend>(
  _: Caller,
  state: Data<AppState<B>>,
  query: Query<LookupQuery>,
) -> Result<HttpResponse, FLError> {
  let word = validate_word(&query.word)?;
  let response = state
    .run(move |store, dictionary| {
      let meaning = DictionaryCache::new(dictionary).lookup_meaning(store, &word);
      Ok(LookupResponse {
        success: !meaning.is_empty(),
        word,
        meaning,
      })
    })
    .await?;
  Ok(HttpResponse::Ok().json(response))
}

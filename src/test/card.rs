#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use crate::{
    db::{memory::MemoryStore, models::Role, Backend, StoreError, StoreResult},
    domain::{
      card::{self, FlashcardRequest},
      deck::{self, DeckRequest},
      Caller,
    },
    service::AppState,
    test::{seed_user, FakeDictionary},
    FLError,
  };

  /// A backend whose connection pool is exhausted.
  #[derive(Clone)]
  struct Exhausted;

  impl Backend for Exhausted {
    type Store = MemoryStore;

    fn store(&self) -> StoreResult<MemoryStore> {
      Err(StoreError::Pool(String::from("timed out waiting for connection")))
    }
  }

  const AUDIO: &str = "https://api.dictionaryapi.dev/media/pronunciations/en/hello-us.mp3";

  fn setup(is_public: bool) -> (MemoryStore, Caller, Caller, i32) {
    let mut store = MemoryStore::new();
    let alice = seed_user(&mut store, "Alice", Role::User);
    let bob = seed_user(&mut store, "Bob", Role::User);
    let deck = deck::create(
      &mut store,
      DeckRequest {
        title: String::from("Vocab"),
        is_public,
        ..Default::default()
      },
      &alice,
    )
    .unwrap();
    (store, alice, bob, deck.id)
  }

  fn hello(deck_id: i32) -> FlashcardRequest {
    FlashcardRequest {
      deck_id,
      term: String::from("hello"),
      definition: String::new(),
      ..Default::default()
    }
  }

  #[test]
  fn test_audio_is_fetched_when_missing() {
    let (mut store, alice, _, deck_id) = setup(false);
    let dictionary = FakeDictionary::with_audio(AUDIO);

    let created = card::create(&mut store, &dictionary, hello(deck_id), &alice).unwrap();
    assert_eq!(created.audio_url.as_deref(), Some(AUDIO));
    assert_eq!(created.example.as_deref(), Some(""));
    assert_eq!(created.image_url.as_deref(), Some(""));
    assert_eq!(created.definition, "");
    assert_eq!(dictionary.calls(), 1);

    let fetched = card::get(&mut store, created.id, &alice).unwrap();
    assert_eq!(fetched, created);
  }

  #[test]
  fn test_enrichment_failure_does_not_block_creation() {
    let (mut store, alice, _, deck_id) = setup(false);
    let dictionary = FakeDictionary::unreachable();

    let created = card::create(&mut store, &dictionary, hello(deck_id), &alice).unwrap();
    assert_eq!(created.audio_url.as_deref(), Some(""));

    let nothing_known = FakeDictionary::default();
    let created = card::create(&mut store, &nothing_known, hello(deck_id), &alice).unwrap();
    assert_eq!(created.audio_url.as_deref(), Some(""));
  }

  #[test]
  fn test_supplied_audio_skips_lookup() {
    let (mut store, alice, _, deck_id) = setup(false);
    let dictionary = FakeDictionary::with_audio(AUDIO);
    let mut request = hello(deck_id);
    request.audio_url = Some(String::from("https://cdn.example/custom.mp3"));

    let created = card::create(&mut store, &dictionary, request, &alice).unwrap();
    assert_eq!(
      created.audio_url.as_deref(),
      Some("https://cdn.example/custom.mp3")
    );
    assert_eq!(dictionary.calls(), 0);
  }

  #[actix_rt::test]
  async fn test_audio_lookup_needs_no_store() {
    let state = AppState::new(Exhausted, Arc::new(FakeDictionary::with_audio(AUDIO)));

    let audio = state
      .enrich(|dictionary| card::resolve_audio(dictionary, &hello(1)))
      .await
      .unwrap();
    assert_eq!(audio, AUDIO);
    assert!(matches!(
      state.run(|_, _| Ok(())).await,
      Err(FLError::Store(StoreError::Pool(_)))
    ));
  }

  #[test]
  fn test_resolve_audio() {
    let dictionary = FakeDictionary::with_audio(AUDIO);
    let mut blank = hello(1);
    blank.term = String::from(" ");
    assert_eq!(card::resolve_audio(&dictionary, &blank), "");
    assert_eq!(dictionary.calls(), 0);

    let (mut store, alice, bob, deck_id) = setup(false);
    let created = card::create_with_audio(&mut store, hello(deck_id), String::new(), &alice)
      .unwrap();
    assert_eq!(created.audio_url.as_deref(), Some(""));
    assert!(matches!(
      card::create_with_audio(&mut store, hello(deck_id), String::new(), &bob),
      Err(FLError::Unauthorized(_))
    ));
  }

  #[test]
  fn test_create_checks_deck() {
    let (mut store, alice, bob, deck_id) = setup(true);
    let admin = seed_user(&mut store, "Root", Role::Admin);
    let dictionary = FakeDictionary::default();

    assert!(matches!(
      card::create(&mut store, &dictionary, hello(deck_id + 50), &alice),
      Err(FLError::InvalidOperation(_))
    ));
    assert!(matches!(
      card::create(&mut store, &dictionary, hello(deck_id), &bob),
      Err(FLError::Unauthorized(_))
    ));
    let mut blank = hello(deck_id);
    blank.term = String::from("  ");
    assert!(matches!(
      card::create(&mut store, &dictionary, blank, &alice),
      Err(FLError::Argument(_))
    ));
    assert!(card::create(&mut store, &dictionary, hello(deck_id), &admin).is_ok());
  }

  #[test]
  fn test_private_card_is_forbidden() {
    let (mut store, alice, bob, deck_id) = setup(false);
    let admin = seed_user(&mut store, "Root", Role::Admin);
    let created = card::create(&mut store, &FakeDictionary::default(), hello(deck_id), &alice)
      .unwrap();

    assert!(matches!(
      card::get(&mut store, created.id, &bob),
      Err(FLError::Unauthorized(_))
    ));
    assert!(card::get(&mut store, created.id, &admin).is_ok());
  }

  #[test]
  fn test_public_card_is_readable_but_not_writable() {
    let (mut store, alice, bob, deck_id) = setup(true);
    let created = card::create(&mut store, &FakeDictionary::default(), hello(deck_id), &alice)
      .unwrap();

    assert!(card::get(&mut store, created.id, &bob).is_ok());
    let mut request = hello(deck_id);
    request.id = Some(created.id);
    assert!(matches!(
      card::update(&mut store, created.id, request, &bob),
      Err(FLError::Unauthorized(_))
    ));
    assert!(matches!(
      card::delete(&mut store, created.id, &bob),
      Err(FLError::Unauthorized(_))
    ));
  }

  #[test]
  fn test_update_touches_only_content() {
    let (mut store, alice, _, deck_id) = setup(false);
    let dictionary = FakeDictionary::with_audio(AUDIO);
    let created = card::create(&mut store, &dictionary, hello(deck_id), &alice).unwrap();

    let mismatched = FlashcardRequest {
      id: Some(created.id + 1),
      ..hello(deck_id)
    };
    assert!(matches!(
      card::update(&mut store, created.id, mismatched, &alice),
      Err(FLError::Argument(_))
    ));

    let other_deck = deck::create(
      &mut store,
      DeckRequest {
        title: String::from("Other"),
        ..Default::default()
      },
      &alice,
    )
    .unwrap();
    let edit = FlashcardRequest {
      id: Some(created.id),
      deck_id: other_deck.id,
      term: String::from("hi"),
      definition: String::from("xin chào"),
      example: Some(String::from("Hi there!")),
      image_url: None,
      audio_url: Some(String::from("https://cdn.example/ignored.mp3")),
    };
    card::update(&mut store, created.id, edit, &alice).unwrap();

    let updated = card::get(&mut store, created.id, &alice).unwrap();
    assert_eq!(updated.term, "hi");
    assert_eq!(updated.definition, "xin chào");
    assert_eq!(updated.example.as_deref(), Some("Hi there!"));
    assert_eq!(updated.audio_url.as_deref(), Some(AUDIO));
    assert_eq!(updated.deck_id, deck_id);
  }

  #[test]
  fn test_delete() {
    let (mut store, alice, _, deck_id) = setup(false);
    let created = card::create(&mut store, &FakeDictionary::default(), hello(deck_id), &alice)
      .unwrap();

    card::delete(&mut store, created.id, &alice).unwrap();
    assert!(matches!(
      card::get(&mut store, created.id, &alice),
      Err(FLError::NotFound)
    ));
    assert!(matches!(
      card::delete(&mut store, created.id, &alice),
      Err(FLError::NotFound)
    ));
  }
}

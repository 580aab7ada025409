#[cfg(test)]
mod tests {
  use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
  };
  use serde_json::{json, Value};

  use crate::{
    db::models::{Flashcard, Role},
    domain::{
      auth::{LoginResponse, RegisterResponse},
      deck::{DeckDetail, DeckResponse},
      folder::FolderResponse,
    },
    test::{bearer, init, seed_user, FakeDictionary, PASSWORD},
  };

  const AUDIO: &str = "https://api.dictionaryapi.dev/media/pronunciations/en/hello-us.mp3";

  #[actix_rt::test]
  async fn test_end_to_end_scenario() {
    let (_, state, auth) = init(FakeDictionary::with_audio(AUDIO));
    let app = test_app!(state, auth);

    let mut tokens = Vec::new();
    for name in &["alice", "bob"] {
      let req = TestRequest::post()
        .uri("/auth/register")
        .set_json(&json!({
          "username": name,
          "email": format!("{}@example.com", name),
          "password": "correct horse",
        }))
        .to_request();
      let resp = test::call_service(&app, req).await;
      assert_eq!(resp.status(), StatusCode::OK, "Failed to register {}", name);
      let registered: RegisterResponse = test::read_body_json(resp).await;

      let req = TestRequest::post()
        .uri("/auth/login")
        .set_json(&json!({
          "email": format!("{}@example.com", name),
          "password": "correct horse",
        }))
        .to_request();
      let resp = test::call_service(&app, req).await;
      assert!(resp.status().is_success(), "Login failed");
      let login: LoginResponse = test::read_body_json(resp).await;
      assert_eq!(login.user_id, registered.user_id);
      assert_eq!(login.role, Role::User);
      tokens.push(format!("Bearer {}", login.token));
    }
    let (alice, bob) = (tokens[0].clone(), tokens[1].clone());

    let req = TestRequest::post()
      .uri("/folders")
      .insert_header(("Authorization", alice.clone()))
      .set_json(&json!({ "name": "IELTS" }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "Failed to create folder");
    let folder: FolderResponse = test::read_body_json(resp).await;

    let req = TestRequest::post()
      .uri("/decks")
      .insert_header(("Authorization", alice.clone()))
      .set_json(&json!({ "title": "Vocab 1", "folderId": folder.id }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "Failed to create deck");
    let deck: DeckResponse = test::read_body_json(resp).await;
    assert_eq!(deck.folder_id, Some(folder.id));
    assert!(!deck.is_public);

    let req = TestRequest::post()
      .uri("/flashcards")
      .insert_header(("Authorization", alice.clone()))
      .set_json(&json!({ "deckId": deck.id, "term": "hello", "definition": "" }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "Failed to create flashcard");
    let card: Flashcard = test::read_body_json(resp).await;

    let req = TestRequest::get()
      .uri(&format!("/flashcards/{}", card.id))
      .insert_header(("Authorization", alice.clone()))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Flashcard = test::read_body_json(resp).await;
    assert_eq!(fetched.audio_url.as_deref(), Some(AUDIO));
    assert_eq!(fetched.deck_id, deck.id);

    let req = TestRequest::get()
      .uri(&format!("/decks/{}", deck.id))
      .insert_header(("Authorization", alice.clone()))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let detail: DeckDetail = test::read_body_json(resp).await;
    assert_eq!(detail.deck.flashcard_count, 1);
    assert_eq!(detail.deck.folder_id, Some(folder.id));
    assert_eq!(detail.flashcards, vec![fetched]);

    let req = TestRequest::get()
      .uri(&format!("/decks/{}", deck.id))
      .insert_header(("Authorization", bob.clone()))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::get()
      .uri(&format!("/flashcards/{}", card.id))
      .insert_header(("Authorization", bob))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[actix_rt::test]
  async fn test_authentication_is_required() {
    let (_, state, auth) = init(FakeDictionary::default());
    let app = test_app!(state, auth);

    let req = TestRequest::get().uri("/decks").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::get()
      .uri("/decks")
      .insert_header(("Authorization", "Bearer not-a-token"))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());

    let req = TestRequest::post()
      .uri("/auth/login")
      .set_json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[actix_rt::test]
  async fn test_admin_routes() {
    let (mut store, state, auth) = init(FakeDictionary::default());
    let admin = seed_user(&mut store, "Root", Role::Admin);
    let alice = seed_user(&mut store, "Alice", Role::User);
    let app = test_app!(state, auth);

    let req = TestRequest::get()
      .uri("/users")
      .insert_header(("Authorization", bearer(&auth, &alice)))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = TestRequest::get()
      .uri("/users")
      .insert_header(("Authorization", bearer(&auth, &admin)))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let users: Value = test::read_body_json(resp).await;
    assert_eq!(users[0]["username"], json!("Alice"));
    assert!(users[0].get("passwordHash").is_none());

    let req = TestRequest::get()
      .uri("/study-sessions/admin/all-history")
      .insert_header(("Authorization", bearer(&auth, &alice)))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = TestRequest::delete()
      .uri(&format!("/users/{}", admin.user_id))
      .insert_header(("Authorization", bearer(&auth, &admin)))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::delete()
      .uri(&format!("/users/{}", alice.user_id))
      .insert_header(("Authorization", bearer(&auth, &admin)))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = TestRequest::get()
      .uri("/users/profile")
      .insert_header(("Authorization", bearer(&auth, &alice)))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[actix_rt::test]
  async fn test_bad_requests() {
    let (mut store, state, auth) = init(FakeDictionary::default());
    let alice = seed_user(&mut store, "Alice", Role::User);
    let token = bearer(&auth, &alice);
    let app = test_app!(state, auth);

    let req = TestRequest::post()
      .uri("/decks")
      .insert_header(("Authorization", token.clone()))
      .insert_header(("Content-Type", "application/json"))
      .set_payload("{ \"title\": ")
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Malformed"));

    let req = TestRequest::post()
      .uri("/decks")
      .insert_header(("Authorization", token.clone()))
      .set_json(&json!({ "title": "Vocab" }))
      .to_request();
    let deck: DeckResponse = test::read_body_json(test::call_service(&app, req).await).await;

    let req = TestRequest::post()
      .uri("/study-sessions")
      .insert_header(("Authorization", token.clone()))
      .set_json(&json!({ "deckId": deck.id, "score": 6, "totalCards": 5 }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
      .uri("/study-sessions")
      .insert_header(("Authorization", token.clone()))
      .set_json(&json!({ "deckId": deck.id, "score": 5, "totalCards": 5, "mode": "Match" }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = TestRequest::get()
      .uri(&format!("/study-sessions/leaderboard/{}", deck.id))
      .insert_header(("Authorization", token.clone()))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let board: Value = test::read_body_json(resp).await;
    assert_eq!(board[0]["username"], json!("Alice"));
    assert_eq!(board[0]["score"], json!(5));

    let req = TestRequest::put()
      .uri("/flashcards/1")
      .insert_header(("Authorization", token))
      .set_json(&json!({ "id": 2, "deckId": deck.id, "term": "a", "definition": "b" }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[actix_rt::test]
  async fn test_folder_routes() {
    let (mut store, state, auth) = init(FakeDictionary::default());
    let alice = seed_user(&mut store, "Alice", Role::User);
    let token = bearer(&auth, &alice);
    let app = test_app!(state, auth);

    let req = TestRequest::post()
      .uri("/decks")
      .insert_header(("Authorization", token.clone()))
      .set_json(&json!({ "title": "Loose" }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = TestRequest::get()
      .uri("/folders/unassigned-decks")
      .insert_header(("Authorization", token.clone()))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let decks: Vec<DeckResponse> = test::read_body_json(resp).await;
    assert_eq!(decks.len(), 1);
    assert_eq!(decks[0].title, "Loose");

    for expected in &[StatusCode::CREATED, StatusCode::BAD_REQUEST] {
      let req = TestRequest::post()
        .uri("/folders")
        .insert_header(("Authorization", token.clone()))
        .set_json(&json!({ "name": "Travel" }))
        .to_request();
      let resp = test::call_service(&app, req).await;
      assert_eq!(resp.status(), *expected);
    }

    let req = TestRequest::get()
      .uri("/folders")
      .insert_header(("Authorization", token))
      .to_request();
    let folders: Vec<FolderResponse> =
      test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].deck_count, 0);
  }

  #[actix_rt::test]
  async fn test_dictionary_lookup() {
    let (mut store, state, auth) = init(FakeDictionary::with_translation("xin chào"));
    let alice = seed_user(&mut store, "Alice", Role::User);
    let token = bearer(&auth, &alice);
    let app = test_app!(state, auth);

    let req = TestRequest::get()
      .uri("/dictionary/lookup?word=Hello")
      .insert_header(("Authorization", token.clone()))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
      body,
      json!({ "word": "hello", "meaning": "xin chào", "success": true })
    );

    let req = TestRequest::get()
      .uri("/dictionary/lookup?word=%20%20")
      .insert_header(("Authorization", token))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }
}

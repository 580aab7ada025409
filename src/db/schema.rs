table! {
    use diesel::sql_types::*;

    users (id) {
        id -> Int4,
        username -> Varchar,
        email -> Varchar,
        password_hash -> Varchar,
        role -> Varchar,
        avatar_url -> Nullable<Text>,
        created_at -> Int8,
    }
}

table! {
    use diesel::sql_types::*;

    folders (id) {
        id -> Int4,
        name -> Varchar,
        description -> Nullable<Text>,
        user_id -> Int4,
        created_at -> Int8,
    }
}

table! {
    use diesel::sql_types::*;

    decks (id) {
        id -> Int4,
        title -> Varchar,
        description -> Text,
        is_public -> Bool,
        user_id -> Int4,
        folder_id -> Nullable<Int4>,
        created_at -> Int8,
    }
}

table! {
    use diesel::sql_types::*;

    flashcards (id) {
        id -> Int4,
        deck_id -> Int4,
        term -> Text,
        definition -> Text,
        example -> Nullable<Text>,
        image_url -> Nullable<Text>,
        audio_url -> Nullable<Text>,
        created_at -> Int8,
    }
}

table! {
    use diesel::sql_types::*;

    study_sessions (id) {
        id -> Int4,
        user_id -> Int4,
        deck_id -> Int4,
        score -> Int4,
        total_cards -> Int4,
        mode -> Varchar,
        studied_at -> Int8,
    }
}

table! {
    use diesel::sql_types::*;

    dictionary_entries (id) {
        id -> Int4,
        word -> Varchar,
        meaning -> Text,
        cached_at -> Int8,
    }
}

joinable!(decks -> folders (folder_id));
joinable!(decks -> users (user_id));
joinable!(flashcards -> decks (deck_id));
joinable!(folders -> users (user_id));
joinable!(study_sessions -> decks (deck_id));
joinable!(study_sessions -> users (user_id));

allow_tables_to_appear_in_same_query!(
    decks,
    dictionary_entries,
    flashcards,
    folders,
    study_sessions,
    users,
);

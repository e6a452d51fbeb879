//! Full user journeys composed from the service layer, all four backends
//! faked in memory.

use std::sync::Arc;

use bg_core::types::{Credentials, NewBook, NewUser};
use social::{
    AuthService, CatalogService, RecommendationEngine, SessionGuard, TokenIssuer, WriteCoordinator,
};
use testing::{InMemoryCatalogStore, InMemoryGraphStore, InMemoryIdentityStore, InMemorySessionCache};

struct App {
    coordinator: WriteCoordinator,
    auth: AuthService,
    guard: SessionGuard,
    catalog: CatalogService,
    engine: RecommendationEngine,
}

fn app() -> App {
    let identity = Arc::new(InMemoryIdentityStore::new());
    let catalog = Arc::new(InMemoryCatalogStore::new());
    let cache = Arc::new(InMemorySessionCache::new());
    let graph = Arc::new(InMemoryGraphStore::new());
    let tokens = Arc::new(TokenIssuer::new("a-test-secret-of-sufficient-length", 30));

    App {
        coordinator: WriteCoordinator::new(identity.clone(), catalog.clone(), graph.clone()),
        auth: AuthService::new(identity, cache.clone(), tokens.clone()),
        guard: SessionGuard::new(tokens, cache),
        catalog: CatalogService::new(catalog),
        engine: RecommendationEngine::new(graph),
    }
}

fn signup(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: format!("{username}-password-1"),
    }
}

#[tokio::test]
async fn signup_login_follow_then_recommendations_are_empty() {
    let app = app();
    let alice = app.coordinator.register_user(&signup("alice")).await.unwrap();
    let bob = app.coordinator.register_user(&signup("bob")).await.unwrap();

    let login = app
        .auth
        .login(&Credentials {
            email: "alice@example.com".to_string(),
            password: "alice-password-1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(login.user_id, alice.id);
    assert_eq!(login.token, login.access_token);
    assert_eq!(login.token_type, "bearer");

    let authed = app
        .guard
        .authorize(Some(&format!("Bearer {}", login.token)))
        .await
        .unwrap();
    assert_eq!(authed.user_id, alice.id);

    app.coordinator.create_follow(alice.id, bob.id).await.unwrap();
    assert!(app.coordinator.follow_status(alice.id, bob.id).await.unwrap());

    // Bob follows nobody and rated nothing, so both traversals are empty.
    assert!(app.engine.recommend_users(alice.id, 10).await.unwrap().is_empty());
    assert!(app.engine.recommend_books(alice.id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn wrong_password_never_opens_a_session() {
    let app = app();
    app.coordinator.register_user(&signup("alice")).await.unwrap();

    let err = app
        .auth
        .login(&Credentials {
            email: "alice@example.com".to_string(),
            password: "not-her-password".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UNAUTHENTICATED");
}

#[tokio::test]
async fn duplicate_isbn_is_a_conflict() {
    let app = app();
    let book = NewBook {
        title: "Dune".to_string(),
        author: "Frank Herbert".to_string(),
        isbn: "9780441013593".to_string(),
        publication_year: 1965,
        cover_url: None,
    };
    app.catalog.create_book(&book).await.unwrap();

    let dup = NewBook {
        title: "Dune (reissue)".to_string(),
        ..book
    };
    let err = app.catalog.create_book(&dup).await.unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
    assert_eq!(app.catalog.list_books(10, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn review_flow_feeds_book_recommendations() {
    let app = app();
    let alice = app.coordinator.register_user(&signup("alice")).await.unwrap();
    let bob = app.coordinator.register_user(&signup("bob")).await.unwrap();
    app.coordinator.create_follow(alice.id, bob.id).await.unwrap();

    let book = app
        .catalog
        .create_book(&NewBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: "9780441013593".to_string(),
            publication_year: 1965,
            cover_url: None,
        })
        .await
        .unwrap();

    app.coordinator
        .create_review(
            bob.id,
            &book.id,
            &bg_core::types::NewReview {
                rating: 5,
                review_text: Some("a classic".to_string()),
            },
        )
        .await
        .unwrap();

    let recs = app.engine.recommend_books(alice.id, 10).await.unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].book_id, book.id);
    assert_eq!(recs[0].score, 1);

    let reviews = app
        .coordinator
        .reviews_for_book(&book.id, 10, 0)
        .await
        .unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].rating, 5);
}

//! Write-coordination behavior against the in-memory store fakes:
//! conflict detection, idempotent follows, and tolerance of graph-store
//! outages during secondary writes.

use std::sync::Arc;

use bg_core::traits::CatalogStore;
use bg_core::types::{NewBook, NewReview, NewUser};
use social::WriteCoordinator;
use testing::{
    InMemoryCatalogStore, InMemoryGraphStore, InMemoryIdentityStore, UnavailableGraphStore,
};

fn signup(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: "correct horse battery".to_string(),
    }
}

fn sample_book() -> NewBook {
    NewBook {
        title: "Snow Crash".to_string(),
        author: "Neal Stephenson".to_string(),
        isbn: "9780553380958".to_string(),
        publication_year: 1992,
        cover_url: None,
    }
}

struct Fixture {
    identity: Arc<InMemoryIdentityStore>,
    catalog: Arc<InMemoryCatalogStore>,
    graph: Arc<InMemoryGraphStore>,
    coordinator: WriteCoordinator,
}

fn fixture() -> Fixture {
    let identity = Arc::new(InMemoryIdentityStore::new());
    let catalog = Arc::new(InMemoryCatalogStore::new());
    let graph = Arc::new(InMemoryGraphStore::new());
    let coordinator = WriteCoordinator::new(identity.clone(), catalog.clone(), graph.clone());
    Fixture {
        identity,
        catalog,
        graph,
        coordinator,
    }
}

/// Same fixture, but with a graph store that fails every call.
fn fixture_with_graph_down() -> (Arc<InMemoryIdentityStore>, WriteCoordinator) {
    let identity = Arc::new(InMemoryIdentityStore::new());
    let catalog = Arc::new(InMemoryCatalogStore::new());
    let coordinator = WriteCoordinator::new(
        identity.clone(),
        catalog,
        Arc::new(UnavailableGraphStore::new()),
    );
    (identity, coordinator)
}

#[tokio::test]
async fn signup_mirrors_a_user_node() {
    let f = fixture();
    let user = f.coordinator.register_user(&signup("ada", "ada@example.com")).await.unwrap();
    assert!(user.id > 0);
    assert!(f.graph.user_node_exists(user.id));
}

#[tokio::test]
async fn duplicate_email_is_a_conflict_and_creates_no_second_record() {
    let f = fixture();
    f.coordinator.register_user(&signup("ada", "ada@example.com")).await.unwrap();

    let err = f
        .coordinator
        .register_user(&signup("ada2", "ada@example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
    assert_eq!(f.identity.user_count(), 1);
}

#[tokio::test]
async fn password_is_hashed_before_persisting() {
    let f = fixture();
    let user = f.coordinator.register_user(&signup("ada", "ada@example.com")).await.unwrap();
    assert_ne!(user.password_hash, "correct horse battery");
    assert!(social::auth::verify_password(
        "correct horse battery",
        &user.password_hash
    ));
}

#[tokio::test]
async fn signup_survives_graph_outage() {
    let (identity, coordinator) = fixture_with_graph_down();
    let user = coordinator.register_user(&signup("ada", "ada@example.com")).await.unwrap();
    assert!(user.id > 0);
    assert_eq!(identity.user_count(), 1);
}

#[tokio::test]
async fn self_follow_is_rejected_without_any_write() {
    let f = fixture();
    let err = f.coordinator.create_follow(3, 3).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
    assert_eq!(f.identity.follow_count(), 0);
}

#[tokio::test]
async fn double_follow_converges_to_one_edge_everywhere() {
    let f = fixture();
    let a = f.coordinator.register_user(&signup("a", "a@example.com")).await.unwrap();
    let b = f.coordinator.register_user(&signup("b", "b@example.com")).await.unwrap();

    let first = f.coordinator.create_follow(a.id, b.id).await.unwrap();
    assert!(first.created_at.is_some());

    // Second call does not error; it reports the logical outcome.
    let second = f.coordinator.create_follow(a.id, b.id).await.unwrap();
    assert_eq!(second.follower_id, a.id);
    assert_eq!(second.followee_id, b.id);
    assert!(second.created_at.is_none());

    assert_eq!(f.identity.follow_count(), 1);
    assert_eq!(f.graph.follows_edge_count(a.id, b.id), 1);
}

#[tokio::test]
async fn follow_survives_graph_outage() {
    let (identity, coordinator) = fixture_with_graph_down();
    let a = coordinator.register_user(&signup("a", "a@example.com")).await.unwrap();
    let b = coordinator.register_user(&signup("b", "b@example.com")).await.unwrap();

    coordinator.create_follow(a.id, b.id).await.unwrap();
    assert_eq!(identity.follow_count(), 1);
    assert!(coordinator.follow_status(a.id, b.id).await.unwrap());
}

#[tokio::test]
async fn review_requires_an_existing_book() {
    let f = fixture();
    let user = f.coordinator.register_user(&signup("a", "a@example.com")).await.unwrap();

    let err = f
        .coordinator
        .create_review(
            user.id,
            "ffffffffffffffffffffffff",
            &NewReview {
                rating: 5,
                review_text: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(f.identity.review_count(), 0);
}

#[tokio::test]
async fn review_rating_bounds_are_enforced() {
    let f = fixture();
    for rating in [0, 6, -1] {
        let err = f
            .coordinator
            .create_review(
                1,
                "ffffffffffffffffffffffff",
                &NewReview {
                    rating,
                    review_text: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }
}

#[tokio::test]
async fn review_writes_durable_row_then_rated_edge() {
    let f = fixture();
    let user = f.coordinator.register_user(&signup("a", "a@example.com")).await.unwrap();
    let book = f.catalog.insert_book(&sample_book()).await.unwrap();

    let review = f
        .coordinator
        .create_review(
            user.id,
            &book.id,
            &NewReview {
                rating: 4,
                review_text: Some("dense but great".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(review.rating, 4);
    assert_eq!(f.graph.rating_state(user.id, &book.id), Some((4, false)));
}

#[tokio::test]
async fn re_rating_updates_the_edge_in_place() {
    let f = fixture();
    let user = f.coordinator.register_user(&signup("a", "a@example.com")).await.unwrap();
    let book = f.catalog.insert_book(&sample_book()).await.unwrap();

    let coordinator = &f.coordinator;
    let book_id = book.id.as_str();
    let rate = |rating| async move {
        coordinator
            .create_review(
                user.id,
                book_id,
                &NewReview {
                    rating,
                    review_text: None,
                },
            )
            .await
    };
    rate(3).await.unwrap();
    rate(5).await.unwrap();

    // One edge, updated in place rather than duplicated.
    assert_eq!(f.graph.rating_state(user.id, &book.id), Some((5, true)));
}

#[tokio::test]
async fn review_survives_graph_outage() {
    let identity = Arc::new(InMemoryIdentityStore::new());
    let catalog = Arc::new(InMemoryCatalogStore::new());
    let coordinator = WriteCoordinator::new(
        identity.clone(),
        catalog.clone(),
        Arc::new(UnavailableGraphStore::new()),
    );

    let user = coordinator.register_user(&signup("a", "a@example.com")).await.unwrap();
    let book = catalog.insert_book(&sample_book()).await.unwrap();

    coordinator
        .create_review(
            user.id,
            &book.id,
            &NewReview {
                rating: 5,
                review_text: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(identity.review_count(), 1);
}

#[tokio::test]
async fn repeated_follows_never_duplicate_the_graph_edge() {
    let f = fixture();
    let a = f.coordinator.register_user(&signup("a", "a@example.com")).await.unwrap();
    let b = f.coordinator.register_user(&signup("b", "b@example.com")).await.unwrap();

    f.coordinator.create_follow(a.id, b.id).await.unwrap();
    f.coordinator.create_follow(a.id, b.id).await.unwrap();
    f.coordinator.create_follow(a.id, b.id).await.unwrap();
    assert_eq!(f.graph.follows_edge_count(a.id, b.id), 1);
}

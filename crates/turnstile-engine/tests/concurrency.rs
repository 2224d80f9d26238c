//! Concurrency harness for the reservation engine on `SQLite`.
//!
//! Every test opens a fresh database file in a temporary directory and
//! drives the engine from many tokio tasks at once, then checks the
//! outcome against what is actually stored.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::collections::HashSet;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use turnstile_db::{Store, StoreConfig};
use turnstile_engine::{
    EngineBuildError, EngineConfig, ErrorKind, LockingMode, ReservationEngine, ReserveError,
};
use turnstile_types::{EventId, NewEvent, NewUser, Price, Reservation, TicketStatus, UserId};

async fn setup_sqlite(lock_timeout: Duration) -> (TempDir, Store) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("turnstile.db").display());
    let config = StoreConfig::new(&url)
        .with_acquire_timeout(Duration::from_secs(30))
        .with_lock_timeout(lock_timeout);
    let store = Store::connect(&config)
        .await
        .expect("Failed to open SQLite database");
    store
        .catalog
        .run_migrations()
        .await
        .expect("Failed to run migrations");
    (dir, store)
}

/// Writers queue on the database lock, so under heavy contention the wait
/// bound has to cover the whole queue.
async fn default_store() -> (TempDir, Store) {
    setup_sqlite(Duration::from_secs(30)).await
}

fn engine(store: &Store, config: EngineConfig) -> ReservationEngine {
    ReservationEngine::new(store.inventory.clone(), config).expect("Failed to build engine")
}

/// Generous timeout so pool queueing under heavy contention never trips it.
fn patient() -> EngineConfig {
    EngineConfig::default().with_transaction_timeout(Duration::from_secs(30))
}

async fn seed_users(store: &Store, count: usize) -> Vec<UserId> {
    let mut users = Vec::with_capacity(count);
    for n in 0..count {
        let user = store
            .catalog
            .create_user(&NewUser {
                name: format!("User {n}"),
                email: format!("user{n}@example.com"),
            })
            .await
            .expect("Failed to create user");
        users.push(user.id);
    }
    users
}

async fn seed_event(store: &Store, creator_id: UserId, ticket_count: u32) -> EventId {
    store
        .catalog
        .create_event(&NewEvent {
            name: "Concert 1".to_owned(),
            description: "Show top 1".to_owned(),
            date: Utc.with_ymd_and_hms(2026, 12, 31, 20, 0, 0).unwrap(),
            price: Price::from_cents(10_000).unwrap(),
            creator_id,
            ticket_count,
        })
        .await
        .expect("Failed to create event")
        .event
        .id
}

/// Fire one `reserve` per user, all at once, and collect the outcomes.
async fn reserve_concurrently(
    engine: &ReservationEngine,
    event_id: EventId,
    users: &[UserId],
) -> Vec<Result<Reservation, ReserveError>> {
    let handles: Vec<_> = users
        .iter()
        .map(|&user_id| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reserve(event_id, user_id).await })
        })
        .collect();

    futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("reservation task panicked"))
        .collect()
}

async fn reserved_count(store: &Store, event_id: EventId) -> usize {
    store
        .catalog
        .tickets_for_event(event_id)
        .await
        .unwrap()
        .iter()
        .filter(|t| t.status.is_reserved())
        .count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reservations_never_share_a_ticket() {
    let (_dir, store) = default_store().await;
    let users = seed_users(&store, 40).await;
    let event_id = seed_event(&store, users[0], 25).await;
    let engine = engine(&store, patient());
    assert_eq!(engine.locking_mode(), LockingMode::Serialized);

    let outcomes = reserve_concurrently(&engine, event_id, &users).await;

    let granted: Vec<&Reservation> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let sold_out = outcomes
        .iter()
        .filter(|r| matches!(r, Err(ReserveError::NoInventoryAvailable { .. })))
        .count();
    assert_eq!(granted.len(), 25, "{outcomes:?}");
    assert_eq!(sold_out, 15, "{outcomes:?}");

    let distinct: HashSet<_> = granted.iter().map(|r| r.ticket_id).collect();
    assert_eq!(distinct.len(), 25);

    // Every grant matches what the store holds for that ticket.
    let tickets = store.catalog.tickets_for_event(event_id).await.unwrap();
    for reservation in &granted {
        assert_eq!(reservation.event_id, event_id);
        let ticket = tickets
            .iter()
            .find(|t| t.id == reservation.ticket_id)
            .expect("granted ticket exists");
        assert_eq!(
            ticket.status,
            TicketStatus::Reserved {
                user_id: reservation.user_id,
                reserved_at: reservation.reserved_at,
            }
        );
    }
    assert!(tickets.iter().all(|t| t.status.is_reserved()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_users_race_for_last_ticket() {
    let (_dir, store) = default_store().await;
    let users = seed_users(&store, 2).await;
    let event_id = seed_event(&store, users[0], 1).await;
    let engine = engine(&store, patient());

    let outcomes = reserve_concurrently(&engine, event_id, &users).await;

    let kinds: Vec<Option<ErrorKind>> = outcomes
        .iter()
        .map(|r| r.as_ref().err().map(ReserveError::kind))
        .collect();
    assert_eq!(kinds.iter().filter(|k| k.is_none()).count(), 1, "{outcomes:?}");
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == Some(ErrorKind::NoInventoryAvailable))
            .count(),
        1,
        "{outcomes:?}"
    );
    assert_eq!(reserved_count(&store, event_id).await, 1);
}

#[tokio::test]
async fn missing_event_is_always_not_found() {
    let (_dir, store) = default_store().await;
    let users = seed_users(&store, 1).await;
    let real_event = seed_event(&store, users[0], 3).await;
    let engine = engine(&store, patient());
    let missing = EventId::try_new(999_999).unwrap();

    for _ in 0..5 {
        let err = engine.reserve(missing, users[0]).await.unwrap_err();
        assert_eq!(err, ReserveError::EventNotFound { event_id: missing });
        assert!(!err.is_retryable());
    }

    assert_eq!(reserved_count(&store, real_event).await, 0);
}

#[tokio::test]
async fn sequential_depletion_then_sold_out() {
    let (_dir, store) = default_store().await;
    let users = seed_users(&store, 1).await;
    let event_id = seed_event(&store, users[0], 5).await;
    let engine = engine(&store, patient());

    let mut granted = Vec::new();
    for _ in 0..5 {
        granted.push(engine.reserve(event_id, users[0]).await.unwrap());
    }

    // Lowest id first, so grants come out in ticket order.
    assert!(granted.windows(2).all(|w| w[0].ticket_id < w[1].ticket_id));

    let err = engine.reserve(event_id, users[0]).await.unwrap_err();
    assert_eq!(err, ReserveError::NoInventoryAvailable { event_id });
    assert_eq!(err.kind(), ErrorKind::NoInventoryAvailable);
}

#[tokio::test]
async fn reserved_tickets_are_never_selected_again() {
    let (_dir, store) = default_store().await;
    let users = seed_users(&store, 3).await;
    let event_id = seed_event(&store, users[0], 3).await;
    let engine = engine(&store, patient());

    let first = engine.reserve(event_id, users[0]).await.unwrap();
    let mut seen = HashSet::from([first.ticket_id]);
    for &user_id in &users[1..] {
        let next = engine.reserve(event_id, user_id).await.unwrap();
        assert!(seen.insert(next.ticket_id), "ticket granted twice");
    }
    for _ in 0..10 {
        assert!(engine.reserve(event_id, users[0]).await.is_err());
    }

    // The first holder is untouched by the later calls.
    let tickets = store.catalog.tickets_for_event(event_id).await.unwrap();
    let held = tickets.iter().find(|t| t.id == first.ticket_id).unwrap();
    assert_eq!(
        held.status,
        TicketStatus::Reserved {
            user_id: users[0],
            reserved_at: first.reserved_at,
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn timed_out_reservation_rolls_back_and_retry_succeeds() {
    let (_dir, store) = setup_sqlite(Duration::from_secs(2)).await;
    let users = seed_users(&store, 2).await;
    let event_id = seed_event(&store, users[0], 2).await;
    let impatient = engine(
        &store,
        EngineConfig::default().with_transaction_timeout(Duration::from_millis(200)),
    );

    // Another writer holds the lock past the engine's deadline.
    let mut holder = store.inventory.begin().await.unwrap();
    holder.lock_event(event_id).await.unwrap().expect("event exists");

    let err = impatient.reserve(event_id, users[1]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientStoreError);
    assert!(err.is_retryable());

    holder.rollback().await.unwrap();
    assert_eq!(reserved_count(&store, event_id).await, 0);

    let mut retried = None;
    for _ in 0..20 {
        match impatient.reserve(event_id, users[1]).await {
            Ok(reservation) => {
                retried = Some(reservation);
                break;
            }
            Err(err) if err.is_retryable() => tokio::time::sleep(Duration::from_millis(100)).await,
            Err(err) => panic!("unexpected rejection: {err}"),
        }
    }
    let retried = retried.expect("retry eventually succeeds");
    assert_eq!(retried.user_id, users[1]);

    // Drain the rest; the pool is never oversold.
    let drain = engine(&store, patient());
    assert!(drain.reserve(event_id, users[0]).await.is_ok());
    let err = drain.reserve(event_id, users[0]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoInventoryAvailable);
    assert_eq!(reserved_count(&store, event_id).await, 2);
}

#[tokio::test]
async fn busy_store_surfaces_as_transient() {
    let (_dir, store) = setup_sqlite(Duration::from_millis(100)).await;
    let users = seed_users(&store, 1).await;
    let event_id = seed_event(&store, users[0], 1).await;
    let engine = engine(&store, patient());

    let mut holder = store.inventory.begin().await.unwrap();
    holder.lock_event(event_id).await.unwrap();

    let err = engine.reserve(event_id, users[0]).await.unwrap_err();
    assert!(matches!(err, ReserveError::TransientStore { .. }), "{err:?}");

    holder.rollback().await.unwrap();
    assert!(engine.reserve(event_id, users[0]).await.is_ok());
}

#[tokio::test]
async fn forcing_skip_locked_on_sqlite_fails_to_build() {
    let (_dir, store) = default_store().await;

    let result = ReservationEngine::new(
        store.inventory.clone(),
        EngineConfig::default().with_locking(LockingMode::SkipLocked),
    );

    assert!(matches!(
        result,
        Err(EngineBuildError::UnsupportedLocking {
            mode: LockingMode::SkipLocked,
            ..
        })
    ));
}

#[tokio::test]
async fn engine_reports_configuration() {
    let (_dir, store) = default_store().await;
    let config = EngineConfig::default()
        .with_locking(LockingMode::Serialized)
        .with_transaction_timeout(Duration::from_secs(1));

    let engine = engine(&store, config);

    assert_eq!(engine.locking_mode(), LockingMode::Serialized);
    assert_eq!(engine.config(), &config);
}

use std::{sync::Arc, time::Duration};

use chrono::{Datelike, TimeZone, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement, TransactionTrait,
};
use tokio::task::JoinSet;
use uuid::Uuid;

use engine::{
    Amount, BalanceChangeCmd, CommitReservationCmd, Engine, EngineError, HistoryOrderField,
    HistoryQuery, ReservationKey, ReserveCmd, SortDirection, TransactionType, TransferCmd,
};
use migration::MigratorTrait;

const DELIVERY: &str = "34e16535-480c-43f8-95a9-b7a503499af0";
const BOOKING: &str = "34e16535-480c-43f8-95a9-b7a503499af1";

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn funded(engine: &Engine, user_id: &str, amount_minor: i64) {
    engine
        .replenish(BalanceChangeCmd::new(user_id, amount_minor))
        .await
        .unwrap();
}

fn delivery_key(user_id: &str, order_id: &str, cost_minor: i64) -> ReservationKey {
    ReservationKey::new(user_id, DELIVERY, order_id, cost_minor)
}

async fn insert_history_row(
    db: &DatabaseConnection,
    service_id: &str,
    cost: i64,
    kind: TransactionType,
    created_at: chrono::DateTime<Utc>,
) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO history (user_id, order_id, service_id, amount, cost, transaction_type, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        vec![
            "alice".into(),
            "order".into(),
            service_id.into(),
            0i64.into(),
            cost.into(),
            kind.as_str().into(),
            created_at.into(),
        ],
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn replenish_creates_account_lazily() {
    let (engine, _db) = engine_with_db().await;

    let balance = engine
        .replenish(BalanceChangeCmd::new("alice", 50).comment("salary"))
        .await
        .unwrap();
    assert_eq!(balance, Amount::new(50));
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(50));

    let history = engine.history(HistoryQuery::new("alice")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount, Amount::new(50));
    assert_eq!(history[0].transaction_type, TransactionType::BalanceChange);
    assert_eq!(history[0].comment.as_deref(), Some("salary"));
}

#[tokio::test]
async fn reduce_never_creates_an_account() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .reduce(BalanceChangeCmd::new("ghost", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AccountNotFound(_)));
    assert!(matches!(
        engine.balance("ghost").await,
        Err(EngineError::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn reduce_below_zero_is_rejected_without_side_effects() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 100).await;

    let err = engine
        .reduce(BalanceChangeCmd::new("alice", 101))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(100));

    let history = engine.history(HistoryQuery::new("alice")).await.unwrap();
    assert_eq!(history.len(), 1);

    let balance = engine
        .reduce(BalanceChangeCmd::new("alice", 100))
        .await
        .unwrap();
    assert_eq!(balance, Amount::ZERO);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let (engine, _db) = engine_with_db().await;

    for amount in [0, -5] {
        let err = engine
            .replenish(BalanceChangeCmd::new("alice", amount))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
    let err = engine
        .replenish(BalanceChangeCmd::new("  ", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidId(_)));
}

#[tokio::test]
async fn transfer_moves_money_and_writes_two_legs() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 500).await;
    funded(&engine, "bob", 100).await;

    engine
        .transfer(TransferCmd::new("alice", "bob", 300).comment("rent"))
        .await
        .unwrap();

    let alice = engine.balance("alice").await.unwrap();
    let bob = engine.balance("bob").await.unwrap();
    assert_eq!(alice, Amount::new(200));
    assert_eq!(bob, Amount::new(400));
    assert_eq!(alice + bob, Amount::new(600));

    let out = &engine.history(HistoryQuery::new("alice")).await.unwrap()[0];
    assert_eq!(out.amount, Amount::new(-300));
    assert_eq!(out.to_user_id.as_deref(), Some("bob"));
    assert_eq!(out.from_user_id, None);

    let inc = &engine.history(HistoryQuery::new("bob")).await.unwrap()[0];
    assert_eq!(inc.amount, Amount::new(300));
    assert_eq!(inc.from_user_id.as_deref(), Some("alice"));
    assert_eq!(inc.comment.as_deref(), Some("rent"));
}

#[tokio::test]
async fn transfer_over_balance_leaves_both_accounts_unchanged() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 300).await;
    funded(&engine, "bob", 10).await;

    let err = engine
        .transfer(TransferCmd::new("alice", "bob", 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(300));
    assert_eq!(engine.balance("bob").await.unwrap(), Amount::new(10));
}

#[tokio::test]
async fn transfer_to_unknown_recipient_rolls_back_the_debit() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 300).await;

    let err = engine
        .transfer(TransferCmd::new("alice", "nobody", 100))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::AccountNotFound("nobody".to_string()));
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(300));
    assert!(matches!(
        engine.balance("nobody").await,
        Err(EngineError::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn transfer_to_self_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 300).await;

    let err = engine
        .transfer(TransferCmd::new("alice", "alice", 100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[tokio::test]
async fn reserve_then_cancel_restores_balance() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 100).await;

    let first = delivery_key("alice", "order-1", 100);
    engine.reserve(ReserveCmd::new(first.clone())).await.unwrap();
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::ZERO);

    let err = engine
        .reserve(ReserveCmd::new(delivery_key("alice", "order-2", 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    engine
        .cancel(CommitReservationCmd::new(first))
        .await
        .unwrap();
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(100));
    assert!(engine.reservations("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn reservation_ids_are_trimmed_like_balance_ids() {
    let (engine, _db) = engine_with_db().await;
    engine
        .replenish(BalanceChangeCmd::new(" alice ", 100))
        .await
        .unwrap();

    let padded = ReservationKey::new(" alice ", format!(" {DELIVERY} "), " order-1 ", 10);
    engine.reserve(ReserveCmd::new(padded)).await.unwrap();
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(90));

    let active = engine.reservations(" alice ").await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].key, delivery_key("alice", "order-1", 10));

    engine
        .confirm(CommitReservationCmd::new(delivery_key("alice", "order-1", 10)))
        .await
        .unwrap();
    assert!(engine.reservations("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn reserve_then_confirm_keeps_money_spent() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 500).await;

    let key = delivery_key("alice", "order-1", 200);
    engine
        .reserve(ReserveCmd::new(key.clone()).comment("courier"))
        .await
        .unwrap();
    assert_eq!(engine.reservations("alice").await.unwrap().len(), 1);

    engine
        .confirm(CommitReservationCmd::new(key))
        .await
        .unwrap();
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(300));

    let history = engine
        .history(HistoryQuery::new("alice").order_by(HistoryOrderField::CreatedAt, SortDirection::Asc))
        .await
        .unwrap();
    let kinds: Vec<_> = history.iter().map(|h| h.transaction_type).collect();
    assert_eq!(
        kinds,
        vec![
            TransactionType::BalanceChange,
            TransactionType::Reserve,
            TransactionType::WasReserve,
            TransactionType::Confirm,
        ]
    );

    let reserve = &history[1];
    let was_reserve = &history[2];
    let confirm = &history[3];
    assert_eq!(reserve.amount, Amount::new(200));
    assert_eq!(was_reserve.amount, Amount::new(-200));
    assert_eq!(was_reserve.created_at, reserve.created_at);
    assert_eq!(was_reserve.comment.as_deref(), Some("courier"));
    assert_eq!(confirm.amount, Amount::ZERO);
    assert_eq!(confirm.cost, Amount::new(200));
    assert_eq!(confirm.service_name.as_deref(), Some("Курьерская доставка"));
    assert_eq!(confirm.order_id.as_deref(), Some("order-1"));
}

#[tokio::test]
async fn second_commit_of_a_key_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 500).await;

    let key = delivery_key("alice", "order-1", 200);
    engine.reserve(ReserveCmd::new(key.clone())).await.unwrap();
    engine
        .confirm(CommitReservationCmd::new(key.clone()))
        .await
        .unwrap();

    let again = engine
        .confirm(CommitReservationCmd::new(key.clone()))
        .await
        .unwrap_err();
    assert!(matches!(again, EngineError::ReservationNotFound(_)));
    let cancel = engine
        .cancel(CommitReservationCmd::new(key))
        .await
        .unwrap_err();
    assert!(matches!(cancel, EngineError::ReservationNotFound(_)));
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(300));
}

#[tokio::test]
async fn commit_requires_the_exact_key() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 500).await;
    engine
        .reserve(ReserveCmd::new(delivery_key("alice", "order-1", 200)))
        .await
        .unwrap();

    let wrong_cost = engine
        .confirm(CommitReservationCmd::new(delivery_key("alice", "order-1", 199)))
        .await
        .unwrap_err();
    assert!(matches!(wrong_cost, EngineError::ReservationNotFound(_)));
    assert_eq!(engine.reservations("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_active_reservation_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 500).await;

    let key = delivery_key("alice", "order-1", 100);
    engine.reserve(ReserveCmd::new(key.clone())).await.unwrap();
    let err = engine.reserve(ReserveCmd::new(key)).await.unwrap_err();

    assert!(matches!(err, EngineError::ReservationExists(_)));
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(400));
}

#[tokio::test]
async fn reserve_for_unknown_service_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 500).await;

    let err = engine
        .reserve(ReserveCmd::new(ReservationKey::new(
            "alice", "no-such-service", "order-1", 100,
        )))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::ServiceNotFound("no-such-service".to_string())
    );
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(500));
}

#[tokio::test]
async fn reserve_requires_an_existing_account() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .reserve(ReserveCmd::new(delivery_key("ghost", "order-1", 100)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AccountNotFound(_)));
}

#[tokio::test]
async fn history_sorts_and_paginates() {
    let (engine, _db) = engine_with_db().await;
    for amount in [30, 10, 20] {
        funded(&engine, "alice", amount).await;
    }

    let by_amount = engine
        .history(HistoryQuery::new("alice").order_by(HistoryOrderField::Amount, SortDirection::Asc))
        .await
        .unwrap();
    let amounts: Vec<i64> = by_amount.iter().map(|h| h.amount.minor()).collect();
    assert_eq!(amounts, vec![10, 20, 30]);

    let newest_first = engine.history(HistoryQuery::new("alice")).await.unwrap();
    let amounts: Vec<i64> = newest_first.iter().map(|h| h.amount.minor()).collect();
    assert_eq!(amounts, vec![20, 10, 30]);

    let page = engine
        .history(HistoryQuery::new("alice").limit(1).offset(1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].amount, Amount::new(10));

    let tail = engine
        .history(HistoryQuery::new("alice").offset(2))
        .await
        .unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].amount, Amount::new(30));

    let past_end = engine
        .history(HistoryQuery::new("alice").offset(3))
        .await
        .unwrap_err();
    assert!(matches!(past_end, EngineError::NotFound(_)));
}

#[tokio::test]
async fn history_of_unknown_user_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let err = engine.history(HistoryQuery::new("nobody")).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn report_sums_confirmed_costs_of_the_month_only() {
    let (engine, db) = engine_with_db().await;
    let in_month = Utc.with_ymd_and_hms(2022, 11, 15, 12, 0, 0).unwrap();
    let first_instant = Utc.with_ymd_and_hms(2022, 11, 1, 0, 0, 0).unwrap();
    let before = Utc.with_ymd_and_hms(2022, 10, 31, 23, 59, 59).unwrap();
    let next_month = Utc.with_ymd_and_hms(2022, 12, 1, 0, 0, 0).unwrap();

    insert_history_row(&db, DELIVERY, 100, TransactionType::Confirm, in_month).await;
    insert_history_row(&db, DELIVERY, 250, TransactionType::Confirm, first_instant).await;
    insert_history_row(&db, BOOKING, 70, TransactionType::Confirm, in_month).await;
    insert_history_row(&db, BOOKING, 999, TransactionType::Cancel, in_month).await;
    insert_history_row(&db, BOOKING, 999, TransactionType::Reserve, in_month).await;
    insert_history_row(&db, DELIVERY, 999, TransactionType::Confirm, before).await;
    insert_history_row(&db, DELIVERY, 999, TransactionType::Confirm, next_month).await;

    let rows = engine.report(2022, 11).await.unwrap();
    let summary: Vec<(&str, i64)> = rows
        .iter()
        .map(|r| (r.service_name.as_str(), r.total_cost.minor()))
        .collect();
    assert_eq!(
        summary,
        vec![("Бронирование", 70), ("Курьерская доставка", 350)]
    );

    let empty = engine.report(2021, 11).await.unwrap_err();
    assert!(matches!(empty, EngineError::NotFound(_)));
    let bad_month = engine.report(2022, 13).await.unwrap_err();
    assert!(matches!(bad_month, EngineError::InvalidRequest(_)));
    let bad_year = engine.report(i32::MAX, 12).await.unwrap_err();
    assert!(matches!(bad_year, EngineError::InvalidRequest(_)));
}

#[tokio::test]
async fn report_reflects_confirmations_made_through_the_engine() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 1000).await;

    let confirmed = delivery_key("alice", "order-1", 300);
    let cancelled = delivery_key("alice", "order-2", 200);
    engine.reserve(ReserveCmd::new(confirmed.clone())).await.unwrap();
    engine.reserve(ReserveCmd::new(cancelled.clone())).await.unwrap();
    engine
        .confirm(CommitReservationCmd::new(confirmed))
        .await
        .unwrap();
    engine
        .cancel(CommitReservationCmd::new(cancelled))
        .await
        .unwrap();

    let now = Utc::now();
    let rows = engine.report(now.year(), now.month()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].service_name, "Курьерская доставка");
    assert_eq!(rows[0].total_cost, Amount::new(300));
}

#[tokio::test]
async fn services_are_seeded_and_upsertable() {
    let (engine, _db) = engine_with_db().await;
    assert_eq!(engine.services().await.unwrap().len(), 3);

    engine.upsert_service("svc-x", "Gift wrap").await.unwrap();
    engine.upsert_service("svc-x", "Gift wrapping").await.unwrap();

    let services = engine.services().await.unwrap();
    assert_eq!(services.len(), 4);
    assert!(
        services
            .iter()
            .any(|s| s.id == "svc-x" && s.name == "Gift wrapping")
    );
}

#[tokio::test]
async fn write_times_out_and_rolls_back() {
    let (engine, db) = engine_with_db().await;

    // Occupies the only pooled connection.
    let blocker = db.begin().await.unwrap();
    let err = engine
        .replenish(BalanceChangeCmd::new("alice", 100).timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Timeout(Duration::from_millis(50)));
    blocker.rollback().await.unwrap();

    assert!(matches!(
        engine.balance("alice").await,
        Err(EngineError::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn deadline_inside_an_open_transaction_rolls_back_the_write() {
    let path = std::env::temp_dir().join(format!("ledger-{}.db", Uuid::new_v4()));
    let mut options = ConnectOptions::new(format!("sqlite:{}?mode=rwc", path.display()));
    options
        .max_connections(2)
        .sqlx_logging(false)
        .map_sqlx_sqlite_opts(|opts| opts.busy_timeout(Duration::from_millis(300)));
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    funded(&engine, "alice", 100).await;

    // An open reader keeps its shared lock, so the writer's UPDATE and INSERT
    // succeed but its COMMIT cannot.
    let reader = db.begin().await.unwrap();
    reader
        .query_one(Statement::from_string(
            reader.get_database_backend(),
            "SELECT balance FROM accounts",
        ))
        .await
        .unwrap();

    let limit = Duration::from_millis(100);
    let err = engine
        .replenish(BalanceChangeCmd::new("alice", 50).timeout(limit))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Timeout(limit));

    // Outlive the abandoned COMMIT so it gives up instead of landing late.
    tokio::time::sleep(Duration::from_millis(800)).await;
    reader.rollback().await.unwrap();

    assert_eq!(engine.balance("alice").await.unwrap(), Amount::new(100));
    let history = engine.history(HistoryQuery::new("alice")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount, Amount::new(100));

    db.close().await.unwrap();
    std::fs::remove_file(path).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_debits_never_overdraw() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 100).await;
    let engine = Arc::new(engine);

    let mut tasks = JoinSet::new();
    for _ in 0..20 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            engine
                .reduce(BalanceChangeCmd::new("alice", 10).timeout(Duration::from_secs(30)))
                .await
        });
    }

    let mut succeeded = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(balance) => {
                assert!(!balance.is_negative());
                succeeded += 1;
            }
            Err(err) => assert!(matches!(err, EngineError::InsufficientFunds(_))),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(engine.balance("alice").await.unwrap(), Amount::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_conserve_the_total() {
    let (engine, _db) = engine_with_db().await;
    funded(&engine, "alice", 500).await;
    funded(&engine, "bob", 500).await;
    let engine = Arc::new(engine);

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let engine = Arc::clone(&engine);
        let (from, to) = if i % 2 == 0 { ("alice", "bob") } else { ("bob", "alice") };
        tasks.spawn(async move {
            engine
                .transfer(TransferCmd::new(from, to, 75).timeout(Duration::from_secs(30)))
                .await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined.unwrap() {
            assert!(matches!(err, EngineError::InsufficientFunds(_)));
        }
    }

    let alice = engine.balance("alice").await.unwrap();
    let bob = engine.balance("bob").await.unwrap();
    assert!(!alice.is_negative() && !bob.is_negative());
    assert_eq!(alice + bob, Amount::new(1000));
}

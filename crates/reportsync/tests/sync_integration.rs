//! Integration tests for the sync engine.
//!
//! Every test runs the real runner and orchestrator against an in-memory
//! SQLite store with migrations applied. The upstream API is a scripted fake
//! `ReportClient` that answers from the request body, and pacing is disabled.
//!
//! Key scenarios tested:
//! - Cold and warm window planning end to end
//! - Repeated incremental runs are idempotent
//! - The cursor never moves backward and empty windows leave it untouched
//! - Period overwrite archives rows the upstream no longer returns
//! - One failing dimension does not stop the others, and recovers later
//! - Span limits split requests within a period
//! - Full resync archives snapshot rows that disappeared upstream

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use reportsync::connect_and_migrate;
use reportsync::entity::dimension_kind::DimensionKind;
use reportsync::entity::sync_status::SyncStatus;
use reportsync::entity::task_type::TaskType;
use reportsync::platform::{
    AccountInfo, ApiResponse, PlatformError, ReportClient, ResponseCode, SuccessCodes,
};
use reportsync::repository::{self, CursorUpdate, SyncKey};
use reportsync::retry::RetryConfig;
use reportsync::sync::{
    EndpointHandler, FanoutKind, Granularity, Orchestrator, PacingConfig, PaginationConfig,
    PersistenceMode,
    SyncContext, SyncError, SyncMode, SyncOptions, SyncProgress, TaskDescriptor, TaskRegistry,
    WindowConfig,
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};

type Responder = dyn Fn(&AccountInfo, &Value) -> Result<ApiResponse, PlatformError> + Send + Sync;

/// Scripted upstream: answers every POST through `responder` and logs it.
struct FakeClient {
    responder: Box<Responder>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeClient {
    fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&AccountInfo, &Value) -> Result<ApiResponse, PlatformError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl ReportClient for FakeClient {
    async fn post(
        &self,
        account: &AccountInfo,
        _path: &str,
        body: &Value,
    ) -> Result<ApiResponse, PlatformError> {
        self.calls
            .lock()
            .unwrap()
            .push((account.id.clone(), body.clone()));
        (self.responder)(account, body)
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn end_of(date: NaiveDate) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59).unwrap()) + Duration::milliseconds(999)
}

fn field<'a>(body: &'a Value, name: &str) -> &'a str {
    body.get(name).and_then(Value::as_str).unwrap_or("")
}

fn ok(records: Vec<Value>) -> Result<ApiResponse, PlatformError> {
    Ok(ApiResponse::ok(ResponseCode::Int(0), Value::Array(records)))
}

/// One record per request, keyed by the requested start date and store.
fn one_record_per_day(_account: &AccountInfo, body: &Value) -> Result<ApiResponse, PlatformError> {
    let id = format!("{}-{}", field(body, "start_date"), field(body, "sid"));
    ok(vec![json!({"id": id, "amount": 10})])
}

async fn setup_test_db() -> Arc<DatabaseConnection> {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    repository::upsert_account(&db, "acct-1", "Main", Some("key-1"))
        .await
        .expect("Failed to create test account");
    Arc::new(db)
}

fn day_task(task_type: TaskType, persistence: PersistenceMode) -> TaskDescriptor {
    TaskDescriptor::builder(
        task_type,
        Arc::new(EndpointHandler::new("/report", SuccessCodes::Zero).key_fields(["id"])),
    )
    .granularity(Granularity::Day)
    .lookback(90)
    .persistence(persistence)
    .build()
}

fn options(window: WindowConfig) -> SyncOptions {
    SyncOptions {
        window,
        pacing: PacingConfig::none(),
        ..SyncOptions::default()
    }
}

fn orchestrator(
    db: &Arc<DatabaseConnection>,
    client: Arc<FakeClient>,
    task: TaskDescriptor,
    options: SyncOptions,
    today: NaiveDate,
) -> Orchestrator {
    let registry = TaskRegistry::new().with(task).expect("valid task");
    let ctx = SyncContext::builder()
        .client(client)
        .database(Arc::clone(db))
        .options(options)
        .retry(RetryConfig::disabled())
        .today(today)
        .build()
        .expect("valid context");
    Orchestrator::new(registry, ctx)
}

#[tokio::test]
async fn test_cold_start_fetches_lookback_and_sets_cursor() {
    let db = setup_test_db().await;
    let client = FakeClient::new(one_record_per_day);
    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        day_task(TaskType::Orders, PersistenceMode::UpsertByKey),
        options(WindowConfig::default()),
        d(2024, 3, 10),
    );

    let summary = sync.run_task(TaskType::Orders).await.unwrap();

    assert!(summary.success(), "{:?}", summary.error_message());
    assert_eq!(summary.total_records, 91);
    let calls = client.calls();
    assert_eq!(calls.len(), 91);
    assert_eq!(field(&calls[0].1, "start_date"), "2023-12-11");
    assert_eq!(field(&calls[90].1, "end_date"), "2024-03-10");

    let key = SyncKey::new("acct-1", TaskType::Orders, None);
    let cursor = repository::find_cursor(&*db, &key).await.unwrap().unwrap();
    assert_eq!(cursor.last_end_at.with_timezone(&Utc), end_of(d(2024, 3, 10)));
    assert_eq!(cursor.last_status, SyncStatus::Success);
    assert_eq!(cursor.last_record_count, 91);
}

#[tokio::test]
async fn test_warm_start_resumes_after_cursor() {
    let db = setup_test_db().await;
    let key = SyncKey::new("acct-1", TaskType::Orders, None);
    repository::save_cursor(
        &*db,
        &key,
        CursorUpdate {
            completed_through: Some(end_of(d(2024, 3, 10))),
            synced_at: Utc::now(),
            record_count: 0,
            status: SyncStatus::Success,
            error: None,
        },
    )
    .await
    .unwrap();

    let client = FakeClient::new(one_record_per_day);
    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        day_task(TaskType::Orders, PersistenceMode::UpsertByKey),
        options(WindowConfig::default()),
        d(2024, 3, 15),
    );

    let summary = sync.run_task(TaskType::Orders).await.unwrap();

    assert!(summary.success());
    let starts: Vec<String> = client
        .calls()
        .iter()
        .map(|(_, body)| field(body, "start_date").to_string())
        .collect();
    assert_eq!(
        starts,
        vec![
            "2024-03-11",
            "2024-03-12",
            "2024-03-13",
            "2024-03-14",
            "2024-03-15"
        ]
    );
    let cursor = repository::find_cursor(&*db, &key).await.unwrap().unwrap();
    assert_eq!(cursor.last_end_at.with_timezone(&Utc), end_of(d(2024, 3, 15)));
}

#[tokio::test]
async fn test_repeated_incremental_run_is_idempotent() {
    let db = setup_test_db().await;
    let client = FakeClient::new(one_record_per_day);
    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        day_task(TaskType::Orders, PersistenceMode::UpsertByKey),
        options(WindowConfig::default()),
        d(2024, 3, 10),
    );
    let key = SyncKey::new("acct-1", TaskType::Orders, None);

    sync.run_task(TaskType::Orders).await.unwrap();
    let before = repository::find_cursor(&*db, &key).await.unwrap().unwrap();
    let rows_before = repository::count_active(&*db, &key).await.unwrap();
    client.reset();

    let summary = sync.run_task(TaskType::Orders).await.unwrap();

    assert!(summary.success());
    assert!(summary.outcomes[0].skipped);
    assert_eq!(client.call_count(), 0);
    assert_eq!(repository::count_active(&*db, &key).await.unwrap(), rows_before);
    let after = repository::find_cursor(&*db, &key).await.unwrap().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_replayed_range_does_not_duplicate_or_rewind() {
    let db = setup_test_db().await;
    let client = FakeClient::new(one_record_per_day);
    let key = SyncKey::new("acct-1", TaskType::Orders, None);

    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        day_task(TaskType::Orders, PersistenceMode::UpsertByKey),
        options(WindowConfig::default()),
        d(2024, 3, 10),
    );
    sync.run_task(TaskType::Orders).await.unwrap();
    let rows = repository::count_active(&*db, &key).await.unwrap();

    let replay = orchestrator(
        &db,
        Arc::clone(&client),
        day_task(TaskType::Orders, PersistenceMode::UpsertByKey),
        options(WindowConfig {
            start_date: Some(d(2024, 1, 1)),
            end_date: Some(d(2024, 1, 5)),
        }),
        d(2024, 3, 10),
    );
    let summary = replay.run_task(TaskType::Orders).await.unwrap();

    assert!(summary.success());
    assert_eq!(summary.total_records, 5);
    assert_eq!(repository::count_active(&*db, &key).await.unwrap(), rows);
    let cursor = repository::find_cursor(&*db, &key).await.unwrap().unwrap();
    assert_eq!(cursor.last_end_at.with_timezone(&Utc), end_of(d(2024, 3, 10)));
}

#[tokio::test]
async fn test_period_overwrite_archives_missing_rows() {
    let db = setup_test_db().await;
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_capture = Arc::clone(&runs);
    let client = FakeClient::new(move |_, _| {
        // First run returns 5 campaigns, every later run 3.
        let n = if runs_capture.fetch_add(1, Ordering::SeqCst) == 0 {
            5
        } else {
            3
        };
        ok((0..n).map(|i| json!({"id": i, "spend": i * 2})).collect())
    });
    let window = WindowConfig {
        start_date: Some(d(2024, 3, 10)),
        end_date: Some(d(2024, 3, 10)),
    };
    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        day_task(TaskType::AdSpend, PersistenceMode::OverwriteByPeriod),
        options(window),
        d(2024, 3, 12),
    );
    let key = SyncKey::new("acct-1", TaskType::AdSpend, None);

    sync.run_task(TaskType::AdSpend).await.unwrap();
    assert_eq!(
        repository::count_in_period(&*db, &key, "2024-03-10").await.unwrap(),
        (5, 0)
    );

    let summary = sync.run_task(TaskType::AdSpend).await.unwrap();
    assert!(summary.success());
    assert_eq!(
        repository::count_in_period(&*db, &key, "2024-03-10").await.unwrap(),
        (3, 2)
    );
}

#[tokio::test]
async fn test_failing_dimension_is_isolated_then_recovers() {
    let db = setup_test_db().await;
    for store in ["1", "2", "3"] {
        repository::add_dimension(&*db, "acct-1", DimensionKind::Store, store, None)
            .await
            .unwrap();
    }
    let store_2_down = Arc::new(AtomicBool::new(true));
    let down = Arc::clone(&store_2_down);
    let client = FakeClient::new(move |account, body| {
        if field(body, "sid") == "2" && down.load(Ordering::SeqCst) {
            return Err(PlatformError::api(Some("500".to_string()), "store offline"));
        }
        one_record_per_day(account, body)
    });

    let task = TaskDescriptor::builder(
        TaskType::Orders,
        Arc::new(EndpointHandler::new("/orders", SuccessCodes::Zero).key_fields(["id"])),
    )
    .granularity(Granularity::Day)
    .lookback(2)
    .fanout(FanoutKind::Store)
    .build();
    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        task,
        options(WindowConfig::default()),
        d(2024, 3, 10),
    );

    let summary = sync.run_task(TaskType::Orders).await.unwrap();

    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.fail_count, 1);
    assert_eq!(summary.total_records, 6);
    assert_eq!(summary.status(), SyncStatus::Partial);
    assert_eq!(summary.account_status("acct-1"), Some(SyncStatus::Partial));
    let error = summary.error_message().unwrap();
    assert!(error.contains("store=2"), "{}", error);
    assert!(error.contains("store offline"), "{}", error);

    let store = |sid: &str| {
        SyncKey::new(
            "acct-1",
            TaskType::Orders,
            Some(format!("store={}", sid).as_str()),
        )
    };
    for sid in ["1", "3"] {
        let cursor = repository::find_cursor(&*db, &store(sid)).await.unwrap().unwrap();
        assert_eq!(cursor.last_end_at.with_timezone(&Utc), end_of(d(2024, 3, 10)));
    }
    assert!(repository::find_cursor(&*db, &store("2")).await.unwrap().is_none());

    store_2_down.store(false, Ordering::SeqCst);
    client.reset();
    let summary = sync.run_task(TaskType::Orders).await.unwrap();

    assert!(summary.success(), "{:?}", summary.error_message());
    assert_eq!(summary.status(), SyncStatus::Success);
    assert_eq!(client.call_count(), 3);
    assert!(client.calls().iter().all(|(_, body)| field(body, "sid") == "2"));
    let cursor = repository::find_cursor(&*db, &store("2")).await.unwrap().unwrap();
    assert_eq!(cursor.last_end_at.with_timezone(&Utc), end_of(d(2024, 3, 10)));
    assert_eq!(cursor.last_status, SyncStatus::Success);
}

#[tokio::test]
async fn test_cursor_stops_before_first_failed_period() {
    let db = setup_test_db().await;
    let flaky = Arc::new(AtomicBool::new(true));
    let flaky_capture = Arc::clone(&flaky);
    let client = FakeClient::new(move |account, body| {
        if field(body, "start_date") == "2024-03-09" && flaky_capture.load(Ordering::SeqCst) {
            return Err(PlatformError::rate_limited("too many requests"));
        }
        one_record_per_day(account, body)
    });
    let task = TaskDescriptor::builder(
        TaskType::Orders,
        Arc::new(EndpointHandler::new("/orders", SuccessCodes::Zero).key_fields(["id"])),
    )
    .granularity(Granularity::Day)
    .lookback(2)
    .build();
    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        task,
        options(WindowConfig::default()),
        d(2024, 3, 10),
    );
    let key = SyncKey::new("acct-1", TaskType::Orders, None);

    let summary = sync.run_task(TaskType::Orders).await.unwrap();

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.status, SyncStatus::Partial);
    assert_eq!(outcome.record_count, 2);
    assert!(outcome.error.as_deref().unwrap().starts_with("2024-03-09"));
    let cursor = repository::find_cursor(&*db, &key).await.unwrap().unwrap();
    assert_eq!(cursor.last_end_at.with_timezone(&Utc), end_of(d(2024, 3, 8)));
    assert_eq!(cursor.last_status, SyncStatus::Partial);

    flaky.store(false, Ordering::SeqCst);
    client.reset();
    let summary = sync.run_task(TaskType::Orders).await.unwrap();

    assert!(summary.success());
    assert_eq!(client.call_count(), 2);
    let cursor = repository::find_cursor(&*db, &key).await.unwrap().unwrap();
    assert_eq!(cursor.last_end_at.with_timezone(&Utc), end_of(d(2024, 3, 10)));
    assert_eq!(repository::count_active(&*db, &key).await.unwrap(), 3);
}

#[tokio::test]
async fn test_partially_fetched_period_is_written_but_not_completed() {
    let db = setup_test_db().await;
    let client = FakeClient::new(|_, body| {
        let offset = body.get("offset").and_then(Value::as_u64).unwrap_or(0);
        if offset == 0 {
            let page = (0..2).map(|i| json!({"id": i})).collect();
            Ok(ApiResponse::ok(ResponseCode::Int(0), Value::Array(page)).with_total(5))
        } else {
            Err(PlatformError::network("connection reset"))
        }
    });
    let task = TaskDescriptor::builder(
        TaskType::Orders,
        Arc::new(EndpointHandler::new("/orders", SuccessCodes::Zero).key_fields(["id"])),
    )
    .granularity(Granularity::Day)
    .lookback(0)
    .page_size(2)
    .build();
    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        task,
        options(WindowConfig::default()),
        d(2024, 3, 10),
    );
    let key = SyncKey::new("acct-1", TaskType::Orders, None);

    let summary = sync.run_task(TaskType::Orders).await.unwrap();

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.status, SyncStatus::Partial);
    assert_eq!(outcome.record_count, 2);
    assert!(outcome.error.as_deref().unwrap().contains("connection reset"));
    assert_eq!(repository::count_active(&*db, &key).await.unwrap(), 2);
    assert!(repository::find_cursor(&*db, &key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_page_limit_keeps_period_open() {
    let db = setup_test_db().await;
    let client = FakeClient::new(|_, body| {
        let day = field(body, "start_date").to_string();
        let offset = body.get("offset").and_then(Value::as_u64).unwrap_or(0);
        let total = if day == "2024-03-10" { 10 } else { 2 };
        let page = (offset..(offset + 2).min(total))
            .map(|i| json!({"id": format!("{}-{}", day, i)}))
            .collect();
        Ok(ApiResponse::ok(ResponseCode::Int(0), Value::Array(page)).with_total(total))
    });
    let task = || {
        TaskDescriptor::builder(
            TaskType::Orders,
            Arc::new(EndpointHandler::new("/orders", SuccessCodes::Zero).key_fields(["id"])),
        )
        .granularity(Granularity::Day)
        .lookback(1)
        .page_size(2)
        .build()
    };
    let mut capped = options(WindowConfig::default());
    capped.pagination = PaginationConfig {
        max_pages: 2,
        ..PaginationConfig::default()
    };
    let sync = orchestrator(&db, Arc::clone(&client), task(), capped, d(2024, 3, 10));
    let key = SyncKey::new("acct-1", TaskType::Orders, None);

    let summary = sync.run_task(TaskType::Orders).await.unwrap();

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.status, SyncStatus::Partial);
    assert_eq!(outcome.record_count, 6);
    assert!(outcome.error.as_deref().unwrap().contains("page limit"));
    let cursor = repository::find_cursor(&*db, &key).await.unwrap().unwrap();
    assert_eq!(cursor.last_end_at.with_timezone(&Utc), end_of(d(2024, 3, 9)));

    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        task(),
        options(WindowConfig::default()),
        d(2024, 3, 10),
    );
    let summary = sync.run_task(TaskType::Orders).await.unwrap();

    assert!(summary.success(), "{:?}", summary.error_message());
    assert_eq!(summary.total_records, 10);
    let cursor = repository::find_cursor(&*db, &key).await.unwrap().unwrap();
    assert_eq!(cursor.last_end_at.with_timezone(&Utc), end_of(d(2024, 3, 10)));
    assert_eq!(repository::count_active(&*db, &key).await.unwrap(), 12);
}

#[tokio::test]
async fn test_span_limit_splits_month_requests() {
    let db = setup_test_db().await;
    let client = FakeClient::new(|_, body| {
        let id = format!("{}..{}", field(body, "start_date"), field(body, "end_date"));
        ok(vec![json!({"id": id})])
    });
    let task = TaskDescriptor::builder(
        TaskType::ProfitReport,
        Arc::new(EndpointHandler::new("/profit", SuccessCodes::Zero).key_fields(["id"])),
    )
    .granularity(Granularity::Month)
    .lookback(0)
    .max_span_days(15)
    .persistence(PersistenceMode::OverwriteByPeriod)
    .build();
    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        task,
        options(WindowConfig {
            start_date: Some(d(2024, 2, 1)),
            end_date: Some(d(2024, 2, 29)),
        }),
        d(2024, 3, 10),
    );
    let key = SyncKey::new("acct-1", TaskType::ProfitReport, None);

    let summary = sync.run_task(TaskType::ProfitReport).await.unwrap();

    assert!(summary.success());
    let ranges: Vec<(String, String)> = client
        .calls()
        .iter()
        .map(|(_, b)| (field(b, "start_date").to_string(), field(b, "end_date").to_string()))
        .collect();
    assert_eq!(
        ranges,
        vec![
            ("2024-02-01".to_string(), "2024-02-15".to_string()),
            ("2024-02-16".to_string(), "2024-02-29".to_string()),
        ]
    );
    assert_eq!(
        repository::count_in_period(&*db, &key, "2024-02").await.unwrap(),
        (2, 0)
    );
    let cursor = repository::find_cursor(&*db, &key).await.unwrap().unwrap();
    assert_eq!(cursor.last_end_at.with_timezone(&Utc), end_of(d(2024, 2, 29)));
}

#[tokio::test]
async fn test_full_resync_archives_vanished_snapshot_rows() {
    let db = setup_test_db().await;
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_capture = Arc::clone(&runs);
    let client = FakeClient::new(move |_, _| {
        let skus: &[&str] = if runs_capture.fetch_add(1, Ordering::SeqCst) == 0 {
            &["a", "b", "c"]
        } else {
            &["a", "b"]
        };
        ok(skus.iter().map(|sku| json!({"sku": sku})).collect())
    });
    let task = TaskDescriptor::builder(
        TaskType::Listings,
        Arc::new(EndpointHandler::new("/listings", SuccessCodes::Zero).key_fields(["sku"])),
    )
    .granularity(Granularity::Snapshot)
    .persistence(PersistenceMode::ArchiveThenFullResync)
    .build();
    let full = SyncOptions {
        mode: SyncMode::Full,
        ..options(WindowConfig::default())
    };
    let sync = orchestrator(&db, Arc::clone(&client), task, full, d(2024, 3, 10));
    let key = SyncKey::new("acct-1", TaskType::Listings, None);

    sync.run_task(TaskType::Listings).await.unwrap();
    assert_eq!(repository::count_active(&*db, &key).await.unwrap(), 3);

    let summary = sync.run_task(TaskType::Listings).await.unwrap();

    assert!(summary.success());
    let live: Vec<String> = repository::find_active(&*db, &key)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.record_key)
        .collect();
    assert_eq!(live, vec!["a", "b"]);
    let counts = repository::record_counts(&*db, Some("acct-1")).await.unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!((counts[0].active, counts[0].archived), (2, 1));
}

#[tokio::test]
async fn test_global_task_runs_once_under_global_account() {
    let db = setup_test_db().await;
    repository::upsert_account(&*db, "acct-2", "Second", Some("key-2"))
        .await
        .unwrap();
    let client = FakeClient::new(|_, _| ok(vec![json!({"currency_code": "EUR", "rate": 1.08})]));
    let task = TaskDescriptor::builder(
        TaskType::ExchangeRates,
        Arc::new(EndpointHandler::new("/rates", SuccessCodes::Zero).key_fields(["currency_code"])),
    )
    .granularity(Granularity::Snapshot)
    .persistence(PersistenceMode::ArchiveThenFullResync)
    .global()
    .build();
    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        task,
        options(WindowConfig::default()),
        d(2024, 3, 10),
    );

    let summary = sync.run_task(TaskType::ExchangeRates).await.unwrap();

    assert!(summary.success());
    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(summary.outcomes[0].account_id, "*");
    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "acct-1");
    let key = SyncKey::new("*", TaskType::ExchangeRates, None);
    assert_eq!(repository::count_active(&*db, &key).await.unwrap(), 1);
}

#[tokio::test]
async fn test_bad_requests_are_rejected_before_any_io() {
    let db = setup_test_db().await;
    let client = FakeClient::new(one_record_per_day);
    let sync = orchestrator(
        &db,
        Arc::clone(&client),
        day_task(TaskType::Orders, PersistenceMode::UpsertByKey),
        options(WindowConfig {
            start_date: Some(d(2024, 3, 10)),
            end_date: Some(d(2024, 3, 1)),
        }),
        d(2024, 3, 10),
    );

    let err = sync.run_named("payouts", None).await.unwrap_err();
    assert!(matches!(err, SyncError::Configuration { .. }));

    let err = sync.run_task(TaskType::AdSpend).await.unwrap_err();
    assert!(matches!(err, SyncError::Configuration { .. }));

    let err = sync.run_task(TaskType::Orders).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation { .. }));

    let err = sync
        .run_task_for_account(TaskType::Orders, "acct-404")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation { .. }));

    assert_eq!(client.call_count(), 0);
    let key = SyncKey::new("acct-1", TaskType::Orders, None);
    assert!(repository::find_cursor(&*db, &key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_run_all_reports_failures_without_erroring() {
    let db = setup_test_db().await;
    let client = FakeClient::new(|_, _| Err(PlatformError::AuthRequired));
    let registry = TaskRegistry::new()
        .with(day_task(TaskType::Orders, PersistenceMode::UpsertByKey))
        .and_then(|r| r.with(day_task(TaskType::AdSpend, PersistenceMode::OverwriteByPeriod)))
        .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let events_capture = Arc::clone(&events);
    let ctx = SyncContext::builder()
        .client(client)
        .database(Arc::clone(&db))
        .options(options(WindowConfig {
            start_date: Some(d(2024, 3, 10)),
            end_date: Some(d(2024, 3, 10)),
        }))
        .progress(Arc::new(Box::new(move |event: SyncProgress| {
            if let SyncProgress::TaskComplete { task_type, .. } = event {
                events_capture.lock().unwrap().push(task_type);
            }
        })))
        .today(d(2024, 3, 10))
        .build()
        .unwrap();

    let summary = Orchestrator::new(registry, ctx).run_all().await;

    assert!(!summary.success());
    assert_eq!(summary.fail_count, 2);
    assert_eq!(summary.tasks.len(), 2);
    assert_eq!(
        *events.lock().unwrap(),
        vec![TaskType::Orders, TaskType::AdSpend]
    );
}

//! Store tests against a real PostgreSQL.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p gdpval-server -- --ignored

use std::sync::Arc;
use std::time::Duration;

use gdpval_server::db::{ListQuery, PgTaskStore, StoreError, TaskFilter, TaskStore};
use gdpval_server::models::{Difficulty, FileMetadata, NewTask, RubricItem};
use sqlx::PgPool;

fn task(task_id: &str, sector: &str) -> NewTask {
    NewTask {
        task_id: task_id.into(),
        task_name: format!("Task {task_id}"),
        sector: sector.into(),
        occupation: "Financial Analysts".into(),
        instruction: "Reconcile the ledger.".into(),
        difficulty: Difficulty::Medium,
        expert_time_min: 60,
        junior_time_min: 150,
        rubrics: vec![
            RubricItem { name: "R1".into(), description: None, points: 5 },
            RubricItem { name: "R2".into(), description: Some("second".into()), points: 5 },
        ],
        solution_files: vec![file("answer.xlsx", 4096)],
        data_files: vec![file("ledger.csv", 512), file("chart.png", 2048)],
        task_yaml: "a: 1".into(),
        solution_sh: "#!/bin/sh\necho ok".into(),
    }
}

fn file(name: &str, size: i64) -> FileMetadata {
    let extension = name.rsplit('.').next().unwrap_or_default().to_string();
    FileMetadata {
        name: name.into(),
        size,
        extension,
        width: None,
        height: None,
        resolution: None,
        duration_seconds: None,
        duration_formatted: None,
    }
}

async fn count(pool: &PgPool, table: &str, task_id: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE task_id = $1"))
        .bind(task_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn row_counts(pool: &PgPool, task_id: &str) -> [i64; 6] {
    [
        count(pool, "gdpval_tasks", task_id).await,
        count(pool, "gdpval_rubrics", task_id).await,
        count(pool, "gdpval_solution_files", task_id).await,
        count(pool, "gdpval_data_files", task_id).await,
        count(pool, "gdpval_task_yaml", task_id).await,
        count(pool, "gdpval_solution_sh", task_id).await,
    ]
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn create_then_get_matches_input(pool: PgPool) {
    let store = PgTaskStore::new(pool.clone());
    let input = task("T1", "Finance");

    let created = store.create_task(&input).await.unwrap();
    assert_eq!(created.status, "draft");

    let fetched = store.get_task("T1").await.unwrap();
    assert_eq!(fetched.task_id, input.task_id);
    assert_eq!(fetched.task_name, input.task_name);
    assert_eq!(fetched.sector, input.sector);
    assert_eq!(fetched.occupation, input.occupation);
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.created_at, created.created_at);

    assert_eq!(row_counts(&pool, "T1").await, [1, 2, 1, 2, 1, 1]);
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn duplicate_fails_and_leaves_one_set_of_rows(pool: PgPool) {
    let store = PgTaskStore::new(pool.clone());
    store.create_task(&task("T1", "Finance")).await.unwrap();

    let mut again = task("T1", "Retail");
    again.rubrics.push(RubricItem { name: "R3".into(), description: None, points: 1 });
    let err = store.create_task(&again).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateTaskId { ref task_id } if task_id == "T1"));

    assert_eq!(row_counts(&pool, "T1").await, [1, 2, 1, 2, 1, 1]);
    assert_eq!(store.get_task("T1").await.unwrap().sector, "Finance");
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn concurrent_duplicates_have_one_winner(pool: PgPool) {
    let store = Arc::new(PgTaskStore::new(pool.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.create_task(&task("RACE", "Finance")).await })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let mut wins = 0;
    let mut duplicates = 0;
    for result in results {
        match result.expect("task panicked") {
            Ok(_) => wins += 1,
            Err(StoreError::DuplicateTaskId { .. }) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(row_counts(&pool, "RACE").await, [1, 2, 1, 2, 1, 1]);
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn failure_mid_fanout_rolls_back_everything(pool: PgPool) {
    let store = PgTaskStore::new(pool.clone());

    // Passes serde but violates the file_size CHECK at step 4.
    let mut bad = task("T-BAD", "Finance");
    bad.data_files.push(file("broken.bin", -1));

    let err = store.create_task(&bad).await.unwrap_err();
    assert_eq!(err.kind(), "transaction_aborted");
    assert_eq!(row_counts(&pool, "T-BAD").await, [0, 0, 0, 0, 0, 0]);

    // The task_id is still free.
    store.create_task(&task("T-BAD", "Finance")).await.unwrap();
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn cancelled_write_rolls_back_and_frees_connection(pool: PgPool) {
    let store = PgTaskStore::new(pool.clone());

    // Park the writer at the yaml insert, after header and rubrics are in.
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("LOCK TABLE gdpval_task_yaml IN ACCESS EXCLUSIVE MODE")
        .execute(&mut *blocker)
        .await
        .unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_millis(500),
        store.create_task(&task("T-CANCEL", "Finance")),
    )
    .await;
    assert!(outcome.is_err(), "write should still be blocked on the lock");

    blocker.rollback().await.unwrap();

    assert_eq!(row_counts(&pool, "T-CANCEL").await, [0, 0, 0, 0, 0, 0]);

    // The abandoned transaction rolls back and releases its row locks,
    // so the same task_id goes through instead of hanging.
    tokio::time::timeout(
        Duration::from_secs(10),
        store.create_task(&task("T-CANCEL", "Finance")),
    )
    .await
    .expect("retry blocked by the abandoned transaction")
    .unwrap();
    assert_eq!(row_counts(&pool, "T-CANCEL").await, [1, 2, 1, 2, 1, 1]);
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn detail_preserves_submission_order(pool: PgPool) {
    let store = PgTaskStore::new(pool);
    let mut input = task("T1", "Finance");
    input.rubrics = ["Accuracy", "Clarity", "Completeness", "Format"]
        .iter()
        .map(|name| RubricItem { name: name.to_string(), description: None, points: 10 })
        .collect();
    let mut video = file("walkthrough.mp4", 1_000_000);
    video.width = Some(1920);
    video.height = Some(1080);
    video.resolution = Some("1920x1080".into());
    video.duration_seconds = Some(93.5);
    video.duration_formatted = Some("1:33".into());
    input.solution_files.push(video.clone());
    store.create_task(&input).await.unwrap();

    let detail = store.get_task_detail("T1").await.unwrap();
    let names: Vec<_> = detail.rubrics.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Accuracy", "Clarity", "Completeness", "Format"]);
    for (i, rubric) in detail.rubrics.iter().enumerate() {
        assert_eq!(rubric.sort_order, i as i32);
    }
    assert_eq!(detail.solution_files, input.solution_files);
    assert_eq!(detail.data_files, input.data_files);
    assert_eq!(detail.solution_files[1], video);
    assert_eq!(detail.difficulty, "medium");
    assert_eq!(detail.task_yaml, "a: 1");
    assert_eq!(detail.solution_sh, "#!/bin/sh\necho ok");
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn missing_task_is_not_found(pool: PgPool) {
    let store = PgTaskStore::new(pool);
    assert_eq!(store.get_task("nope").await.unwrap_err().kind(), "not_found");
    assert_eq!(store.get_task_detail("nope").await.unwrap_err().kind(), "not_found");
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn list_filters_and_orders_newest_first(pool: PgPool) {
    let store = PgTaskStore::new(pool.clone());
    for (id, sector) in [("A", "Finance"), ("B", "Retail"), ("C", "Finance"), ("D", "Finance")] {
        store.create_task(&task(id, sector)).await.unwrap();
    }
    sqlx::query("UPDATE gdpval_tasks SET status = 'published' WHERE task_id = 'C'")
        .execute(&pool)
        .await
        .unwrap();

    let query = ListQuery::new(TaskFilter::default().sector("Finance"), 50, 0);
    let page = store.list_tasks(&query).await.unwrap();
    let ids: Vec<_> = page.iter().map(|h| h.task_id.as_str()).collect();
    assert_eq!(ids, ["D", "C", "A"]);
    assert!(page.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let query = ListQuery::new(TaskFilter::default().sector("Finance").status("published"), 50, 0);
    let page = store.list_tasks(&query).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].task_id, "C");

    let query = ListQuery::new(TaskFilter::default(), 2, 1);
    let page = store.list_tasks(&query).await.unwrap();
    let ids: Vec<_> = page.iter().map(|h| h.task_id.as_str()).collect();
    assert_eq!(ids, ["C", "B"]);
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn offset_past_end_is_empty(pool: PgPool) {
    let store = PgTaskStore::new(pool);
    store.create_task(&task("A", "Finance")).await.unwrap();

    let query = ListQuery::new(TaskFilter::default(), 10, 1);
    assert!(store.list_tasks(&query).await.unwrap().is_empty());
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn hostile_filter_is_a_literal(pool: PgPool) {
    let store = PgTaskStore::new(pool.clone());
    store.create_task(&task("A", "Finance")).await.unwrap();

    let hostile = "a'; DROP TABLE gdpval_tasks; --";
    let query = ListQuery::new(TaskFilter::default().sector(hostile), 50, 0);
    assert!(store.list_tasks(&query).await.unwrap().is_empty());

    // Table and row still there.
    assert_eq!(store.get_task("A").await.unwrap().sector, "Finance");

    let mut odd = task("Q", hostile);
    odd.task_name = "quote ' in name".into();
    store.create_task(&odd).await.unwrap();
    let page = store.list_tasks(&query).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].sector, hostile);
}

#[sqlx::test(migrator = "gdpval_server::MIGRATOR")]
#[ignore = "requires database"]
async fn orphan_child_row_is_referential_violation(pool: PgPool) {
    let err: sqlx::Error =
        sqlx::query("INSERT INTO gdpval_task_yaml (task_id, yaml_content) VALUES ($1, $2)")
            .bind("ghost")
            .bind("a: 1")
            .execute(&pool)
            .await
            .unwrap_err();
    let err = StoreError::from(err);
    assert_eq!(err.kind(), "referential_violation");
}

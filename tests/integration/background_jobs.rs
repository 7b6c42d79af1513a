//! Job registration and execution against an on-disk store.

use std::sync::Arc;

use salat::notifications::MemoryNotificationSink;
use salat::scheduler::jobs::{JobContext, execute_with};
use salat::scheduler::{
    BackgroundScheduler, DAILY_JOB, JobExecutor, JobFuture, JobInput, JobRunOutcome, JobRunner,
    MONTHLY_JOB,
};
use salat::store::{JsonFileStore, KeyValueStore, StoreExt, keys};
use serde_json::Value;

use crate::helpers::{CITY, ScriptedUpstream, at, config, date, month};

fn context(store: Arc<dyn KeyValueStore>) -> Arc<JobContext> {
    Arc::new(JobContext {
        config: config(),
        store,
        upstream: Arc::new(ScriptedUpstream::with_month(month(date(2025, 12, 1), 31))),
        sink: Arc::new(MemoryNotificationSink::new()),
    })
}

fn executor_for(ctx: Arc<JobContext>, now: chrono::NaiveDateTime) -> JobExecutor {
    Arc::new(move |input: JobInput| {
        let ctx = ctx.clone();
        Box::pin(async move { execute_with(&ctx, input, now).await }) as JobFuture
    })
}

#[tokio::test]
async fn registering_twice_leaves_one_job_of_each_kind() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.path()));
    let now = at(2025, 12, 20, 21, 0);
    let scheduler = BackgroundScheduler::new(store.clone(), 2, 0).unwrap();

    let mut runner = JobRunner::load(store.clone(), executor_for(context(store.clone()), now))
        .await
        .unwrap();
    assert!(scheduler.register_once(&mut runner, CITY, now).await.unwrap());

    // A second launch starts from what is on disk.
    let mut relaunched =
        JobRunner::load(store.clone(), executor_for(context(store.clone()), now))
            .await
            .unwrap();
    assert!(!scheduler.register_once(&mut relaunched, CITY, now).await.unwrap());

    assert_eq!(
        store
            .get_bool(keys::BACKGROUND_TASKS_INITIALIZED)
            .await
            .unwrap(),
        Some(true)
    );
    let persisted: Value = store.get_json(keys::BACKGROUND_JOBS).await.unwrap().unwrap();
    let names: Vec<&str> = persisted["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.iter().filter(|n| **n == DAILY_JOB).count(), 1);
    assert_eq!(names.iter().filter(|n| **n == MONTHLY_JOB).count(), 1);
    assert_eq!(names.len(), 2);
}

#[tokio::test]
async fn monthly_job_runs_first_and_daily_job_at_two() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.path()));
    let registered_at = at(2025, 12, 20, 21, 0);
    let scheduler = BackgroundScheduler::new(store.clone(), 2, 0).unwrap();
    let ctx = context(store.clone());

    let mut runner = JobRunner::load(store.clone(), executor_for(ctx.clone(), registered_at))
        .await
        .unwrap();
    scheduler
        .register_once(&mut runner, CITY, registered_at)
        .await
        .unwrap();

    assert_eq!(runner.tick(registered_at).await.unwrap(), 1);
    assert_eq!(runner.history()[0].job_name, MONTHLY_JOB);
    assert_eq!(runner.history()[0].outcome, JobRunOutcome::Success);
    assert!(store.contains(&keys::calendar(CITY)).await.unwrap());

    let two_am = at(2025, 12, 21, 2, 0);
    let mut runner = JobRunner::load(store.clone(), executor_for(ctx, two_am))
        .await
        .unwrap();
    assert_eq!(runner.tick(two_am).await.unwrap(), 1);
    let last = runner.history().last().unwrap();
    assert_eq!(last.job_name, DAILY_JOB);
    assert_eq!(last.outcome, JobRunOutcome::Success);
    assert!(store.contains(&keys::last_good_snapshot(CITY)).await.unwrap());
}

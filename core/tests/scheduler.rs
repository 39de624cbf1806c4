//! Deferred completion tests: scheduling, firing order, cancellation,
//! and teardown.

use survey_core::{
    catalog::CatalogStore,
    config::{CatalogConfig, SessionOptions},
    error::SurveyError,
    progress::UserProgress,
    session::SurveySession,
    store::SurveyStore,
};

// ── Test helpers ────────────────────────────────────────────────────────────

fn fresh_store() -> SurveyStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = SurveyStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn progress_on(plan: &str) -> UserProgress {
    let catalog = CatalogConfig::default_test();
    let mut p = UserProgress::seeded(&catalog.default_progress);
    p.current_plan = plan.into();
    p
}

fn session_over(
    store: SurveyStore,
    progress: UserProgress,
    options: SessionOptions,
) -> SurveySession {
    store.save_progress(&progress, 1).expect("plant progress");
    SurveySession::with_catalog(
        store,
        CatalogStore::ready(CatalogConfig::default_test()),
        options,
    )
    .expect("session")
}

fn make_session(progress: UserProgress, options: SessionOptions) -> SurveySession {
    session_over(fresh_store(), progress, options)
}

fn fixed_delay(ms: u64) -> SessionOptions {
    SessionOptions {
        min_completion_delay: ms,
        max_completion_delay: ms,
        ..SessionOptions::default()
    }
}

fn temp_db_path(tag: &str) -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("survey-scheduler-{tag}-{}.db", uuid::Uuid::new_v4()));
    path.to_string_lossy().into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn started_survey_completes_when_due() {
    let mut session = make_session(progress_on("Silver"), fixed_delay(3000));

    let task = session.start_survey("s1", 1000).unwrap();
    assert_eq!(task.due_at, 4000);
    assert_eq!(session.pending_completions().len(), 1);

    assert!(session.poll(3999).unwrap().is_empty());
    assert_eq!(session.progress().unwrap().total_earnings, 0.0);

    let fired = session.poll(4000).unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].task.handle, task.handle);
    assert_eq!(fired[0].result.as_ref().unwrap().reward, 90.0);
    assert_eq!(session.progress().unwrap().total_earnings, 90.0);
}

/// Two quick starts on a one-a-day plan both pass the start check, but the
/// second fails its quota check when it fires.
#[test]
fn overlapping_starts_resolve_in_firing_order() {
    let mut session = make_session(progress_on("Starter"), SessionOptions::default());

    let first = session.start_survey("s1", 0).unwrap();
    let second = session.start_survey("s2", 10).unwrap();

    let fired = session.poll(10_000).unwrap();
    assert_eq!(fired.len(), 2);

    let (winner, loser) = if fired[0].task.due_at <= fired[1].task.due_at {
        (&fired[0], &fired[1])
    } else {
        (&fired[1], &fired[0])
    };
    assert!(winner.result.is_ok());
    assert!(matches!(loser.result, Err(SurveyError::QuotaExceeded { .. })));
    assert!([first.handle, second.handle].contains(&winner.task.handle));

    let p = session.progress().unwrap();
    assert_eq!(p.surveys_completed_today, 1);
    assert_eq!(p.completed_surveys, [winner.task.survey_id.clone()]);
}

#[test]
fn start_is_refused_when_quota_is_spent() {
    let mut session = make_session(progress_on("Starter"), SessionOptions::default());
    session.complete("s1").unwrap();

    assert!(matches!(
        session.start_survey("s2", 0),
        Err(SurveyError::QuotaExceeded { .. })
    ));
    assert!(session.pending_completions().is_empty());
}

#[test]
fn delays_fall_in_configured_range() {
    let mut session = make_session(progress_on("Platinum"), SessionOptions::default());
    for i in 0..5 {
        let task = session.start_survey("s1", i * 100).unwrap();
        let delay = task.due_at - task.scheduled_at;
        assert!((2000..5000).contains(&delay), "delay {delay} out of range");
    }
}

#[test]
fn same_seed_same_schedule() {
    let mut a = make_session(progress_on("Gold"), SessionOptions::default());
    let mut b = make_session(progress_on("Gold"), SessionOptions::default());
    for i in 0..4 {
        assert_eq!(
            a.start_survey("s1", i).unwrap().due_at,
            b.start_survey("s1", i).unwrap().due_at
        );
    }
}

/// Default: leaving the view does not cancel pending completions.
#[test]
fn teardown_keeps_pending_completions_by_default() {
    let mut session = make_session(progress_on("Silver"), fixed_delay(2000));
    session.start_survey("s1", 0).unwrap();

    assert!(session.teardown_view().unwrap().is_empty());
    let fired = session.poll(2000).unwrap();
    assert_eq!(fired.len(), 1);
    assert!(fired[0].result.is_ok());
}

#[test]
fn teardown_cancels_when_configured() {
    let options = SessionOptions {
        cancel_on_teardown: true,
        ..fixed_delay(2000)
    };
    let mut session = make_session(progress_on("Silver"), options);
    session.start_survey("s1", 0).unwrap();
    session.start_survey("s2", 0).unwrap();

    assert_eq!(session.teardown_view().unwrap().len(), 2);
    assert!(session.poll(10_000).unwrap().is_empty());
    assert_eq!(session.progress().unwrap().total_earnings, 0.0);
    assert_eq!(session.store().event_count("completion_cancelled").unwrap(), 2);
}

#[test]
fn cancelled_handle_never_fires() {
    let mut session = make_session(progress_on("Silver"), fixed_delay(2000));
    let task = session.start_survey("s1", 0).unwrap();

    assert!(session.cancel(task.handle).unwrap());
    assert!(!session.cancel(task.handle).unwrap());
    assert!(session.poll(5000).unwrap().is_empty());
}

/// A start whose event cannot be recorded is not left pending.
#[test]
fn start_is_dropped_when_event_log_is_unwritable() {
    let path = temp_db_path("start-unlogged");
    let store = SurveyStore::open(&path).unwrap();
    store.migrate().unwrap();
    let mut session = session_over(store, progress_on("Silver"), fixed_delay(2000));

    let side = rusqlite::Connection::open(&path).unwrap();
    side.execute_batch("DROP TABLE event_log").unwrap();

    let err = session.start_survey("s1", 0).unwrap_err();
    assert!(matches!(err, SurveyError::Database(_)));
    assert!(session.pending_completions().is_empty());
    assert!(session.poll(10_000).unwrap().is_empty());
    assert_eq!(session.progress().unwrap().total_earnings, 0.0);

    drop(side);
    drop(session);
    let _ = std::fs::remove_file(&path);
}

//! `LocalRuntime` end to end, through the control surface, on paused time.

use std::sync::Arc;
use std::time::Duration;

use quizrun_core::error::DomainError;
use quizrun_core::repository::EventRepository;
use quizrun_event_store::in_memory_event_repository::InMemoryEventRepository;
use quizrun_quiz::application::control::{ControlResponse, QuizControl};
use quizrun_quiz::application::ports::{SessionRegistry, SignalBus};
use quizrun_quiz::application::settings::QuizSettings;
use quizrun_quiz::domain::commands::{SkipQuestion, StartQuiz, StopQuiz, SubmitAnswer};
use quizrun_quiz::domain::question::Question;
use quizrun_quiz::domain::session_key::SessionKey;
use quizrun_quiz::domain::signal::Signal;
use quizrun_runtime::LocalRuntime;
use quizrun_test_support::{
    FixedClock, Publication, RecordingPresentationSink, SlowLoadEventRepository,
    capital_question, question,
};
use tokio::time::Instant;
use uuid::Uuid;

fn key(channel_id: &str) -> SessionKey {
    SessionKey::new("guild-1", channel_id)
}

fn runtime(
    repo: &Arc<InMemoryEventRepository>,
    sink: &Arc<RecordingPresentationSink>,
) -> Arc<LocalRuntime> {
    Arc::new(LocalRuntime::new(
        Arc::new(FixedClock::reference()),
        repo.clone(),
        sink.clone(),
        QuizSettings::default(),
    ))
}

fn start(key: &SessionKey, questions: Vec<Question>) -> StartQuiz {
    StartQuiz {
        correlation_id: Uuid::new_v4(),
        key: key.clone(),
        questions,
    }
}

fn answer(key: &SessionKey, user_id: &str, answer_id: &str) -> SubmitAnswer {
    SubmitAnswer {
        correlation_id: Uuid::new_v4(),
        key: key.clone(),
        user_id: user_id.to_owned(),
        answer_id: answer_id.to_owned(),
    }
}

fn stop(key: &SessionKey) -> StopQuiz {
    StopQuiz {
        correlation_id: Uuid::new_v4(),
        key: key.clone(),
    }
}

async fn wait_until_idle(runtime: &LocalRuntime, key: &SessionKey) {
    while runtime.is_running(key).await {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn wait_for_events(repo: &InMemoryEventRepository, count: usize) {
    while repo.event_count().await < count {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn event_types(repo: &InMemoryEventRepository, key: &SessionKey) -> Vec<String> {
    repo.load_events(key.stream_id())
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_started_quiz_runs_to_leaderboard_and_deregisters() {
    // Arrange
    let repo = Arc::new(InMemoryEventRepository::new());
    let sink = Arc::new(RecordingPresentationSink::new());
    let runtime = runtime(&repo, &sink);
    let control = runtime.control();
    let key = key("channel-1");

    // Act
    let started = control.start(&start(&key, vec![capital_question()])).await;
    let answered = control.submit_answer(&answer(&key, "A", "paris")).await;
    wait_until_idle(&runtime, &key).await;

    // Assert
    assert_eq!(started, ControlResponse::Accepted);
    assert_eq!(answered, ControlResponse::Accepted);
    let leaderboards = sink.leaderboards();
    assert_eq!(leaderboards.len(), 1);
    assert_eq!(leaderboards[0].to_string(), "A: 1 points");
    assert_eq!(
        event_types(&repo, &key).await.last().map(String::as_str),
        Some("quiz.quiz_completed")
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_bank_is_rejected_without_starting() {
    let repo = Arc::new(InMemoryEventRepository::new());
    let sink = Arc::new(RecordingPresentationSink::new());
    let runtime = runtime(&repo, &sink);
    let key = key("channel-1");

    let response = runtime.control().start(&start(&key, vec![])).await;

    assert!(matches!(response, ControlResponse::Rejected(_)));
    assert!(!runtime.is_running(&key).await);
    assert_eq!(repo.event_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    // Arrange
    let repo = Arc::new(InMemoryEventRepository::new());
    let sink = Arc::new(RecordingPresentationSink::new());
    let runtime = runtime(&repo, &sink);
    let control = runtime.control();
    let key = key("channel-1");

    // Act
    let before = control.stop(&stop(&key)).await;
    control.start(&start(&key, vec![capital_question()])).await;
    sink.wait_for(1).await;
    let during = control.stop(&stop(&key)).await;
    wait_until_idle(&runtime, &key).await;
    let after = control.stop(&stop(&key)).await;

    // Assert
    assert_eq!(before, ControlResponse::Accepted);
    assert_eq!(during, ControlResponse::Accepted);
    assert_eq!(after, ControlResponse::Accepted);
    assert_eq!(
        event_types(&repo, &key).await.last().map(String::as_str),
        Some("quiz.quiz_cancelled")
    );
    assert!(sink.leaderboards().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_answer_without_a_quiz_reports_no_active_quiz() {
    let repo = Arc::new(InMemoryEventRepository::new());
    let sink = Arc::new(RecordingPresentationSink::new());
    let runtime = runtime(&repo, &sink);
    let key = key("channel-1");

    let response = runtime.control().submit_answer(&answer(&key, "A", "paris")).await;
    let raised = runtime.raise_signal(&key, Signal::Skip).await;

    assert_eq!(response, ControlResponse::NoActiveQuiz);
    assert!(matches!(raised, Err(DomainError::NoActiveSession(_))));
}

#[tokio::test(start_paused = true)]
async fn test_new_quiz_supersedes_the_running_one() {
    // Arrange
    let repo = Arc::new(InMemoryEventRepository::new());
    let sink = Arc::new(RecordingPresentationSink::new());
    let runtime = runtime(&repo, &sink);
    let control = runtime.control();
    let key = key("channel-1");
    control
        .start(&start(&key, vec![question("old", "Old?", "paris", 30_000)]))
        .await;
    sink.wait_for(1).await;

    // Act
    let response = control
        .start(&start(&key, vec![question("new", "New?", "lyon", 1000)]))
        .await;
    wait_until_idle(&runtime, &key).await;

    // Assert
    assert_eq!(response, ControlResponse::Accepted);
    let types = event_types(&repo, &key).await;
    let terminated = types
        .iter()
        .position(|t| t == "quiz.quiz_terminated")
        .unwrap();
    assert_eq!(types[terminated + 1], "quiz.quiz_started");
    assert_eq!(types.last().map(String::as_str), Some("quiz.quiz_completed"));
    let questions: Vec<_> = sink
        .publications()
        .into_iter()
        .filter_map(|p| match p {
            Publication::Question { question_id } => Some(question_id),
            _ => None,
        })
        .collect();
    assert_eq!(questions, vec!["old", "new"]);
}

#[tokio::test(start_paused = true)]
async fn test_sessions_for_different_channels_are_independent() {
    // Arrange
    let repo = Arc::new(InMemoryEventRepository::new());
    let sink = Arc::new(RecordingPresentationSink::new());
    let runtime = runtime(&repo, &sink);
    let control = runtime.control();
    let first = key("channel-1");
    let second = key("channel-2");
    control.start(&start(&first, vec![capital_question()])).await;
    control.start(&start(&second, vec![capital_question()])).await;
    sink.wait_for(2).await;

    // Act
    control.stop(&stop(&first)).await;
    wait_until_idle(&runtime, &first).await;

    // Assert
    assert!(runtime.is_running(&second).await);
    assert_eq!(
        control
            .skip(&SkipQuestion {
                correlation_id: Uuid::new_v4(),
                key: second.clone(),
            })
            .await,
        ControlResponse::Accepted
    );
    wait_until_idle(&runtime, &second).await;
    assert_eq!(
        event_types(&repo, &second).await.last().map(String::as_str),
        Some("quiz.quiz_completed")
    );
}

/// A runtime whose every stream load takes two seconds.
fn slow_loading_runtime(
    repo: &Arc<InMemoryEventRepository>,
    sink: &Arc<RecordingPresentationSink>,
) -> Arc<LocalRuntime> {
    Arc::new(LocalRuntime::new(
        Arc::new(FixedClock::reference()),
        Arc::new(SlowLoadEventRepository::new(
            repo.clone(),
            Duration::from_secs(2),
        )),
        sink.clone(),
        QuizSettings::default(),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_signals_reach_other_channels_while_a_start_is_loading() {
    // Arrange
    let repo = Arc::new(InMemoryEventRepository::new());
    let sink = Arc::new(RecordingPresentationSink::new());
    let runtime = slow_loading_runtime(&repo, &sink);
    let running = key("channel-1");
    let starting = key("channel-2");
    runtime
        .start_session(&running, vec![capital_question()], Uuid::new_v4())
        .await
        .unwrap();
    let pending = tokio::spawn({
        let runtime = runtime.clone();
        let starting = starting.clone();
        async move {
            runtime
                .start_session(&starting, vec![capital_question()], Uuid::new_v4())
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Act
    let sent_at = Instant::now();
    let raised = runtime
        .raise_signal(&running, Signal::answer("A", "paris"))
        .await;
    let still_running = runtime.is_running(&running).await;
    let waited = sent_at.elapsed();

    // Assert
    assert!(raised.is_ok());
    assert!(still_running);
    assert!(waited < Duration::from_millis(100), "signal waited {waited:?}");
    pending.await.unwrap().unwrap();
    assert!(runtime.is_running(&starting).await);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_starts_leave_one_live_driver() {
    // Arrange
    let repo = Arc::new(InMemoryEventRepository::new());
    let sink = Arc::new(RecordingPresentationSink::new());
    let runtime = slow_loading_runtime(&repo, &sink);
    let key = key("channel-1");
    let spawn_start = |question_id: &'static str| {
        let runtime = runtime.clone();
        let key = key.clone();
        tokio::spawn(async move {
            runtime
                .start_session(
                    &key,
                    vec![question(question_id, "Capital?", "paris", 1000)],
                    Uuid::new_v4(),
                )
                .await
        })
    };

    // Act
    let first = spawn_start("first");
    let second = spawn_start("second");
    let results = [first.await.unwrap(), second.await.unwrap()];
    let registered = runtime.is_running(&key).await;
    wait_until_idle(&runtime, &key).await;

    // Assert
    assert!(results.iter().any(Result::is_ok));
    assert!(registered);
    assert_eq!(
        event_types(&repo, &key).await.last().map(String::as_str),
        Some("quiz.quiz_completed")
    );
    assert_eq!(sink.leaderboards().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_terminate_records_termination_and_frees_the_key() {
    let repo = Arc::new(InMemoryEventRepository::new());
    let sink = Arc::new(RecordingPresentationSink::new());
    let runtime = runtime(&repo, &sink);
    let key = key("channel-1");
    runtime
        .start_session(&key, vec![capital_question()], Uuid::new_v4())
        .await
        .unwrap();

    runtime.terminate_session(&key, "maintenance").await.unwrap();

    assert!(!runtime.is_running(&key).await);
    assert_eq!(
        event_types(&repo, &key).await.last().map(String::as_str),
        Some("quiz.quiz_terminated")
    );
    assert!(matches!(
        runtime.terminate_session(&key, "again").await,
        Err(DomainError::NoActiveSession(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_recovered_session_resumes_without_republishing() {
    // Arrange
    let repo = Arc::new(InMemoryEventRepository::new());
    let first_sink = Arc::new(RecordingPresentationSink::new());
    let first = runtime(&repo, &first_sink);
    let key = key("channel-1");
    first
        .control()
        .start(&start(&key, vec![capital_question()]))
        .await;
    wait_for_events(&repo, 3).await;
    first.shutdown().await;
    assert!(!first.is_running(&key).await);

    // Act
    let second_sink = Arc::new(RecordingPresentationSink::new());
    let second = runtime(&repo, &second_sink);
    let resumed = second.recover().await.unwrap();
    second
        .control()
        .submit_answer(&answer(&key, "A", "paris"))
        .await;
    wait_until_idle(&second, &key).await;

    // Assert
    assert_eq!(resumed, 1);
    assert_eq!(second_sink.question_count(), 0);
    let leaderboards = second_sink.leaderboards();
    assert_eq!(leaderboards.len(), 1);
    assert_eq!(leaderboards[0].to_string(), "A: 1 points");
    assert_eq!(second.recover().await.unwrap(), 0);
}

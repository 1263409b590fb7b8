//! Quiz session streams journaled through `PgEventRepository`.

use std::sync::Arc;
use std::time::Duration;

use quizrun_core::clock::Clock;
use quizrun_core::error::DomainError;
use quizrun_core::event::EventMetadata;
use quizrun_core::repository::EventRepository;
use quizrun_event_store::pg_event_repository::PgEventRepository;
use quizrun_quiz::application::journal::SessionJournal;
use quizrun_quiz::domain::round::{RoundOutcome, RoundState};
use quizrun_quiz::domain::session_key::SessionKey;
use quizrun_quiz::domain::signal::AnswerSubmission;
use quizrun_test_support::{FixedClock, capital_question, question};
use sqlx::PgPool;
use uuid::Uuid;

fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::reference())
}

fn submission(user_id: &str, answer_id: &str) -> AnswerSubmission {
    AnswerSubmission {
        user_id: user_id.to_owned(),
        answer_id: answer_id.to_owned(),
    }
}

/// Starts a two-question quiz on `key` and plays its first round up to the
/// reveal, with alice answering correctly and bob not.
async fn journal_first_round(repo: &Arc<PgEventRepository>, key: &SessionKey) -> SessionJournal {
    let mut journal = SessionJournal::open(key, clock(), repo.clone())
        .await
        .unwrap();
    let questions = vec![
        capital_question(),
        question("q2", "Largest French port?", "marseille", 5000),
    ];
    journal
        .record(|session, clock| session.start_quiz(key, questions, Uuid::new_v4(), clock))
        .await
        .unwrap();
    journal
        .record(|session, clock| session.begin_round(0, clock))
        .await
        .unwrap();
    journal
        .record(|session, clock| session.mark_presented(clock))
        .await
        .unwrap();
    for (user_id, answer_id) in [("alice", "paris"), ("bob", "lyon")] {
        journal
            .record(|session, clock| session.record_answer(&submission(user_id, answer_id), clock))
            .await
            .unwrap();
    }
    journal
        .record(|session, clock| {
            session.end_round(RoundOutcome::Continue, Duration::from_secs(5), clock)
        })
        .await
        .unwrap();
    journal
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance at DATABASE_URL"]
async fn test_unknown_key_opens_an_empty_stream(pool: PgPool) {
    let repo = Arc::new(PgEventRepository::new(pool));

    let journal = SessionJournal::open(&SessionKey::new("guild", "quiet"), clock(), repo)
        .await
        .unwrap();

    assert_eq!(journal.session().version, 0);
    assert!(!journal.session().is_running());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance at DATABASE_URL"]
async fn test_journaled_session_reconstitutes_from_postgres(pool: PgPool) {
    // Arrange
    let repo = Arc::new(PgEventRepository::new(pool));
    let key = SessionKey::new("guild-1", "channel-1");
    let written = journal_first_round(&repo, &key).await;

    // Act
    let reopened = SessionJournal::open(&key, clock(), repo).await.unwrap();

    // Assert
    let (before, after) = (written.session(), reopened.session());
    assert_eq!(after.version, before.version);
    assert_eq!(after.key.as_ref(), Some(&key));
    assert_eq!(after.run, 1);
    assert_eq!(after.correlation_id, before.correlation_id);
    assert_eq!(after.questions, before.questions);
    assert_eq!(after.scores, before.scores);
    assert_eq!(after.scores.get("alice"), Some(&1));
    assert_eq!(after.scores.get("bob"), Some(&0));
    assert_eq!(after.round_correct, before.round_correct);
    let round = after.round.as_ref().unwrap();
    assert_eq!(round.state, RoundState::Revealing);
    assert_eq!(
        round.reveal_until,
        before.round.as_ref().and_then(|r| r.reveal_until)
    );
    assert!(after.is_running());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance at DATABASE_URL"]
async fn test_stored_events_carry_deterministic_ids(pool: PgPool) {
    // Arrange
    let repo = Arc::new(PgEventRepository::new(pool));
    let key = SessionKey::new("guild-1", "channel-1");
    journal_first_round(&repo, &key).await;

    // Act
    let events = repo.load_events(key.stream_id()).await.unwrap();

    // Assert
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "quiz.quiz_started",
            "quiz.round_started",
            "quiz.question_presented",
            "quiz.answer_recorded",
            "quiz.answer_recorded",
            "quiz.round_ended",
        ]
    );
    for (position, event) in (1_i64..).zip(&events) {
        assert_eq!(event.aggregate_id, key.stream_id());
        assert_eq!(event.sequence_number, position);
        assert_eq!(
            event.event_id,
            EventMetadata::deterministic_event_id(key.stream_id(), position)
        );
        assert_eq!(event.occurred_at, FixedClock::reference().now());
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance at DATABASE_URL"]
async fn test_stale_journal_gets_concurrency_conflict(pool: PgPool) {
    // Arrange
    let repo = Arc::new(PgEventRepository::new(pool));
    let key = SessionKey::new("guild-1", "channel-1");
    let mut first = SessionJournal::open(&key, clock(), repo.clone())
        .await
        .unwrap();
    first
        .record(|session, clock| {
            session.start_quiz(&key, vec![capital_question()], Uuid::new_v4(), clock)
        })
        .await
        .unwrap();
    let mut stale = SessionJournal::open(&key, clock(), repo.clone())
        .await
        .unwrap();
    first
        .record(|session, clock| session.begin_round(0, clock))
        .await
        .unwrap();

    // Act
    let result = stale
        .record(|session, clock| session.begin_round(0, clock))
        .await;

    // Assert
    match result {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id,
            expected,
            actual,
        }) => {
            assert_eq!(aggregate_id, key.stream_id());
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    assert_eq!(stale.session().version, 1);
    assert_eq!(repo.load_events(key.stream_id()).await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance at DATABASE_URL"]
async fn test_colliding_sequence_is_a_conflict_and_rolls_back(pool: PgPool) {
    // Arrange
    let repo = Arc::new(PgEventRepository::new(pool));
    let key = SessionKey::new("guild-1", "channel-1");
    let journal = journal_first_round(&repo, &key).await;
    let version = journal.session().version;
    let events = repo.load_events(key.stream_id()).await.unwrap();
    let mut next = events.last().unwrap().clone();
    next.sequence_number = version + 1;
    next.event_id = EventMetadata::deterministic_event_id(key.stream_id(), version + 1);

    // Act
    let result = repo
        .append_events(key.stream_id(), version, &[next.clone(), next])
        .await;

    // Assert
    assert!(matches!(
        result,
        Err(DomainError::ConcurrencyConflict { expected, actual, .. })
            if expected == version && actual == version + 1
    ));
    let reloaded = repo.load_events(key.stream_id()).await.unwrap();
    assert_eq!(reloaded.len(), events.len());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance at DATABASE_URL"]
async fn test_list_aggregate_ids_returns_each_session_stream(pool: PgPool) {
    // Arrange
    let repo = Arc::new(PgEventRepository::new(pool));
    let first = SessionKey::new("guild-1", "channel-1");
    let second = SessionKey::new("guild-2", "channel-1");
    journal_first_round(&repo, &first).await;
    journal_first_round(&repo, &second).await;

    // Act
    let ids = repo.list_aggregate_ids().await.unwrap();

    // Assert
    let mut expected = vec![first.stream_id(), second.stream_id()];
    expected.sort();
    assert_eq!(ids, expected);
}

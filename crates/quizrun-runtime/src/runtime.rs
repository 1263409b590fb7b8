//! Session registry and signal bus backed by tokio tasks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use quizrun_core::clock::Clock;
use quizrun_core::error::DomainError;
use quizrun_core::repository::EventRepository;
use quizrun_quiz::application::control::{DurableQuizControl, SUPERSEDED_REASON};
use quizrun_quiz::application::inbox::{SignalInbox, SignalSender};
use quizrun_quiz::application::journal::SessionJournal;
use quizrun_quiz::application::ports::{PresentationSink, SessionRegistry, SignalBus};
use quizrun_quiz::application::round_resolver::RoundResolver;
use quizrun_quiz::application::session_driver::{DriverExit, SessionDriver};
use quizrun_quiz::application::settings::QuizSettings;
use quizrun_quiz::domain::question::Question;
use quizrun_quiz::domain::session_key::SessionKey;
use quizrun_quiz::domain::signal::Signal;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

type Sessions = Arc<RwLock<HashMap<SessionKey, SessionHandle>>>;

/// A live driver task and the sender feeding its inbox.
struct SessionHandle {
    generation: u64,
    run: u32,
    signals: SignalSender,
    task: JoinHandle<()>,
}

/// Runs quiz sessions as tasks on the current tokio runtime.
///
/// Session progress is journaled to the event repository, so a new
/// `LocalRuntime` over the same repository can [`recover`](Self::recover)
/// whatever was running when the previous one went away.
pub struct LocalRuntime {
    clock: Arc<dyn Clock>,
    repository: Arc<dyn EventRepository>,
    presentation: Arc<dyn PresentationSink>,
    settings: QuizSettings,
    sessions: Sessions,
    next_generation: AtomicU64,
}

impl fmt::Debug for LocalRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRuntime")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl LocalRuntime {
    /// Creates a runtime with no sessions.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        repository: Arc<dyn EventRepository>,
        presentation: Arc<dyn PresentationSink>,
        settings: QuizSettings,
    ) -> Self {
        Self {
            clock,
            repository,
            presentation,
            settings,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Returns a control surface that starts and signals sessions on this
    /// runtime.
    #[must_use]
    pub fn control(self: &Arc<Self>) -> DurableQuizControl {
        DurableQuizControl::new(self.clone(), self.clone())
    }

    /// Respawns a driver for every session the event store still shows as
    /// running. Each resumes at its persisted phase.
    ///
    /// Streams are loaded without holding the session table, so signals for
    /// sessions that are already running keep flowing during recovery.
    ///
    /// Returns how many sessions were resumed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the streams cannot be listed or loaded.
    pub async fn recover(&self) -> Result<usize, DomainError> {
        let stream_ids = self.repository.list_aggregate_ids().await?;
        let mut resumed = 0;
        for stream_id in stream_ids {
            let journal =
                SessionJournal::open_stream(stream_id, self.clock.clone(), self.repository.clone())
                    .await?;
            let session = journal.session();
            if !session.is_running() {
                continue;
            }
            let Some(key) = session.key.clone() else {
                continue;
            };
            let (run, cursor) = (session.run, session.cursor);

            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&key) {
                continue;
            }
            info!(
                guild_id = %key.guild_id,
                channel_id = %key.channel_id,
                run,
                cursor,
                "resuming session"
            );
            self.spawn_driver(&mut sessions, key, journal);
            resumed += 1;
        }
        Ok(resumed)
    }

    /// Aborts every driver task without recording anything, leaving the
    /// sessions resumable by a later [`recover`](Self::recover).
    pub async fn shutdown(&self) {
        let handles: Vec<_> = self.sessions.write().await.drain().collect();
        for (key, handle) in handles {
            debug!(guild_id = %key.guild_id, channel_id = %key.channel_id, "stopping driver");
            stop_task(handle.task).await;
        }
    }

    async fn open(&self, key: &SessionKey) -> Result<SessionJournal, DomainError> {
        SessionJournal::open(key, self.clock.clone(), self.repository.clone()).await
    }

    /// Records termination of whatever run the key's stream has in progress.
    async fn terminate_stream(&self, key: &SessionKey, reason: &str) -> Result<(), DomainError> {
        let mut journal = self.open(key).await?;
        if journal.session().is_running() {
            journal
                .record(|session, clock| session.terminate(reason, clock))
                .await?;
        }
        Ok(())
    }

    fn spawn_driver(
        &self,
        sessions: &mut HashMap<SessionKey, SessionHandle>,
        key: SessionKey,
        journal: SessionJournal,
    ) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let run = journal.session().run;
        let (signals, inbox) = SignalInbox::channel();
        let resolver = RoundResolver::new(self.presentation.clone(), self.settings);
        let driver = SessionDriver::new(journal, inbox, resolver);
        let registry = self.sessions.clone();
        let span = info_span!(
            "session",
            guild_id = %key.guild_id,
            channel_id = %key.channel_id,
        );
        let owner = key.clone();

        let task = tokio::spawn(
            async move {
                match driver.run().await {
                    Ok(DriverExit::Completed(leaderboard)) => {
                        info!(standings = leaderboard.standings().len(), "session completed");
                    }
                    Ok(DriverExit::Cancelled) => info!("session cancelled"),
                    Err(err) => error!(error = %err, "session abandoned"),
                }
                let mut sessions = registry.write().await;
                if sessions
                    .get(&owner)
                    .is_some_and(|handle| handle.generation == generation)
                {
                    sessions.remove(&owner);
                }
            }
            .instrument(span),
        );

        sessions.insert(
            key,
            SessionHandle {
                generation,
                run,
                signals,
                task,
            },
        );
    }
}

async fn stop_task(task: JoinHandle<()>) {
    task.abort();
    match task.await {
        Err(err) if err.is_panic() => warn!(error = %err, "driver task panicked"),
        _ => {}
    }
}

#[async_trait]
impl SessionRegistry for LocalRuntime {
    #[instrument(
        skip(self, key, questions),
        fields(guild_id = %key.guild_id, channel_id = %key.channel_id, %correlation_id)
    )]
    async fn start_session(
        &self,
        key: &SessionKey,
        questions: Vec<Question>,
        correlation_id: Uuid,
    ) -> Result<(), DomainError> {
        let previous = self.sessions.write().await.remove(key);
        if let Some(handle) = previous {
            stop_task(handle.task).await;
        }
        self.terminate_stream(key, SUPERSEDED_REASON).await?;

        let mut journal = self.open(key).await?;
        journal
            .record(|session, clock| session.start_quiz(key, questions, correlation_id, clock))
            .await?;
        let run = journal.session().run;
        info!(run, "session started");

        let mut sessions = self.sessions.write().await;
        // A concurrent start for this key may have registered while ours was
        // journaling. The higher run is the one still live in the stream.
        if sessions.get(key).is_some_and(|handle| handle.run > run) {
            warn!(run, "superseded by a concurrent start");
            return Ok(());
        }
        let displaced = sessions.remove(key);
        self.spawn_driver(&mut sessions, key.clone(), journal);
        drop(sessions);

        if let Some(handle) = displaced {
            warn!(run = handle.run, "replacing a driver registered by a concurrent start");
            stop_task(handle.task).await;
        }
        Ok(())
    }

    #[instrument(skip(self, key), fields(guild_id = %key.guild_id, channel_id = %key.channel_id))]
    async fn terminate_session(&self, key: &SessionKey, reason: &str) -> Result<(), DomainError> {
        let handle = self.sessions.write().await.remove(key);
        let Some(handle) = handle else {
            return Err(DomainError::NoActiveSession(format!("no quiz running for {key}")));
        };
        stop_task(handle.task).await;
        self.terminate_stream(key, reason).await?;
        info!("session terminated");
        Ok(())
    }

    async fn is_running(&self, key: &SessionKey) -> bool {
        self.sessions.read().await.contains_key(key)
    }
}

#[async_trait]
impl SignalBus for LocalRuntime {
    async fn raise_signal(&self, key: &SessionKey, signal: Signal) -> Result<(), DomainError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(key)
            .ok_or_else(|| DomainError::NoActiveSession(format!("no quiz running for {key}")))?;
        let name = signal.name();
        handle.signals.send(signal).map_err(|_| {
            DomainError::SignalDelivery(format!("session for {key} no longer accepts {name}"))
        })?;
        debug!(
            guild_id = %key.guild_id,
            channel_id = %key.channel_id,
            signal = name,
            "signal raised"
        );
        Ok(())
    }
}

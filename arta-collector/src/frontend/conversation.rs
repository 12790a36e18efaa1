//! Conversation engine
//!
//! Drives one user's session through genre → count → analysis → results.
//! Replies to direct input are returned; anything produced later by the
//! background pipeline task goes through the [`Notifier`].

use crate::frontend::progress::format_progress;
use crate::frontend::reply::{Notifier, Reply};
use crate::frontend::session_store::SessionStore;
use crate::models::analysis_session::SessionView;
use crate::models::{AnalysisRequest, SessionState, MAX_ARTISTS_COUNT, MIN_ARTISTS_COUNT};
use crate::report::{ChartChoice, ChartKind, RenderedChart};
use crate::services::pipeline::{AnalysisRunner, PipelineError, PipelineOutcome};
use arta_common::events::{ArtaEvent, EventBus, ProgressListener};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const SESSION_EXPIRED: &str = "Session expired. Use /analyze to start a new analysis.";
const NO_SESSION: &str = "Use /analyze to start a new analysis, or /help to see available commands.";
const CHART_MENU_PROMPT: &str = "Choose a plot to view:";
const CHART_MENU_AGAIN: &str = "Choose another plot to view:";

/// Slash commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Analyze,
    End,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('/').to_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            "analyze" => Ok(Command::Analyze),
            "end" => Ok(Command::End),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Analyze => "analyze",
            Command::End => "end",
        };
        f.write_str(name)
    }
}

/// Why a chart could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartUnavailable {
    /// No live session, or the session holds no results
    SessionExpired,
}

/// Conversation front-end over a session store and an analysis runner
#[derive(Clone)]
pub struct Conversation {
    store: SessionStore,
    runner: Arc<dyn AnalysisRunner>,
    notifier: Arc<dyn Notifier>,
    events: EventBus,
    default_genre: String,
    default_count: u32,
}

/// Forwards pipeline events to the session's progress handler and the bus
struct ChannelListener {
    tx: mpsc::UnboundedSender<ArtaEvent>,
    events: EventBus,
}

impl ProgressListener for ChannelListener {
    fn on_event(&self, event: &ArtaEvent) {
        self.events.emit_lossy(event.clone());
        let _ = self.tx.send(event.clone());
    }
}

fn parse_count(text: &str, default_count: u32) -> Result<u32, &'static str> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(default_count);
    }
    let count: i64 = text.parse().map_err(|_| "Please enter a valid number.")?;
    if count < i64::from(MIN_ARTISTS_COUNT) {
        return Err("Please enter a number at least 10.");
    }
    if count > i64::from(MAX_ARTISTS_COUNT) {
        return Err("Please enter a number no more than 1000.");
    }
    Ok(count as u32)
}

impl Conversation {
    pub fn new(
        store: SessionStore,
        runner: Arc<dyn AnalysisRunner>,
        notifier: Arc<dyn Notifier>,
        events: EventBus,
    ) -> Self {
        let store = store.on_expire({
            let notifier = Arc::clone(&notifier);
            move |user_id| notifier.forget(user_id)
        });
        Self {
            store,
            runner,
            notifier,
            events,
            default_genre: "metal".to_string(),
            default_count: 100,
        }
    }

    /// Override the genre suggestion and the count used for empty input
    pub fn with_defaults(mut self, default_genre: impl Into<String>, default_count: u32) -> Self {
        self.default_genre = default_genre.into();
        self.default_count = default_count;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn handle_command(&self, user_id: &str, command: Command) -> Vec<Reply> {
        tracing::debug!(user_id = %user_id, command = %command, "Handling command");
        match command {
            Command::Start => vec![Reply::text(
                "Hello! 👋\n\n\
                 I'm the Music Artist Analytics Bot. I can fetch and analyze music artists data by genre.\n\n\
                 Use /analyze to start a new analysis.\n\
                 Use /help to see all available commands.",
            )],
            Command::Help => vec![Reply::text(format!(
                "Here's what I can do:\n\n\
                 /start - Start the bot\n\
                 /help - Show this help message\n\
                 /analyze - Begin a new analysis\n\
                 /end - End the conversation\n\n\
                 When you start an analysis, I'll ask you for:\n\
                 1. A music genre or tag (e.g., 'Metal', 'Jazz', 'Hip Hop')\n\
                 2. How many artists to analyze ({}-{})\n\n\
                 I'll then fetch data from MusicBrainz and Spotify, process it, and show you insights!",
                MIN_ARTISTS_COUNT, MAX_ARTISTS_COUNT
            ))],
            Command::Analyze => self.begin_analysis(user_id).await,
            Command::End => {
                if self.store.remove(user_id).await {
                    tracing::info!(user_id = %user_id, "Session ended by user");
                }
                vec![Reply::text(
                    "Thanks for using the Music Artist Analytics Bot! 👋\n\
                     Come back anytime for more insights on your favorite music genres.",
                )]
            }
        }
    }

    async fn begin_analysis(&self, user_id: &str) -> Vec<Reply> {
        if let Some(session) = self.store.get(user_id).await {
            if session.is_collecting() {
                return vec![Reply::text(
                    "An analysis is already running. Please wait for it to finish, or use /end to stop.",
                )];
            }
        }

        self.store.create(user_id).await;
        vec![Reply::text(format!(
            "Let's analyze some music artists! 🎵\n\n\
             First, tell me which genre or tag you're interested in:\n\
             (e.g., '{}', 'Jazz', 'Rock', 'Pop', 'Hip Hop', etc.)",
            capitalize(&self.default_genre)
        ))]
    }

    /// Free-text input
    pub async fn handle_text(&self, user_id: &str, text: &str) -> Vec<Reply> {
        let now = self.store.clock().now();
        let Some(session) = self
            .store
            .update(user_id, |session| {
                session.touch(now);
                session.clone()
            })
            .await
        else {
            return vec![Reply::text(NO_SESSION)];
        };

        match session.state {
            SessionState::AwaitingGenre => {
                let genre = text.trim();
                if genre.is_empty() {
                    return vec![Reply::text("Please enter a valid genre.")];
                }
                self.store
                    .update(user_id, |s| {
                        s.genre = Some(genre.to_string());
                        s.transition_to(SessionState::AwaitingCount, now);
                    })
                    .await;
                vec![Reply::text(format!(
                    "Great! Now tell me how many artists to analyze ({}-{}):\n\
                     (Default is {} if you just press Enter)",
                    MIN_ARTISTS_COUNT, MAX_ARTISTS_COUNT, self.default_count
                ))]
            }
            SessionState::AwaitingCount => {
                let count = match parse_count(text, self.default_count) {
                    Ok(count) => count,
                    Err(message) => return vec![Reply::text(message)],
                };
                let genre = session.genre.clone().unwrap_or_default();
                self.start_collecting(user_id, genre, count).await
            }
            SessionState::Collecting => vec![Reply::text(
                session
                    .progress_text
                    .unwrap_or_else(|| "Analysis in progress, please wait...".to_string()),
            )],
            SessionState::ShowingResults => match text.parse::<ChartChoice>() {
                Ok(choice) => self.select_chart(user_id, choice).await,
                Err(_) => vec![Reply::chart_menu(CHART_MENU_PROMPT)],
            },
            SessionState::Idle => vec![Reply::text("Use /analyze to start a new analysis.")],
        }
    }

    async fn start_collecting(&self, user_id: &str, genre: String, count: u32) -> Vec<Reply> {
        let request = match AnalysisRequest::new(genre, count) {
            Ok(request) => request,
            Err(e) => return vec![Reply::text(e.to_string())],
        };
        let run_id = Uuid::new_v4();
        let now = self.store.clock().now();

        let started = self
            .store
            .update(user_id, |s| {
                if s.is_collecting() {
                    return false;
                }
                s.count = Some(request.count);
                s.transition_to(SessionState::Collecting, now);
                s.run_id = Some(run_id);
                true
            })
            .await
            .unwrap_or(false);
        if !started {
            return vec![Reply::text("An analysis is already running. Please wait for it to finish.")];
        }

        tracing::info!(
            user_id = %user_id,
            run_id = %run_id,
            genre = %request.genre,
            count = request.count,
            "Starting analysis"
        );
        let reply = Reply::text(format!(
            "Starting analysis of {} {} artists! 🎸\n\n\
             This may take a few minutes, please be patient while I gather the data...",
            request.count, request.genre
        ));

        let conversation = self.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            conversation.run_in_background(user_id, run_id, request).await;
        });

        vec![reply]
    }

    async fn run_in_background(&self, user_id: String, run_id: Uuid, request: AnalysisRequest) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ArtaEvent>();
        let listener: Arc<dyn ProgressListener> = Arc::new(ChannelListener {
            tx,
            events: self.events.clone(),
        });

        let progress = {
            let conversation = self.clone();
            let user_id = user_id.clone();
            let genre = request.genre.clone();
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    conversation.apply_progress(&user_id, run_id, &genre, &event).await;
                }
            })
        };

        let runner = Arc::clone(&self.runner);
        let genre = request.genre.clone();
        let run = tokio::spawn(async move { runner.run_analysis(run_id, request, listener).await });
        let outcome = match run.await {
            Ok(outcome) => outcome,
            Err(e) => Err(PipelineError::Task(e.to_string())),
        };
        // Listener dropped with the run task; drain remaining progress first
        let _ = progress.await;

        self.finish(&user_id, run_id, &genre, outcome).await;
    }

    async fn apply_progress(&self, user_id: &str, run_id: Uuid, genre: &str, event: &ArtaEvent) {
        let (phase, detail) = match event {
            ArtaEvent::PhaseChanged { phase, .. } if phase.is_terminal() => {
                (*phase, "Analysis finished")
            }
            ArtaEvent::PhaseChanged { phase, .. } => (*phase, "Working..."),
            ArtaEvent::ProgressDetail { phase, message, .. } => (*phase, message.as_str()),
            _ => return,
        };

        let text = self
            .store
            .update_run(user_id, run_id, |session| {
                let text = format_progress(genre, phase, detail);
                session.phase = Some(phase);
                session.progress_text = Some(text.clone());
                text
            })
            .await;

        if let Some(text) = text {
            self.notifier.progress(user_id, &text);
        }
    }

    async fn finish(
        &self,
        user_id: &str,
        run_id: Uuid,
        genre: &str,
        outcome: Result<PipelineOutcome, PipelineError>,
    ) {
        let now = self.store.clock().now();

        match outcome {
            Ok(PipelineOutcome::Completed(result)) => {
                let result = Arc::new(*result);
                let summary = result.report().summary();
                let stored = self
                    .store
                    .update_run(user_id, run_id, |session| {
                        session.transition_to(SessionState::ShowingResults, now);
                        session.results = Some(Arc::clone(&result));
                    })
                    .await;
                if stored.is_none() {
                    tracing::info!(user_id = %user_id, run_id = %run_id, "Session gone, discarding results");
                    return;
                }

                self.notifier.notify(user_id, Reply::text(summary.render_text()));
                if !summary.top_artists.is_empty() {
                    self.notifier.notify(user_id, Reply::text(summary.render_top_artists()));
                }
                for artist in &summary.top_artists {
                    if let Some(image) = &artist.image {
                        self.notifier.notify(
                            user_id,
                            Reply::ImageUrl {
                                url: image.clone(),
                                caption: artist.name.clone(),
                            },
                        );
                    }
                }
                self.notifier.notify(user_id, Reply::chart_menu(CHART_MENU_PROMPT));
            }
            Ok(PipelineOutcome::NothingFound { reason }) => {
                tracing::info!(user_id = %user_id, run_id = %run_id, reason = %reason, "Analysis found nothing");
                let reset = self
                    .store
                    .update_run(user_id, run_id, |s| {
                        s.transition_to(SessionState::Idle, now);
                    })
                    .await;
                if reset.is_some() {
                    self.notifier.notify(
                        user_id,
                        Reply::text(format!(
                            "Sorry, I couldn't find any {} artists. Try another genre?",
                            genre
                        )),
                    );
                }
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, run_id = %run_id, error = %e, "Analysis failed");
                let reset = self
                    .store
                    .update_run(user_id, run_id, |s| {
                        s.transition_to(SessionState::Idle, now);
                    })
                    .await;
                if reset.is_some() {
                    self.notifier.notify(
                        user_id,
                        Reply::text(format!(
                            "Sorry, an error occurred while processing the data: {}\n\
                             Please try again with a different genre or count.",
                            e
                        )),
                    );
                }
            }
        }
    }

    /// Render the selected chart(s) and offer the menu again
    pub async fn select_chart(&self, user_id: &str, choice: ChartChoice) -> Vec<Reply> {
        let charts = match self.charts(user_id, choice).await {
            Ok(charts) => charts,
            Err(ChartUnavailable::SessionExpired) => return vec![Reply::text(SESSION_EXPIRED)],
        };

        let mut replies: Vec<Reply> = charts.into_iter().map(Reply::from).collect();
        if choice == ChartChoice::All {
            replies.push(Reply::text("All plots generated successfully!"));
        }
        replies.push(Reply::chart_menu(CHART_MENU_AGAIN));
        replies
    }

    /// Render a single chart for the current results
    pub async fn chart(&self, user_id: &str, kind: ChartKind) -> Result<RenderedChart, ChartUnavailable> {
        let mut charts = self.charts(user_id, ChartChoice::Single(kind)).await?;
        charts.pop().ok_or(ChartUnavailable::SessionExpired)
    }

    /// Render the chart(s) for `choice` from the user's current results
    pub async fn charts(&self, user_id: &str, choice: ChartChoice) -> Result<Vec<RenderedChart>, ChartUnavailable> {
        let now = self.store.clock().now();
        let results = self
            .store
            .update(user_id, |session| {
                session.touch(now);
                session.results.clone()
            })
            .await
            .flatten()
            .ok_or(ChartUnavailable::SessionExpired)?;

        Ok(results.report().charts(choice))
    }

    /// Serializable snapshot of the user's session
    pub async fn session_view(&self, user_id: &str) -> Option<SessionView> {
        self.store.get(user_id).await.map(|s| SessionView::from(&s))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

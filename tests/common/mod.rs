//! Shared fixtures for runtime integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use notch_island_lib::errors::ProviderError;
use notch_island_lib::playback::{MediaProvider, PlaybackSnapshot, ProviderCommand};

type Answer = Result<Option<PlaybackSnapshot>, ProviderError>;

struct ProviderState {
    running: bool,
    player_name: String,
    queued: VecDeque<(Answer, Option<Duration>)>,
    current: Answer,
    latency: Duration,
    commands: Vec<ProviderCommand>,
    queries: usize,
    fail_commands: bool,
}

/// Provider whose answers are scripted by the test.
///
/// Queued answers are served first, then `current` on every query. Seeks
/// move the current answer's position like a real player would.
pub struct ScriptedProvider {
    state: Mutex<ProviderState>,
}

impl ScriptedProvider {
    pub fn new(current: Answer) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ProviderState {
                running: true,
                player_name: "Music".to_string(),
                queued: VecDeque::new(),
                current,
                latency: Duration::ZERO,
                commands: Vec::new(),
                queries: 0,
                fail_commands: false,
            }),
        })
    }

    pub fn playing(title: &str, duration: f64, elapsed: f64) -> Arc<Self> {
        Self::new(Ok(Some(track(title, duration, elapsed, true))))
    }

    pub fn idle() -> Arc<Self> {
        Self::new(Ok(None))
    }

    pub fn set_current(&self, answer: Answer) {
        self.lock().current = answer;
    }

    pub fn queue(&self, answer: Answer) {
        self.lock().queued.push_back((answer, None));
    }

    /// Queue an answer that takes `latency` to arrive, whatever the default.
    pub fn queue_delayed(&self, answer: Answer, latency: Duration) {
        self.lock().queued.push_back((answer, Some(latency)));
    }

    pub fn set_running(&self, running: bool) {
        self.lock().running = running;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    pub fn fail_commands(&self) {
        self.lock().fail_commands = true;
    }

    pub fn commands(&self) -> Vec<ProviderCommand> {
        self.lock().commands.clone()
    }

    pub fn queries(&self) -> usize {
        self.lock().queries
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap()
    }

    fn command(&self, command: ProviderCommand) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.commands.push(command);
        if state.fail_commands {
            return Err(ProviderError::CommandFailed {
                command: command.name(),
                reason: "scripted failure".to_string(),
            });
        }
        if let (ProviderCommand::SeekTo(time), Ok(Some(snapshot))) =
            (command, state.current.as_mut())
        {
            snapshot.elapsed_time = time;
        }
        Ok(())
    }
}

impl MediaProvider for ScriptedProvider {
    fn is_app_running(&self) -> bool {
        self.lock().running
    }

    fn active_player_name(&self) -> String {
        self.lock().player_name.clone()
    }

    fn now_playing(&self) -> impl Future<Output = Answer> + Send {
        let (answer, latency) = {
            let mut state = self.lock();
            state.queries += 1;
            match state.queued.pop_front() {
                Some((answer, latency)) => (answer, latency.unwrap_or(state.latency)),
                None => (state.current.clone(), state.latency),
            }
        };
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            answer
        }
    }

    fn play_pause(&self) -> Result<(), ProviderError> {
        self.command(ProviderCommand::PlayPause)
    }

    fn next_track(&self) -> Result<(), ProviderError> {
        self.command(ProviderCommand::NextTrack)
    }

    fn previous_track(&self) -> Result<(), ProviderError> {
        self.command(ProviderCommand::PreviousTrack)
    }

    fn seek_to(&self, time: f64) -> Result<(), ProviderError> {
        self.command(ProviderCommand::SeekTo(time))
    }
}

pub fn track(title: &str, duration: f64, elapsed: f64, is_playing: bool) -> PlaybackSnapshot {
    PlaybackSnapshot {
        title: title.to_string(),
        artist: "Artist".to_string(),
        album: "Album".to_string(),
        duration,
        elapsed_time: elapsed,
        is_playing,
        artwork: None,
        source_app_name: "Music".to_string(),
    }
}

/// Let the runtime drain everything that is due now.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

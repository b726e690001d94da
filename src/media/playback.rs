use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use super::timeline::{Timeline, compute_timeline};
use crate::ui::prelude::{Level, emit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
    Ended,
}

/// Signals from the underlying audio clock, delivered in emission order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportEvent {
    /// Audio metadata became available; duration is now trustworthy.
    MetadataLoaded { duration: f64 },
    /// Playback position report from the audio clock.
    Position { seconds: f64 },
    /// The audio stream reached its end.
    Ended,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlayError {
    /// The host refused to start audio without a user gesture.
    #[error("audio playback was blocked; tap play to start audio")]
    AutoplayBlocked,
    #[error("audio transport failure: {0}")]
    Transport(String),
}

/// Seam between the playback state machine and whatever actually produces
/// sound. Lets tests drive the machine with a scripted fake and lets the
/// terminal preview run against a timer-backed stand-in.
#[async_trait]
pub trait AudioTransport: Send {
    /// Requests playback from the current position. Settles asynchronously;
    /// the host may reject (autoplay policy).
    async fn play(&mut self) -> Result<(), PlayError>;
    async fn pause(&mut self);
    async fn seek(&mut self, seconds: f64);
}

/// Read-only view of the player for the UI layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub position: f64,
    pub active_slide: Option<usize>,
}

/// State machine that keeps the visible slide in sync with the audio clock.
///
/// The transport's reported position is the only time authority; the active
/// slide index is always rederived from it and never stored independently.
/// All transport calls go through `&mut self` and are awaited to completion,
/// so a second play request cannot be issued before the previous one has
/// settled (the pause-before-play-resolves race this rules out is real on
/// media elements).
pub struct PlaybackController<T: AudioTransport> {
    transport: T,
    timeline: Timeline,
    image_count: usize,
    min_slide_seconds: f64,
    status: PlaybackStatus,
    position: f64,
    notice: Option<String>,
    play_pending: bool,
}

impl<T: AudioTransport> PlaybackController<T> {
    pub fn new(
        image_count: usize,
        audio_duration: Option<f64>,
        min_slide_seconds: f64,
        transport: T,
    ) -> Result<Self> {
        let timeline = compute_timeline(image_count, audio_duration, min_slide_seconds)?;
        Ok(Self {
            transport,
            timeline,
            image_count,
            min_slide_seconds,
            status: PlaybackStatus::Idle,
            position: 0.0,
            notice: None,
            play_pending: false,
        })
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Derived on every read so it can never disagree with the position.
    pub fn active_slide(&self) -> Option<usize> {
        self.timeline.slide_at(self.position)
    }

    /// Last recoverable playback condition, e.g. an autoplay rejection.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status,
            position: self.position,
            active_slide: self.active_slide(),
        }
    }

    /// Requests the `Playing` state. On rejection the status reverts to
    /// `Paused` (never a false `Playing`) and the condition is surfaced via
    /// [`notice`](Self::notice) as user-actionable, not fatal.
    pub async fn play(&mut self) -> Result<(), PlayError> {
        match self.status {
            PlaybackStatus::Playing | PlaybackStatus::Ended => Ok(()),
            PlaybackStatus::Idle | PlaybackStatus::Paused => {
                self.notice = None;
                self.status = PlaybackStatus::Playing;
                self.issue_play().await
            }
        }
    }

    pub async fn pause(&mut self) {
        if self.status == PlaybackStatus::Playing {
            self.transport.pause().await;
            self.status = PlaybackStatus::Paused;
        }
    }

    /// Jumps to an absolute position. Resumes audio only when currently
    /// playing; a paused player keeps its pause while the position moves.
    pub async fn seek(&mut self, seconds: f64) -> Result<(), PlayError> {
        let clamped = seconds.clamp(0.0, self.timeline.total_duration());
        self.position = clamped;
        self.transport.seek(clamped).await;
        if self.status == PlaybackStatus::Playing {
            return self.issue_play().await;
        }
        Ok(())
    }

    pub async fn jump_to_slide(&mut self, index: usize) -> Result<(), PlayError> {
        let clamped = index.min(self.image_count.saturating_sub(1));
        let start = self.timeline.intervals()[clamped].start;
        self.seek(start).await
    }

    /// Explicit restart: position back to zero, then request playback.
    pub async fn restart(&mut self) -> Result<(), PlayError> {
        self.position = 0.0;
        self.transport.seek(0.0).await;
        self.notice = None;
        self.status = PlaybackStatus::Playing;
        self.issue_play().await
    }

    /// Feeds one transport event through the state machine. Events must be
    /// delivered in emission order; duplicates are idempotent.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::MetadataLoaded { duration } => {
                // Replace the timeline wholesale; never patch intervals.
                match compute_timeline(
                    self.image_count,
                    Some(duration),
                    self.min_slide_seconds,
                ) {
                    Ok(timeline) => {
                        emit(
                            Level::Debug,
                            "playback.timeline",
                            &format!(
                                "Recomputed timeline: {} slides over {:.2}s",
                                timeline.slide_count(),
                                timeline.total_duration()
                            ),
                            None,
                        );
                        self.timeline = timeline;
                    }
                    Err(err) => emit(
                        Level::Warn,
                        "playback.timeline",
                        &format!("Ignoring unusable audio duration: {err}"),
                        None,
                    ),
                }
            }
            TransportEvent::Position { seconds } => {
                if self.status != PlaybackStatus::Playing {
                    return;
                }
                self.position = seconds;
                if seconds >= self.timeline.total_duration() {
                    self.status = PlaybackStatus::Ended;
                }
            }
            TransportEvent::Ended => {
                if self.status != PlaybackStatus::Idle {
                    self.status = PlaybackStatus::Ended;
                }
            }
        }
    }

    async fn issue_play(&mut self) -> Result<(), PlayError> {
        debug_assert!(!self.play_pending, "overlapping play requests");
        self.play_pending = true;
        let outcome = self.transport.play().await;
        self.play_pending = false;

        if let Err(err) = &outcome {
            self.status = PlaybackStatus::Paused;
            self.notice = Some(err.to_string());
            emit(
                Level::Warn,
                "playback.play",
                &format!("Play request rejected: {err}"),
                None,
            );
        }
        outcome
    }
}

/// Timer-backed stand-in for a real audio element, used by the terminal
/// preview. Always accepts play requests; the preview loop synthesizes
/// position events from elapsed wall-clock time.
pub struct SimulatedTransport;

#[async_trait]
impl AudioTransport for SimulatedTransport {
    async fn play(&mut self) -> Result<(), PlayError> {
        Ok(())
    }

    async fn pause(&mut self) {}

    async fn seek(&mut self, _seconds: f64) {}
}

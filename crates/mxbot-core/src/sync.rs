//! The long-poll loop: poll, advance the cursor, route, reply.

use std::{sync::Arc, time::Duration};

use rand::{rngs::StdRng, SeedableRng};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    commands::CommandRegistry,
    config::SyncSettings,
    domain::RoomId,
    errors::Error,
    responder::ResponseGenerator,
    router::{self, Routed},
    session::Session,
    stats::BotState,
    transport::{SyncRequest, SyncResponse, Transport},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopPhase {
    /// No request outstanding.
    Idle,
    /// One long-poll in flight.
    Polling,
}

/// Result of a single poll round.
#[derive(Debug)]
pub enum PollOutcome {
    Processed { routed: usize },
    TimedOut,
    Failed(Error),
}

pub struct SyncLoop {
    transport: Arc<dyn Transport>,
    settings: SyncSettings,
    session: Session,
    state: BotState,
    registry: CommandRegistry,
    responder: ResponseGenerator,
    rng: StdRng,
    phase: LoopPhase,
}

impl SyncLoop {
    pub fn new(
        transport: Arc<dyn Transport>,
        settings: SyncSettings,
        session: Session,
        state: BotState,
    ) -> Self {
        Self {
            transport,
            settings,
            session,
            state,
            registry: CommandRegistry::new(),
            responder: ResponseGenerator::new(),
            rng: StdRng::from_entropy(),
            phase: LoopPhase::Idle,
        }
    }

    /// Replace the random source (deterministic replies in tests).
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn note_room(&mut self, room_id: RoomId, name: Option<String>) {
        self.state.note_room(room_id, name);
    }

    /// Poll until `cancel` fires. Cancellation is observed between iterations;
    /// a poll already in flight is allowed to finish.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(user_id = %self.session.user_id(), "starting sync loop");

        while !cancel.is_cancelled() {
            match self.poll_once().await {
                PollOutcome::Processed { routed } => {
                    if routed > 0 {
                        debug!(routed, "batch processed");
                    }
                    pause(self.settings.idle_delay, &cancel).await;
                }
                PollOutcome::TimedOut => {
                    debug!("sync timeout (normal)");
                }
                PollOutcome::Failed(e) => {
                    warn!(
                        error = %e,
                        cooldown_ms = self.settings.error_cooldown.as_millis() as u64,
                        "sync failed, cooling down"
                    );
                    pause(self.settings.error_cooldown, &cancel).await;
                }
            }
        }

        info!("sync loop stopped");
    }

    /// One Idle → Polling → Idle round.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let req = SyncRequest {
            since: self.session.cursor().cloned(),
            timeout: self.settings.sync_timeout,
            request_timeout: self.settings.request_timeout,
        };

        self.phase = LoopPhase::Polling;
        let result = self
            .transport
            .sync(self.session.access_token(), &req)
            .await;
        self.phase = LoopPhase::Idle;

        match result {
            Ok(batch) => {
                // Advance before dispatch: a failing handler never replays this range.
                self.session.advance_cursor(batch.next_batch.clone());
                let routed = self.handle_batch(&batch).await;
                PollOutcome::Processed { routed }
            }
            Err(e) if e.is_timeout() => PollOutcome::TimedOut,
            Err(e) => PollOutcome::Failed(e),
        }
    }

    async fn handle_batch(&mut self, batch: &SyncResponse) -> usize {
        for room_id in batch.rooms.join.keys() {
            self.state.note_room(room_id.clone(), None);
        }

        let routed = router::route(batch, self.session.user_id());
        let count = routed.len();
        for msg in routed {
            self.handle(msg).await;
        }
        count
    }

    async fn handle(&mut self, msg: Routed) {
        let room_id = msg.room_id().clone();
        let reply = match msg {
            Routed::Command(cmd) => {
                info!(room_id = %room_id, sender = %cmd.sender, token = %cmd.token, "command received");
                self.registry.dispatch(&cmd, &self.state, &mut self.rng)
            }
            Routed::FreeText(text) => {
                info!(
                    room_id = %room_id,
                    sender = %text.sender,
                    preview = %text.text.chars().take(50).collect::<String>(),
                    "message received"
                );
                if !self.settings.reply_delay.is_zero() {
                    sleep(self.settings.reply_delay).await;
                }
                self.responder.reply(&text.text, &text.sender, &mut self.rng)
            }
        };

        self.send(&room_id, &reply).await;
    }

    /// Deliver a message. Failures are logged, never retried.
    pub async fn send(&self, room_id: &RoomId, body: &str) -> bool {
        match self
            .transport
            .send_text(self.session.access_token(), room_id, body)
            .await
        {
            Ok(()) => {
                self.state.stats.record_message_sent();
                debug!(room_id = %room_id, "message sent");
                true
            }
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "message send failed");
                false
            }
        }
    }
}

async fn pause(d: Duration, cancel: &CancellationToken) {
    if d.is_zero() {
        return;
    }
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = sleep(d) => {}
    }
}

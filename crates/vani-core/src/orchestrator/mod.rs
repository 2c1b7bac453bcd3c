//! **Call-Session Orchestrator**: one state machine per phone call.
//!
//! Every call is owned by a [`actor::SessionActor`] task. Webhook inputs, transcription
//! completions and timer expiries all arrive on that task's queue, so a digit press and a
//! pipeline completion for the same call can never interleave. The registry only maps call
//! ids to queue senders; calls never share state.
//!
//! ```text
//!  webhook ──► Orchestrator ──► [call queue] ──► SessionActor ──► providers
//!                  ▲                 ▲                │
//!                  └── Reply ◄───────┼────────────────┤
//!                                    └── completions ◄┘
//!                                 every transition ──► EventBus
//! ```

mod actor;
mod pipeline;
mod prompts;

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::bus::EventBus;
use crate::config::OrchestratorConfig;
use crate::error::Feature;
use crate::prompt::{Route, VoiceResponse};
use crate::providers::{AudioRef, Providers};
use crate::session::{CallId, CallState, Session};

use actor::{Command, SessionActor};

const CALL_QUEUE_DEPTH: usize = 32;

/// Which recording webhook fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingKind {
    Question,
    Subject,
}

/// Caller-side input for one call.
#[derive(Debug, Clone)]
pub enum Inbound {
    Accepted { caller: String, orphan: bool },
    Digits(String),
    RecordingFinished { kind: RecordingKind, audio: Option<AudioRef> },
    Hangup { goodbye: bool },
}

/// Which branch of the state machine handled an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Normal transition (or deliberate stay) along the menu table.
    Advanced,
    /// Input had no effect, e.g. a second stop-recording press.
    NoOp,
    /// Answer requested before the transcription finished.
    StillProcessing,
    NoQuestion,
    InvalidInput,
    ProviderUnavailable(Feature),
    NoHistory,
    SessionNotFound,
    Ended,
}

/// What the webhook should answer with.
#[derive(Debug, Clone)]
pub struct Reply {
    pub response: VoiceResponse,
    /// Session state after the input was handled (`Idle` once the call is gone).
    pub state: CallState,
    pub outcome: Outcome,
}

impl Reply {
    fn lost() -> Self {
        Reply {
            response: VoiceResponse::new().redirect(Route::Welcome),
            state: CallState::Idle,
            outcome: Outcome::SessionNotFound,
        }
    }
}

struct SessionHandle {
    tx: mpsc::Sender<Command>,
    actor_id: u64,
}

pub(crate) struct Shared {
    bus: EventBus,
    providers: Providers,
    config: OrchestratorConfig,
    sessions: DashMap<CallId, SessionHandle>,
    next_actor: AtomicU64,
}

impl Shared {
    /// Drop the registry entry only if it still belongs to `actor_id`.
    pub(crate) fn deregister(&self, call_id: &CallId, actor_id: u64) {
        self.sessions.remove_if(call_id, |_, h| h.actor_id == actor_id);
    }
}

/// Entry point for telephony webhooks. Cheap to clone.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    pub fn new(bus: EventBus, providers: Providers, config: OrchestratorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                bus,
                providers,
                config,
                sessions: DashMap::new(),
                next_actor: AtomicU64::new(1),
            }),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    pub fn providers(&self) -> &Providers {
        &self.shared.providers
    }

    /// A call was accepted, or the gateway redirected an existing call to the welcome route.
    pub async fn call_accepted(&self, call_id: &CallId, caller: &str) -> Reply {
        let input = Inbound::Accepted { caller: caller.to_string(), orphan: false };
        self.dispatch(call_id, caller, input).await
    }

    /// Caller pressed one or more digits.
    pub async fn digit_pressed(&self, call_id: &CallId, digits: &str, caller: &str) -> Reply {
        self.dispatch(call_id, caller, Inbound::Digits(digits.to_string())).await
    }

    /// The gateway finished a recording started by a previous reply.
    pub async fn recording_finished(
        &self,
        call_id: &CallId,
        kind: RecordingKind,
        audio: Option<AudioRef>,
        caller: &str,
    ) -> Reply {
        self.dispatch(call_id, caller, Inbound::RecordingFinished { kind, audio }).await
    }

    /// Caller hung up (or the call failed). Releases everything held for this call only.
    pub async fn call_ended(&self, call_id: &CallId) -> Reply {
        let Some(tx) = self.sender(call_id) else {
            return Reply {
                response: VoiceResponse::new().hangup(),
                state: CallState::Idle,
                outcome: Outcome::NoOp,
            };
        };
        self.send(&tx, Inbound::Hangup { goodbye: false }).await.unwrap_or_else(Reply::lost)
    }

    /// Current view of a session, if the call is live.
    pub async fn session(&self, call_id: &CallId) -> Option<Session> {
        let tx = self.sender(call_id)?;
        let (reply, rx) = oneshot::channel();
        tx.send(Command::Snapshot { reply }).await.ok()?;
        rx.await.ok()
    }

    /// Snapshots of every live call.
    pub async fn sessions(&self) -> Vec<Session> {
        let ids: Vec<CallId> = self.shared.sessions.iter().map(|e| e.key().clone()).collect();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(s) = self.session(&id).await {
                out.push(s);
            }
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }

    pub fn active_calls(&self) -> usize {
        self.shared.sessions.len()
    }

    fn sender(&self, call_id: &CallId) -> Option<mpsc::Sender<Command>> {
        self.shared.sessions.get(call_id).map(|h| h.tx.clone())
    }

    async fn dispatch(&self, call_id: &CallId, caller: &str, input: Inbound) -> Reply {
        if let Some(tx) = self.sender(call_id) {
            match self.send(&tx, input.clone()).await {
                Some(reply) => return reply,
                None => {
                    // Actor finished between lookup and send; start over.
                    warn!(target: "vani::orchestrator", call_id = %call_id, "session queue closed; starting fresh");
                }
            }
        }

        // Only a new call or a keypress can open a session. A recording callback or hang-up
        // for a call we no longer hold gets a hang-up back.
        let orphan = match input {
            Inbound::Accepted { .. } => false,
            Inbound::Digits(_) => true,
            Inbound::RecordingFinished { kind, .. } => {
                warn!(target: "vani::orchestrator", call_id = %call_id, ?kind, "recording for unknown call");
                return Reply {
                    response: VoiceResponse::new().hangup(),
                    state: CallState::Idle,
                    outcome: Outcome::SessionNotFound,
                };
            }
            Inbound::Hangup { .. } => {
                return Reply {
                    response: VoiceResponse::new().hangup(),
                    state: CallState::Idle,
                    outcome: Outcome::NoOp,
                };
            }
        };
        let tx = self.spawn_session(call_id, caller);
        let first = Inbound::Accepted { caller: caller.to_string(), orphan };
        self.send(&tx, first).await.unwrap_or_else(Reply::lost)
    }

    fn spawn_session(&self, call_id: &CallId, caller: &str) -> mpsc::Sender<Command> {
        use dashmap::mapref::entry::Entry;

        match self.shared.sessions.entry(call_id.clone()) {
            // Another webhook for the same call won the race.
            Entry::Occupied(e) => e.get().tx.clone(),
            Entry::Vacant(v) => {
                let actor_id = self.shared.next_actor.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = mpsc::channel(CALL_QUEUE_DEPTH);
                v.insert(SessionHandle { tx: tx.clone(), actor_id });
                let session = Session::new(call_id.clone(), caller);
                let actor = SessionActor::new(self.shared.clone(), actor_id, tx.clone(), session);
                tokio::spawn(actor.run(rx));
                info!(target: "vani::orchestrator", call_id = %call_id, caller, "📞 session opened");
                tx
            }
        }
    }

    async fn send(&self, tx: &mpsc::Sender<Command>, input: Inbound) -> Option<Reply> {
        let (reply, rx) = oneshot::channel();
        tx.send(Command::Inbound { input, reply }).await.ok()?;
        rx.await.ok()
    }
}

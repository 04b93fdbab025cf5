use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use rollcall_attendance::AttendanceError;
use rollcall_types::api::{Claims, ScanKind};
use rollcall_types::events::{ScannerCommand, ScannerEvent};
use rollcall_types::models::Role;

use crate::attendance::apply_scan;
use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::decode_token;

/// Server pings every 15 seconds; two missed pongs drop the session.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Tracks the one live scanner session per event.
#[derive(Clone, Default)]
pub struct ScannerRegistry {
    sessions: Arc<Mutex<HashMap<u64, (Uuid, CancellationToken)>>>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for `event_id`, cancelling whichever session held it.
    pub fn claim(&self, event_id: u64) -> ScannerLease {
        let session_id = Uuid::new_v4();
        let token = CancellationToken::new();

        let previous = self
            .lock()
            .insert(event_id, (session_id, token.clone()));
        if let Some((old_id, old_token)) = previous {
            info!("Scanner {} on event {} superseded by {}", old_id, event_id, session_id);
            old_token.cancel();
        }

        ScannerLease {
            registry: self.clone(),
            event_id,
            session_id,
            token,
        }
    }

    /// Cancel the session for `event_id`, if any.
    pub fn close(&self, event_id: u64) {
        if let Some((_, token)) = self.lock().remove(&event_id) {
            token.cancel();
        }
    }

    pub fn is_active(&self, event_id: u64) -> bool {
        self.lock().contains_key(&event_id)
    }

    fn release(&self, event_id: u64, session_id: Uuid) {
        let mut sessions = self.lock();
        // A newer session may already own the slot.
        if sessions.get(&event_id).is_some_and(|(id, _)| *id == session_id) {
            sessions.remove(&event_id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, (Uuid, CancellationToken)>> {
        // The map holds no invariants a panicking holder could break.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A claimed scanner slot. Dropping it releases the slot.
pub struct ScannerLease {
    registry: ScannerRegistry,
    event_id: u64,
    session_id: Uuid,
    token: CancellationToken,
}

impl ScannerLease {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ScannerLease {
    fn drop(&mut self) {
        self.registry.release(self.event_id, self.session_id);
    }
}

/// GET /api/events/{id}/scanner: upgrade to a scanner session.
///
/// Browsers cannot attach headers to a WebSocket, so the admin JWT arrives
/// in the first `identify` message instead.
pub async fn scanner_ws(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let exists = state.store.read(|data| data.event(event_id).is_some())?;
    if !exists {
        return Err(ApiError::NotFound("Event not found".into()));
    }

    Ok(ws.on_upgrade(move |socket| run_scanner(socket, state, event_id)))
}

async fn run_scanner(socket: WebSocket, state: AppState, event_id: u64) {
    let (mut sender, mut receiver) = socket.split();

    let claims = match wait_for_identify(&mut receiver, &state.jwt_secret).await {
        Some(claims) if claims.role == Role::Admin => claims,
        Some(claims) => {
            warn!("'{}' opened a scanner without admin role", claims.username);
            let _ = send(&mut sender, &ScannerEvent::Error {
                message: ApiError::Forbidden.to_string(),
            })
            .await;
            return;
        }
        None => {
            warn!("Scanner client failed to identify, closing");
            return;
        }
    };

    let event_name = match state.store.read(|data| data.event(event_id).map(|e| e.name.clone())) {
        Ok(Some(name)) => name,
        _ => {
            let _ = send(&mut sender, &ScannerEvent::Error {
                message: "Event not found".into(),
            })
            .await;
            return;
        }
    };

    let lease = state.scanners.claim(event_id);
    info!(
        "'{}' started scanner {} for event {} '{}'",
        claims.username,
        lease.session_id(),
        event_id,
        event_name
    );

    let reason = scan_loop(&mut sender, &mut receiver, &state, event_id, event_name, &lease).await;

    let _ = send(&mut sender, &ScannerEvent::Stopped {
        reason: reason.to_string(),
    })
    .await;
    let _ = sender.close().await;
    info!("Scanner {} for event {} stopped: {}", lease.session_id(), event_id, reason);
}

/// Runs until the session should end and says why. Each scan is handled to
/// completion before the next message is read.
async fn scan_loop(
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    event_id: u64,
    event_name: String,
    lease: &ScannerLease,
) -> &'static str {
    if send(sender, &ScannerEvent::Ready { event_id, event_name }).await.is_err() {
        return "connection lost";
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            _ = lease.cancelled() => return "scanner closed by the server",
            msg = receiver.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("Scanner socket error: {}", e);
                        return "connection lost";
                    }
                    None => return "connection closed",
                };

                match msg {
                    Message::Text(text) => match serde_json::from_str::<ScannerCommand>(&text) {
                        Ok(ScannerCommand::Scan { code }) => {
                            let reply = handle_scan(state, event_id, &code);
                            if send(sender, &reply).await.is_err() {
                                return "connection lost";
                            }
                        }
                        Ok(ScannerCommand::Stop) => return "stopped by operator",
                        Ok(ScannerCommand::Identify { .. }) => {}
                        Err(e) => {
                            let raw: String = text.chars().take(200).collect();
                            warn!("Bad scanner command: {} -- raw: {}", e, raw);
                            let reply = ScannerEvent::Error { message: "Unrecognised command".into() };
                            if send(sender, &reply).await.is_err() {
                                return "connection lost";
                            }
                        }
                    },
                    Message::Pong(_) => missed_heartbeats = 0,
                    Message::Close(_) => return "connection closed",
                    _ => {}
                }
            }
            _ = heartbeat.tick() => {
                if missed_heartbeats >= 2 {
                    warn!("Scanner heartbeat timeout on event {}", event_id);
                    return "heartbeat timeout";
                }
                missed_heartbeats += 1;
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    return "connection lost";
                }
            }
        }
    }
}

pub fn handle_scan(state: &AppState, event_id: u64, code: &str) -> ScannerEvent {
    match apply_scan(state, event_id, code) {
        Ok(scan) => match scan.kind {
            ScanKind::CheckedIn => ScannerEvent::CheckedIn { record: scan.record },
            ScanKind::CheckedOut => ScannerEvent::CheckedOut { record: scan.record },
            ScanKind::AlreadyCompleted => ScannerEvent::AlreadyCompleted { record: scan.record },
            ScanKind::MarkedAbsent => ScannerEvent::MarkedAbsent { record: scan.record },
        },
        Err(ApiError::Attendance(AttendanceError::StudentNotFound(code))) => {
            ScannerEvent::StudentNotFound { code }
        }
        Err(e) => ScannerEvent::Error {
            message: e.to_string(),
        },
    }
}

async fn send(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ScannerEvent,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Claims> {
    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(ScannerCommand::Identify { token }) =
                    serde_json::from_str::<ScannerCommand>(&text)
                {
                    return decode_token(jwt_secret, &token).ok();
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify)
        .await
        .ok()
        .flatten()
}

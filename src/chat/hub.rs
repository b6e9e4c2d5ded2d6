use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::chat::events::ServerEvent;
use crate::models::messages::Message;

pub const RECENT_CLIENT_IDS: usize = 256;

/// Outcome of claiming a `(sender, client_id)` pair before storing a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// First time this id is seen; the caller stores and delivers the message.
    New,
    /// Another frame with this id is still being stored.
    InFlight,
    /// Already stored; re-ack with the original message.
    Delivered(Message),
}

#[derive(Debug, Clone)]
enum ClaimState {
    InFlight,
    Delivered(Message),
}

#[derive(Debug, Default)]
struct RecentIds {
    order: VecDeque<String>,
    entries: HashMap<String, ClaimState>,
}

impl RecentIds {
    fn insert(&mut self, client_id: &str, state: ClaimState) {
        if self.entries.insert(client_id.to_string(), state).is_none() {
            self.order.push_back(client_id.to_string());
        }
        while self.order.len() > RECENT_CLIENT_IDS {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, client_id: &str) {
        if self.entries.remove(client_id).is_some() {
            self.order.retain(|id| id != client_id);
        }
    }
}

#[derive(Debug, Default)]
struct HubState {
    sessions: HashMap<i32, HashMap<Uuid, UnboundedSender<ServerEvent>>>,
    recent: HashMap<i32, RecentIds>,
    /// Generation of the latest `typing_start` per (sender, receiver).
    typing: HashMap<(i32, i32), u64>,
    next_generation: u64,
}

impl HubState {
    fn deliver(&mut self, user_id: i32, event: &ServerEvent) -> usize {
        let Some(sessions) = self.sessions.get_mut(&user_id) else {
            return 0;
        };
        // closed receivers belong to sessions that are shutting down
        sessions.retain(|_, tx| tx.send(event.clone()).is_ok());
        sessions.len()
    }

    fn broadcast_except(&mut self, user_id: i32, event: &ServerEvent) {
        let others: Vec<i32> = self
            .sessions
            .keys()
            .copied()
            .filter(|id| *id != user_id)
            .collect();
        for other in others {
            self.deliver(other, event);
        }
    }
}

/// In-memory registry of socket sessions shared by every worker.
pub struct ChatHub {
    state: Mutex<HubState>,
    typing_timeout: Duration,
    presence_writes: tokio::sync::Mutex<()>,
}

/// A registered socket session.
pub struct Connection {
    pub session_id: Uuid,
    pub receiver: UnboundedReceiver<ServerEvent>,
    /// True when this is the user's only open session.
    pub first_session: bool,
}

impl ChatHub {
    pub fn new(typing_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            typing_timeout,
            presence_writes: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a session. The user's first session announces them online to everyone else.
    pub fn connect(&self, user_id: i32) -> Connection {
        let (tx, receiver) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4();

        let mut state = self.lock();
        let sessions = state.sessions.entry(user_id).or_default();
        sessions.insert(session_id, tx);
        let first_session = sessions.len() == 1;

        if first_session {
            state.broadcast_except(
                user_id,
                &ServerEvent::UserStatusChange {
                    user_id,
                    is_online: true,
                },
            );
        }

        Connection {
            session_id,
            receiver,
            first_session,
        }
    }

    /// Drops a session and returns true when it was the user's last one.
    pub fn disconnect(&self, user_id: i32, session_id: Uuid) -> bool {
        let mut state = self.lock();

        let last_session = match state.sessions.get_mut(&user_id) {
            Some(sessions) => {
                sessions.remove(&session_id);
                sessions.is_empty()
            }
            None => return false,
        };

        if last_session {
            state.sessions.remove(&user_id);
            state.typing.retain(|(sender, _), _| *sender != user_id);
            state.broadcast_except(
                user_id,
                &ServerEvent::UserStatusChange {
                    user_id,
                    is_online: false,
                },
            );
        }
        last_session
    }

    pub fn is_online(&self, user_id: i32) -> bool {
        self.lock()
            .sessions
            .get(&user_id)
            .map(|sessions| !sessions.is_empty())
            .unwrap_or(false)
    }

    /// Runs `write` with the user's current presence, one write at a time.
    /// Each write reads the hub after every earlier one finished, so the stored
    /// flag ends up matching the latest connect or disconnect.
    pub async fn persist_presence<F, Fut, E>(&self, user_id: i32, write: F) -> Result<bool, E>
    where
        F: FnOnce(bool) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let _guard = self.presence_writes.lock().await;
        let is_online = self.is_online(user_id);
        write(is_online).await?;
        Ok(is_online)
    }

    pub fn online_user_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Sends to every session of `user_id`; returns how many sessions received it.
    pub fn send_to_user(&self, user_id: i32, event: ServerEvent) -> usize {
        self.lock().deliver(user_id, &event)
    }

    pub fn send_to_session(&self, user_id: i32, session_id: Uuid, event: ServerEvent) -> bool {
        let state = self.lock();
        state
            .sessions
            .get(&user_id)
            .and_then(|sessions| sessions.get(&session_id))
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false)
    }

    pub fn broadcast_status(&self, user_id: i32, is_online: bool) {
        self.lock()
            .broadcast_except(user_id, &ServerEvent::UserStatusChange { user_id, is_online });
    }

    pub fn claim_client_id(&self, sender_id: i32, client_id: &str) -> Claim {
        let mut state = self.lock();
        let recent = state.recent.entry(sender_id).or_default();
        match recent.entries.get(client_id) {
            Some(ClaimState::InFlight) => Claim::InFlight,
            Some(ClaimState::Delivered(message)) => Claim::Delivered(message.clone()),
            None => {
                recent.insert(client_id, ClaimState::InFlight);
                Claim::New
            }
        }
    }

    pub fn complete_client_id(&self, sender_id: i32, client_id: &str, message: &Message) {
        self.lock()
            .recent
            .entry(sender_id)
            .or_default()
            .insert(client_id, ClaimState::Delivered(message.clone()));
    }

    /// Forgets a claim whose message could not be stored, so a retry goes through.
    pub fn release_client_id(&self, sender_id: i32, client_id: &str) {
        if let Some(recent) = self.lock().recent.get_mut(&sender_id) {
            recent.remove(client_id);
        }
    }

    /// Relays `typing_start` and schedules the automatic `typing_stop`.
    pub fn typing_started(self: &Arc<Self>, sender_id: i32, receiver_id: i32) {
        let generation = {
            let mut state = self.lock();
            state.next_generation += 1;
            let generation = state.next_generation;
            state.typing.insert((sender_id, receiver_id), generation);
            state.deliver(receiver_id, &ServerEvent::TypingStart { sender_id });
            generation
        };

        let hub = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(hub.typing_timeout).await;
            hub.expire_typing(sender_id, receiver_id, generation);
        });
    }

    pub fn typing_stopped(&self, sender_id: i32, receiver_id: i32) {
        let mut state = self.lock();
        state.typing.remove(&(sender_id, receiver_id));
        state.deliver(receiver_id, &ServerEvent::TypingStop { sender_id });
    }

    fn expire_typing(&self, sender_id: i32, receiver_id: i32, generation: u64) {
        let mut state = self.lock();
        if state.typing.get(&(sender_id, receiver_id)) == Some(&generation) {
            state.typing.remove(&(sender_id, receiver_id));
            state.deliver(receiver_id, &ServerEvent::TypingStop { sender_id });
        }
    }
}

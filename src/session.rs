use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::llm_provider::ChatBackend;
use crate::services::pdf::Snippet;
use crate::services::persona::Persona;
use crate::services::prompt::{self, ChatRequest, GREETING};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// One browser session's conversation. The message log only ever grows.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: String,
    messages: Vec<Message>,
    persona: Persona,
    documents: Vec<Snippet>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: vec![Message::assistant(GREETING)],
            persona: Persona::default(),
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn set_persona(&mut self, persona: Persona) {
        self.persona = persona;
        self.updated_at = Utc::now();
    }

    pub fn documents(&self) -> &[Snippet] {
        &self.documents
    }

    /// Swap in the snippets of a newly uploaded document. Earlier uploads
    /// are dropped so titles stay unique.
    pub fn replace_documents(&mut self, snippets: Vec<Snippet>) {
        self.documents = snippets;
        self.updated_at = Utc::now();
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Run one turn against `backend`.
    ///
    /// Without a usable credential nothing is sent and the log is untouched.
    /// On success the decorated user message and the reply are appended, in
    /// that order. A remote failure leaves the log as it was.
    pub async fn submit<B: ChatBackend + ?Sized>(
        &mut self,
        backend: &B,
        user_text: &str,
        persona: Persona,
        credential: Option<&str>,
        ground_on_documents: bool,
    ) -> Result<String, AppError> {
        let credential = usable_credential(credential)?;
        let request = self.prepare_turn(user_text, persona, ground_on_documents);
        let reply = call_backend(backend, &self.id, credential, &request).await?;
        self.commit_turn(request, reply.clone());
        Ok(reply)
    }

    /// Store the persona for this turn and build the request from the
    /// current history.
    fn prepare_turn(
        &mut self,
        user_text: &str,
        persona: Persona,
        ground_on_documents: bool,
    ) -> ChatRequest {
        self.set_persona(persona);
        let documents: &[Snippet] = if ground_on_documents {
            &self.documents
        } else {
            &[]
        };
        prompt::build_request(&self.messages, user_text, persona, documents)
    }

    fn commit_turn(&mut self, request: ChatRequest, reply: String) {
        self.messages.push(Message::user(request.message));
        self.messages.push(Message::assistant(reply));
        self.updated_at = Utc::now();
    }
}

fn usable_credential(credential: Option<&str>) -> Result<&str, AppError> {
    credential
        .filter(|c| !c.trim().is_empty())
        .ok_or(AppError::MissingCredential)
}

async fn call_backend<B: ChatBackend + ?Sized>(
    backend: &B,
    session_id: &str,
    credential: &str,
    request: &ChatRequest,
) -> Result<String, AppError> {
    backend
        .chat(credential, request)
        .await
        .map(|reply| reply.text)
        .map_err(|e| {
            tracing::warn!("Chat request for session {session_id} failed: {e}");
            AppError::from(e)
        })
}

/// A live session as held by the store.
///
/// Session data sits behind a lock that is only ever held for short,
/// non-awaiting sections, so transcript reads, persona changes and uploads
/// never wait on the remote call. A separate turn lock makes submissions
/// single-flight.
pub struct SessionHandle {
    id: String,
    data: Mutex<ChatSession>,
    turn: Mutex<()>,
}

impl SessionHandle {
    fn new(session: ChatSession) -> Self {
        Self {
            id: session.id().to_string(),
            data: Mutex::new(session),
            turn: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn snapshot(&self) -> ChatSession {
        self.data.lock().await.clone()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&ChatSession) -> R) -> R {
        f(&*self.data.lock().await)
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        f(&mut *self.data.lock().await)
    }

    /// True while a turn is in flight.
    pub fn is_busy(&self) -> bool {
        self.turn.try_lock().is_err()
    }

    /// Same contract as [`ChatSession::submit`], plus `SessionBusy` when a
    /// turn is already in flight. The data lock is released while the
    /// backend call is awaited.
    pub async fn submit<B: ChatBackend + ?Sized>(
        &self,
        backend: &B,
        user_text: &str,
        persona: Persona,
        credential: Option<&str>,
        ground_on_documents: bool,
    ) -> Result<String, AppError> {
        let _turn = self.turn.try_lock().map_err(|_| AppError::SessionBusy)?;
        let credential = usable_credential(credential)?;

        let request = self
            .update(|s| s.prepare_turn(user_text, persona, ground_on_documents))
            .await;

        let reply = call_backend(backend, &self.id, credential, &request).await?;

        self.update(|s| s.commit_turn(request, reply.clone())).await;
        Ok(reply)
    }

    /// Idle sessions have no turn in flight and no activity within `ttl`.
    fn is_idle(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        if self.is_busy() {
            return false;
        }
        match self.data.try_lock() {
            Ok(session) => now - session.updated_at() > ttl,
            Err(_) => false,
        }
    }
}

/// Live sessions keyed by session id. Each session has its own locks so a
/// turn in one session never waits on another.
///
/// Sessions with no activity for `idle_ttl` are evicted on `create` and by
/// the background sweeper. A zero TTL keeps sessions until they are removed.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<SessionHandle>>>>,
    idle_ttl: Option<TimeDelta>,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        let idle_ttl =
            (!idle_ttl.is_zero()).then(|| TimeDelta::from_std(idle_ttl).unwrap_or(TimeDelta::MAX));
        Self {
            sessions: Arc::default(),
            idle_ttl,
        }
    }

    pub async fn create(&self) -> ChatSession {
        self.prune_idle().await;

        let session = ChatSession::new(Uuid::new_v4().to_string());
        self.sessions.write().await.insert(
            session.id().to_string(),
            Arc::new(SessionHandle::new(session.clone())),
        );
        tracing::info!("Created chat session {}", session.id());
        session
    }

    pub async fn get(&self, id: &str) -> Result<Arc<SessionHandle>, AppError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    pub async fn remove(&self, id: &str) -> Result<(), AppError> {
        if self.sessions.write().await.remove(id).is_none() {
            return Err(AppError::NotFound("Session not found".to_string()));
        }

        tracing::info!("Ended chat session {id}");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn prune_idle(&self) -> usize {
        self.prune_idle_at(Utc::now()).await
    }

    /// Evict every session idle at `now`. Returns how many were removed.
    pub async fn prune_idle_at(&self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| !handle.is_idle(now, ttl));
        let evicted = before - sessions.len();

        if evicted > 0 {
            tracing::info!("Evicted {evicted} idle chat sessions");
        }
        evicted
    }

    /// Prune idle sessions every `every` until the runtime shuts down.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                tracing::debug!("Sweeping idle chat sessions");
                store.prune_idle().await;
            }
        })
    }
}

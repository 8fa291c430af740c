//! Session-backed client.
//!
//! Keeps the linked account, contacts, chats and message log in a
//! [`SessionStore`] and drives the QR pairing flow until a phone is linked.
//! The store is shared with the command line, so every change is applied on
//! top of a fresh read and a ready session keeps following the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock as StdRwLock};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::{Mutex as AsyncMutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};

use crate::client::{ClientError, EventHandler, Messenger};
use crate::config::RelayConfig;
use crate::protocol::qr::QRPairing;
use crate::state::SessionState;
use crate::store::SessionStore;
use crate::types::{Chat, ClientInfo, Contact, DisconnectReason, Event, Message, JID};

/// Client whose session lives in a [`SessionStore`].
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: RelayConfig,
    store: Arc<dyn SessionStore>,
    state: RwLock<SessionState>,
    /// Held for every load-change-save cycle against the store.
    persist: AsyncMutex<()>,
    handlers: StdRwLock<Vec<EventHandler>>,
    initialized: AtomicBool,
    ready: AtomicBool,
    linked: Notify,
    background: Mutex<Option<JoinHandle<()>>>,
}

impl SessionClient {
    /// Instantiate a client with custom configuration and store.
    pub fn new(config: RelayConfig, store: Arc<dyn SessionStore>) -> Self {
        let state = SessionState::with_device_name(config.device_name.clone());
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                state: RwLock::new(state),
                persist: AsyncMutex::new(()),
                handlers: StdRwLock::new(Vec::new()),
                initialized: AtomicBool::new(false),
                ready: AtomicBool::new(false),
                linked: Notify::new(),
                background: Mutex::new(None),
            }),
        }
    }

    /// Whether the session is connected and usable.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Complete pairing for the given account from within this process.
    pub async fn link_device(
        &self,
        jid: JID,
        push_name: Option<String>,
    ) -> Result<(), ClientError> {
        {
            let _persist = self.inner.persist.lock().await;
            let mut stored = self.load_stored().await?;
            stored.register(jid.clone(), push_name);
            let stored = self.save_stored(stored).await?;
            *self.inner.state.write().await = stored;
        }
        info!("device linked as {}", jid.serialized());
        self.inner.linked.notify_one();
        Ok(())
    }

    /// Record a message from someone else and hand it to the event handlers.
    pub async fn receive_message(
        &self,
        from: JID,
        body: impl Into<String>,
        push_name: Option<&str>,
    ) -> Result<Message, ClientError> {
        self.ensure_ready()?;

        let retention = self.inner.config.message_retention;
        let message = self
            .update(|state| {
                state.upsert_contact(&from, push_name);
                let message = state.record_incoming_message(from, body, Utc::now().timestamp());
                state.retain_latest(message.chat_id(), retention);
                message
            })
            .await?;

        self.emit(Event::Message(message.clone()));
        Ok(message)
    }

    fn ensure_ready(&self) -> Result<(), ClientError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ClientError::NotReady)
        }
    }

    fn emit(&self, event: Event) {
        debug!("emitting {} event", event.name());
        match self.inner.handlers.read() {
            Ok(handlers) => {
                for handler in handlers.iter() {
                    handler(event.clone());
                }
            }
            Err(_) => warn!("event handlers poisoned; dropping {} event", event.name()),
        }
    }

    async fn mark_ready(&self) {
        self.emit(Event::Authenticated);
        self.inner.ready.store(true, Ordering::SeqCst);
        match self.info().await {
            Some(info) => self.emit(Event::Ready(info)),
            None => warn!("session ready without a linked account"),
        }
    }

    /// Forget the in-memory session and report the disconnect.
    async fn end_session(&self, reason: DisconnectReason) {
        *self.inner.state.write().await =
            SessionState::with_device_name(self.inner.config.device_name.clone());
        self.inner.ready.store(false, Ordering::SeqCst);
        self.inner.initialized.store(false, Ordering::SeqCst);
        info!("session ended: {reason}");
        self.emit(Event::Disconnected(reason));
    }

    fn set_background_task(&self, handle: Option<JoinHandle<()>>) {
        if let Ok(mut slot) = self.inner.background.lock() {
            if let Some(previous) = std::mem::replace(&mut *slot, handle) {
                previous.abort();
            }
        }
    }

    async fn load_stored(&self) -> Result<SessionState, ClientError> {
        let store = self.inner.store.clone();
        Ok(tokio::task::spawn_blocking(move || store.load()).await??)
    }

    async fn save_stored(&self, state: SessionState) -> Result<SessionState, ClientError> {
        let store = self.inner.store.clone();
        Ok(tokio::task::spawn_blocking(move || store.save(&state).map(|()| state)).await??)
    }

    async fn clear_stored(&self) -> Result<(), ClientError> {
        let store = self.inner.store.clone();
        Ok(tokio::task::spawn_blocking(move || store.clear()).await??)
    }

    /// Apply a change on top of the stored session, save it and adopt it.
    ///
    /// Ends the session when another process unlinked it.
    async fn update<T>(
        &self,
        apply: impl FnOnce(&mut SessionState) -> T,
    ) -> Result<T, ClientError> {
        let _persist = self.inner.persist.lock().await;
        let mut stored = self.load_stored().await?;
        if !stored.is_registered() {
            if self.is_ready() {
                info!("session was removed from the store");
                self.set_background_task(None);
                self.end_session(DisconnectReason::Logout).await;
            }
            return Err(ClientError::NotReady);
        }

        let result = apply(&mut stored);
        let stored = self.save_stored(stored).await?;
        *self.inner.state.write().await = stored;
        Ok(result)
    }

    async fn run_pairing(self) {
        let keys = {
            let mut state = self.inner.state.write().await;
            state.ensure_keys().clone()
        };
        let mut pairing = QRPairing::new(keys);
        let max_retries = self.inner.config.qr_max_retries;

        loop {
            let qr = pairing.next_code();
            let deadline = Instant::now() + qr.timeout;
            self.emit(Event::QRCode(qr));

            if self.wait_for_link(deadline).await {
                self.mark_ready().await;
                self.watch_store().await;
                return;
            }

            if max_retries > 0 && pairing.issued() >= max_retries {
                warn!("no device linked after {} QR codes", pairing.issued());
                self.inner.initialized.store(false, Ordering::SeqCst);
                self.emit(Event::Disconnected(DisconnectReason::MaxQrRetries));
                return;
            }
        }
    }

    /// Wait until a device is linked or the deadline passes.
    ///
    /// Links made by another process are picked up by re-reading the store.
    async fn wait_for_link(&self, deadline: Instant) -> bool {
        let poll = self.inner.config.link_poll_interval();
        loop {
            let wake = deadline.min(Instant::now() + poll);
            tokio::select! {
                _ = self.inner.linked.notified() => {
                    if self.inner.state.read().await.is_registered() {
                        return true;
                    }
                }
                _ = sleep_until(wake) => {
                    match self.load_stored().await {
                        Ok(stored) if stored.is_registered() => {
                            info!("device linked by another process");
                            *self.inner.state.write().await = stored;
                            return true;
                        }
                        Ok(_) => {}
                        Err(err) => debug!("session store not readable yet: {err}"),
                    }
                    if Instant::now() >= deadline {
                        return false;
                    }
                }
            }
        }
    }

    /// Follow the store while ready: adopt changes made elsewhere and end the
    /// session once it is removed.
    async fn watch_store(&self) {
        let poll = self.inner.config.link_poll_interval();
        loop {
            sleep(poll).await;
            if !self.is_ready() {
                return;
            }

            let _persist = self.inner.persist.lock().await;
            match self.load_stored().await {
                Ok(stored) if !stored.is_registered() => {
                    if self.is_ready() {
                        info!("session was removed from the store");
                        self.end_session(DisconnectReason::Logout).await;
                    }
                    return;
                }
                Ok(stored) => {
                    let mut state = self.inner.state.write().await;
                    if *state != stored {
                        debug!("session store changed; reloading");
                        *state = stored;
                    }
                }
                Err(err) => warn!("session store not readable: {err}"),
            }
        }
    }

    fn parse_chat_id(chat_id: &str) -> Result<JID, ClientError> {
        chat_id
            .parse::<JID>()
            .ok()
            .filter(|jid| !jid.user.is_empty() && !jid.is_empty())
            .ok_or_else(|| ClientError::InvalidChatId(chat_id.to_string()))
    }
}

#[async_trait]
impl Messenger for SessionClient {
    fn add_event_handler(&self, handler: EventHandler) {
        match self.inner.handlers.write() {
            Ok(mut handlers) => handlers.push(handler),
            Err(_) => warn!("event handlers poisoned; handler not registered"),
        }
    }

    async fn initialize(&self) -> Result<(), ClientError> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyInitialized);
        }

        let registered = {
            let _persist = self.inner.persist.lock().await;
            let mut stored = match self.load_stored().await {
                Ok(stored) => stored,
                Err(err) => {
                    warn!("stored session rejected: {err}");
                    self.emit(Event::AuthFailure(err.to_string()));
                    self.clear_stored().await?;
                    SessionState::default()
                }
            };
            if stored.device_name.is_empty() {
                stored.device_name = self.inner.config.device_name.clone();
            }
            stored.ensure_keys();
            let stored = self.save_stored(stored).await?;

            let registered = stored.is_registered();
            *self.inner.state.write().await = stored;
            registered
        };

        if registered {
            info!("resuming stored session");
            self.mark_ready().await;
            let client = self.clone();
            let handle = tokio::spawn(async move { client.watch_store().await });
            self.set_background_task(Some(handle));
        } else {
            info!("no stored session; starting QR pairing");
            let handle = tokio::spawn(self.clone().run_pairing());
            self.set_background_task(Some(handle));
        }
        Ok(())
    }

    async fn info(&self) -> Option<ClientInfo> {
        if !self.is_ready() {
            return None;
        }
        let state = self.inner.state.read().await;
        let wid = state.registered_jid.clone()?;
        Some(ClientInfo {
            pushname: state.push_name.clone().unwrap_or_else(|| wid.user.clone()),
            platform: state.platform.clone().unwrap_or_else(|| "unknown".into()),
            wid,
        })
    }

    async fn get_contacts(&self) -> Result<Vec<Contact>, ClientError> {
        self.ensure_ready()?;
        let state = self.inner.state.read().await;
        Ok(state.contacts.values().cloned().collect())
    }

    async fn get_chats(&self) -> Result<Vec<Chat>, ClientError> {
        self.ensure_ready()?;
        Ok(self.inner.state.read().await.chats_by_recent())
    }

    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Chat, ClientError> {
        self.ensure_ready()?;
        let jid = Self::parse_chat_id(chat_id)?;
        self.inner
            .state
            .read()
            .await
            .chats
            .get(&jid.serialized())
            .cloned()
            .ok_or_else(|| ClientError::ChatNotFound(chat_id.to_string()))
    }

    async fn get_contact_by_id(&self, contact_id: &str) -> Result<Contact, ClientError> {
        self.ensure_ready()?;
        let jid = Self::parse_chat_id(contact_id)?;
        let state = self.inner.state.read().await;
        Ok(state
            .contacts
            .get(&jid.serialized())
            .cloned()
            .unwrap_or_else(|| Contact::new(jid.to_non_ad())))
    }

    async fn fetch_messages(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, ClientError> {
        let chat = self.get_chat_by_id(chat_id).await?;
        Ok(self.inner.state.read().await.messages_in(&chat.id, limit))
    }

    async fn send_message(&self, chat_id: &str, content: &str) -> Result<Message, ClientError> {
        self.ensure_ready()?;
        if content.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let to = Self::parse_chat_id(chat_id)?;

        let retention = self.inner.config.message_retention;
        let message = self
            .update(|state| {
                state.upsert_contact(&to, None);
                let message = state.record_message(to.clone(), content, Utc::now().timestamp());
                state.retain_latest(&to, retention);
                message
            })
            .await?;
        debug!("sent {} to {}", message.id, message.to);
        Ok(message)
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.set_background_task(None);
        let _persist = self.inner.persist.lock().await;
        self.clear_stored().await?;
        self.end_session(DisconnectReason::Logout).await;
        Ok(())
    }
}

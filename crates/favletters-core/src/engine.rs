//! Membership & convergence engine.
//!
//! One [`Engine`] per tab. It owns the tab's identity, priority, peer table
//! and shared text, and is driven entirely from outside:
//!
//! 1. Call [`on_message()`](Engine::on_message) for every inbound message
//! 2. Call [`heartbeat_tick()`](Engine::heartbeat_tick) and
//!    [`eviction_tick()`](Engine::eviction_tick) periodically
//! 3. Forward user actions to [`set_local_text()`](Engine::set_local_text)
//!    and [`promote()`](Engine::promote)
//!
//! Every handler runs to completion against exclusively owned state, so the
//! engine needs no locks. Whenever something presentation-visible changes
//! the [`revision()`](Engine::revision) counter moves.

use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, Millis};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::identity::{LocalIdentity, PeerId, Priority};
use crate::message::Message;
use crate::peers::{PeerRecord, PeerTable};
use crate::text::{SharedText, TextStore};
use crate::transport::Transport;
use crate::view::View;

/// Lowest priority accepted from a peer. One below it stays free, so a
/// promotion can always get strictly ahead of every remote tab.
const MIN_REMOTE_PRIORITY: Priority = Priority::MIN + 1;

/// One tab's membership and convergence state.
pub struct Engine<T, S, C> {
    config: EngineConfig,
    identity: LocalIdentity,
    priority: Priority,
    peers: PeerTable,
    text: SharedText,
    transport: T,
    store: S,
    clock: C,
    revision: u64,
}

impl<T, S, C> std::fmt::Debug for Engine<T, S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("id", self.identity.id())
            .field("priority", &self.priority)
            .field("peers", &self.peers.len())
            .field("text", &self.text.as_str())
            .field("revision", &self.revision)
            .finish()
    }
}

impl<T, S, C> Engine<T, S, C>
where
    T: Transport,
    S: TextStore,
    C: Clock,
{
    /// Start a tab with a freshly generated identity.
    ///
    /// Loads the text (falling back to the default if storage is empty or
    /// broken), registers self, then announces itself with a heartbeat and a
    /// `request_state`. Subscribe to the transport *before* calling this so
    /// the replies are not missed.
    ///
    /// Transport failures are fatal and returned.
    pub fn start(config: EngineConfig, transport: T, store: S, clock: C) -> Result<Self> {
        let identity = LocalIdentity::generate(clock.now());
        Self::start_with_identity(identity, config, transport, store, clock)
    }

    /// Start a tab with a known identity.
    pub fn start_with_identity(
        identity: LocalIdentity,
        config: EngineConfig,
        transport: T,
        store: S,
        clock: C,
    ) -> Result<Self> {
        let text = match store.get(&config.storage_key) {
            Ok(Some(stored)) if !stored.is_empty() => stored,
            Ok(_) => config.default_text.clone(),
            Err(e) => {
                warn!(error = %e, "storage unavailable, using default text");
                config.default_text.clone()
            }
        };

        let mut engine = Self {
            config,
            identity,
            priority: 0,
            peers: PeerTable::new(),
            text: SharedText::new(text),
            transport,
            store,
            clock,
            revision: 0,
        };
        engine.refresh_self(engine.clock.now());

        engine.heartbeat_tick()?;
        engine
            .transport
            .publish(&Message::request_state(engine.identity.id().clone()))?;

        info!(
            id = %engine.identity.id(),
            created_at = engine.identity.created_at(),
            text = engine.text.as_str(),
            "tab started"
        );
        Ok(engine)
    }

    // --- User actions ---

    /// Apply a local edit: always wins locally, persisted and broadcast.
    pub fn set_local_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.text.set(text);
        self.persist();
        self.mark_changed();

        let update = Message::text_update(
            self.text.as_str(),
            self.identity.id().clone(),
            self.clock.now(),
        );
        self.transport.publish(&update)
    }

    /// Move this tab strictly ahead of every peer it currently knows.
    ///
    /// The new priority is `min(0, lowest known) - 1`, so it is below 0 and
    /// below every observed priority. At `Priority::MIN` the priority stays
    /// put; remote priorities are clamped above it, so self still leads.
    /// A heartbeat goes out immediately. Returns the new priority.
    pub fn promote(&mut self) -> Result<Priority> {
        match self.peers.min_priority().checked_sub(1) {
            Some(priority) => self.priority = priority,
            None => warn!(priority = self.priority, "priority floor reached"),
        }
        self.refresh_self(self.clock.now());
        self.mark_changed();

        info!(priority = self.priority, "promoted");
        self.heartbeat_tick()?;
        Ok(self.priority)
    }

    // --- Inbound messages ---

    /// Dispatch one inbound message. Never fails: anything unusable is dropped.
    pub fn on_message(&mut self, message: Message) {
        match message {
            Message::Heartbeat {
                id,
                created_at,
                priority,
            } => self.on_heartbeat(id, created_at, priority.unwrap_or(0)),
            Message::TextUpdate {
                text, sender_id, ..
            } => self.on_text_update(text, &sender_id),
            Message::RequestState { sender_id } => self.on_request_state(&sender_id),
            Message::Unknown => trace!("ignoring unknown message kind"),
        }
    }

    fn on_heartbeat(&mut self, id: PeerId, created_at: Millis, priority: Priority) {
        if &id == self.identity.id() {
            // Our own record is maintained locally.
            trace!("ignoring heartbeat carrying our own id");
            return;
        }

        let priority = priority.max(MIN_REMOTE_PRIORITY);
        let record = PeerRecord::new(created_at, self.clock.now(), priority);
        let is_new = !self.peers.contains(&id);
        if self.peers.upsert(id.clone(), record) {
            if is_new {
                debug!(peer = %id, priority, "peer joined");
            }
            self.mark_changed();
        }
    }

    fn on_text_update(&mut self, text: String, sender: &PeerId) {
        if self.text.merge_remote(&text) {
            debug!(from = %sender, text = self.text.as_str(), "adopted remote text");
            self.persist();
            self.mark_changed();
        }
    }

    fn on_request_state(&mut self, sender: &PeerId) {
        debug!(from = %sender, "answering state request");
        let update = Message::text_update(
            self.text.as_str(),
            self.identity.id().clone(),
            self.clock.now(),
        );
        if let Err(e) = self.transport.publish(&update) {
            warn!(error = %e, "failed to answer state request");
        }
    }

    // --- Periodic maintenance ---

    /// Announce liveness and ranking inputs. Sent every tick, changed or not.
    pub fn heartbeat_tick(&mut self) -> Result<()> {
        let heartbeat = Message::heartbeat(
            self.identity.id().clone(),
            self.identity.created_at(),
            self.priority,
        );
        self.transport.publish(&heartbeat)
    }

    /// Refresh self, then evict every peer silent past the stale threshold.
    /// Returns the evicted ids.
    pub fn eviction_tick(&mut self) -> Vec<PeerId> {
        let now = self.clock.now();
        self.refresh_self(now);

        let evicted = self.peers.evict_stale(
            self.identity.id(),
            now,
            self.config.stale_threshold_millis(),
        );
        if !evicted.is_empty() {
            for id in &evicted {
                debug!(peer = %id, "evicted stale peer");
            }
            self.mark_changed();
        }
        evicted
    }

    // --- Derived queries ---

    /// All live tabs in rank order.
    pub fn ranking(&self) -> Vec<PeerId> {
        self.peers.ranking()
    }

    /// This tab's position in [`ranking()`](Self::ranking).
    pub fn local_index(&self) -> Option<usize> {
        self.peers.position(self.identity.id())
    }

    /// Presentation snapshot.
    pub fn view(&self) -> View {
        View::build(&self.text, &self.ranking(), self.identity.id())
    }

    // --- Accessors ---

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// Number of live tabs, this one included.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Bumped whenever presentation-visible state changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // --- Internals ---

    fn refresh_self(&mut self, now: Millis) {
        let record = PeerRecord::new(self.identity.created_at(), now, self.priority);
        self.peers.upsert(self.identity.id().clone(), record);
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.set(&self.config.storage_key, self.text.as_str()) {
            warn!(error = %e, "failed to persist text");
        }
    }

    fn mark_changed(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

//! Tab runtime - the engine as a single-owner tokio task.
//!
//! Architecture:
//! - One task owns the [`Engine`]; nothing else touches its state
//! - Inbound messages, maintenance ticks and user commands are multiplexed
//!   with `select!`, so every handler runs to completion
//! - Presentation subscribes to a `watch` channel of [`View`] snapshots,
//!   published whenever the engine's revision moves
//!
//! Dropping every [`NodeHandle`] (or calling [`NodeHandle::shutdown`]) stops
//! the task together with its ticks. No goodbye is sent; peers notice the
//! silence and evict.

use std::time::Duration;

use favletters_core::{
    Clock, Engine, Inbox, MemoryStore, Priority, SystemClock, TextStore, Transport, View,
};
use favletters_transfer::UdpBus;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::storage::FileStore;

/// User actions forwarded into the engine task.
#[derive(Debug)]
enum Command {
    SetText(String),
    Promote(oneshot::Sender<Priority>),
}

/// Handle to a running tab.
#[derive(Debug)]
pub struct NodeHandle {
    commands: mpsc::UnboundedSender<Command>,
    views: watch::Receiver<View>,
    task: JoinHandle<()>,
}

impl NodeHandle {
    /// Replace the shared text with a local edit.
    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        self.commands
            .send(Command::SetText(text.into()))
            .map_err(|_| Error::Stopped)
    }

    /// Move this tab to the front of the ranking. Returns the new priority.
    pub async fn promote(&self) -> Result<Priority> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Promote(tx))
            .map_err(|_| Error::Stopped)?;
        rx.await.map_err(|_| Error::Stopped)
    }

    /// Latest published view.
    pub fn view(&self) -> View {
        self.views.borrow().clone()
    }

    /// A fresh receiver of view updates.
    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.views.clone()
    }

    /// Wait until a view satisfying `predicate` is published, up to `timeout`.
    pub async fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> Option<View>
    where
        F: FnMut(&View) -> bool,
    {
        let mut views = self.views.clone();
        let waited = tokio::time::timeout(timeout, views.wait_for(|view| predicate(view))).await;
        match waited {
            Ok(Ok(view)) => Some(view.clone()),
            _ => None,
        }
    }

    /// Stop the tab and its ticks.
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// Run an already-started engine on its own task.
///
/// `inbox` must come from the same transport the engine publishes on.
pub fn spawn<T, S, C>(engine: Engine<T, S, C>, inbox: T::Inbox) -> NodeHandle
where
    T: Transport + 'static,
    T::Inbox: 'static,
    S: TextStore + 'static,
    C: Clock + 'static,
{
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (views_tx, views_rx) = watch::channel(engine.view());
    let task = tokio::spawn(run_engine(engine, inbox, commands_rx, views_tx));

    NodeHandle {
        commands: commands_tx,
        views: views_rx,
        task,
    }
}

async fn run_engine<T, S, C>(
    mut engine: Engine<T, S, C>,
    mut inbox: T::Inbox,
    mut commands: mpsc::UnboundedReceiver<Command>,
    views: watch::Sender<View>,
) where
    T: Transport,
    S: TextStore,
    C: Clock,
{
    let period = engine.config().tick_interval;
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut published = engine.revision();

    info!(id = %engine.identity().id(), ?period, "engine task running");

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                engine.eviction_tick();
                if let Err(e) = engine.heartbeat_tick() {
                    warn!("Heartbeat failed: {}", e);
                }
            }
            message = inbox.next() => match message {
                Some(message) => {
                    debug!(kind = message.kind(), "inbound");
                    engine.on_message(message);
                }
                None => {
                    warn!("Transport closed, stopping engine task");
                    break;
                }
            },
            command = commands.recv() => match command {
                Some(Command::SetText(text)) => {
                    if let Err(e) = engine.set_local_text(text) {
                        warn!("Failed to broadcast text: {}", e);
                    }
                }
                Some(Command::Promote(reply)) => {
                    if let Err(e) = engine.promote() {
                        warn!("Failed to broadcast promotion: {}", e);
                    }
                    let _ = reply.send(engine.priority());
                }
                None => {
                    info!("All handles dropped, stopping engine task");
                    break;
                }
            },
        }

        if engine.revision() != published {
            published = engine.revision();
            views.send_replace(engine.view());
        }
    }
}

/// Start a tab process: multicast bus, file store, system clock.
///
/// Bus or engine startup failures are fatal. A broken store is not: the tab
/// falls back to memory and keeps going.
pub async fn start(config: NodeConfig) -> Result<NodeHandle> {
    let bus = UdpBus::bind(config.bus.clone())
        .await
        .map_err(|e| Error::Network(e.to_string()))?;
    info!(group = %bus.group(), origin = bus.origin(), "joined tab bus");

    let store: Box<dyn TextStore> = match FileStore::open(&config.data_dir) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("Storage at {:?} unavailable ({}), keeping text in memory", config.data_dir, e);
            Box::new(MemoryStore::new())
        }
    };

    // Subscribe first so answers to our request_state are not missed
    let inbox = bus.subscribe()?;
    let engine = Engine::start(config.engine.clone(), bus, store, SystemClock)?;

    Ok(spawn(engine, inbox))
}

#[cfg(test)]
mod tests {
    use super::*;
    use favletters_core::{EngineConfig, LocalBus, ManualClock};

    fn fast_config() -> EngineConfig {
        EngineConfig::default()
            .with_tick_interval(Duration::from_millis(20))
            .with_stale_threshold(Duration::from_millis(60))
    }

    fn start_tab(bus: &LocalBus, clock: &ManualClock) -> NodeHandle {
        let endpoint = bus.join();
        let inbox = endpoint.subscribe().unwrap();
        let engine = Engine::start(fast_config(), endpoint, MemoryStore::new(), clock.clone()).unwrap();
        spawn(engine, inbox)
    }

    #[tokio::test]
    async fn initial_view_is_published() {
        let bus = LocalBus::new();
        let tab = start_tab(&bus, &ManualClock::new(1_000));

        let view = tab.view();
        assert_eq!(view.text, "FAV");
        assert_eq!(view.local_index, Some(0));
        assert_eq!(view.status_line(), "1 Active Tab");

        tab.shutdown().await;
    }

    #[tokio::test]
    async fn edits_reach_other_tabs() {
        let bus = LocalBus::new();
        let clock = ManualClock::new(1_000);
        let a = start_tab(&bus, &clock);
        let b = start_tab(&bus, &clock);

        a.set_text("ABC").unwrap();

        let seen = b
            .wait_for(Duration::from_secs(5), |view| view.text == "ABC")
            .await;
        assert!(seen.is_some(), "edit never reached the other tab");

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn tabs_discover_each_other_and_promote() {
        let bus = LocalBus::new();
        let clock = ManualClock::new(1_000);
        let a = start_tab(&bus, &clock);
        clock.advance(10);
        let b = start_tab(&bus, &clock);

        let both = a
            .wait_for(Duration::from_secs(5), |view| view.peer_count() == 2)
            .await
            .expect("tabs never discovered each other");
        assert_eq!(both.local_index, Some(0));

        let priority = b.promote().await.unwrap();
        assert_eq!(priority, -1);

        let demoted = a
            .wait_for(Duration::from_secs(5), |view| view.local_index == Some(1))
            .await;
        assert!(demoted.is_some(), "promotion never reached the other tab");

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn commands_fail_after_shutdown() {
        let bus = LocalBus::new();
        let tab = start_tab(&bus, &ManualClock::new(0));
        let commands = tab.commands.clone();

        tab.shutdown().await;

        assert!(commands.send(Command::SetText("x".into())).is_err());
    }
}

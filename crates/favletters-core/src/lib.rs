//! FavLetters Core - Tab Membership and Shared Text Convergence
//!
//! Every open tab runs its own [`Engine`]. Tabs share no memory; they only
//! exchange short [`Message`]s over a best-effort, unordered, at-most-once
//! local broadcast [`Transport`]. There is no coordinator.
//!
//! # Overview
//!
//! ## Membership
//!
//! Each tab floods a heartbeat every tick. Receivers upsert the sender into
//! their [`PeerTable`] and evict anyone silent for longer than the stale
//! threshold. Absence is only ever inferred, never announced.
//!
//! ## Ranking
//!
//! The [`PeerTable`] derives a total order: priority ascending, then creation
//! time ascending. Two tabs holding the same table compute the same ranking,
//! so every tab can work out its own index without asking anyone.
//!
//! ## Shared Text
//!
//! [`SharedText`] is a last-write-wins register keyed on arrival order: an
//! incoming value is adopted iff it differs from the current one. Timestamps
//! travel on the wire but are never consulted.
//!
//! # Example
//!
//! ```rust
//! use favletters_core::{Engine, EngineConfig, LocalBus, ManualClock, MemoryStore, Transport};
//!
//! let bus = LocalBus::new();
//! let clock = ManualClock::new(1_000);
//!
//! let endpoint = bus.join();
//! let mut inbox = endpoint.subscribe().unwrap();
//! let mut engine = Engine::start(EngineConfig::default(), endpoint, MemoryStore::new(), clock.clone()).unwrap();
//!
//! engine.set_local_text("ABC").unwrap();
//! assert_eq!(engine.text(), "ABC");
//! assert_eq!(engine.local_index(), Some(0));
//! # let _ = &mut inbox;
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod message;
pub mod peers;
pub mod text;
pub mod transport;
pub mod view;

pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use identity::{LocalIdentity, PeerId, Priority};
pub use message::Message;
pub use peers::{PeerRecord, PeerTable};
pub use text::{MemoryStore, SharedText, TextStore};
pub use transport::{Inbox, LocalBus, LocalEndpoint, LocalInbox, Transport};
pub use view::{IconRenderer, IconSpec, PeerDot, Rgb, View};

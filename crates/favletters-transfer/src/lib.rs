//! FavLetters Transfer - same-device multicast bus
//!
//! Tabs in one process share a [`favletters_core::LocalBus`]. Tabs running
//! as separate processes on the same machine use the [`UdpBus`] from this
//! crate instead: a UDP multicast group with TTL 0, so nothing leaves the
//! host.
//!
//! # Example
//!
//! ```rust,ignore
//! use favletters_core::Transport;
//! use favletters_transfer::{UdpBus, UdpBusConfig};
//!
//! let bus = UdpBus::bind(UdpBusConfig::default()).await?;
//! let inbox = bus.subscribe()?;
//! ```

pub mod transport;
pub mod types;

pub use transport::{UdpBus, UdpBusConfig, UdpInbox, DEFAULT_GROUP};
pub use types::{decode_datagram, Envelope, MAX_DATAGRAM};

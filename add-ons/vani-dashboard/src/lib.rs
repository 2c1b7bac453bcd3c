//! # Vani Dashboard - Live observer of the event feed
//!
//! Client side of the gateway's event stream: keeps one connection open, resumes from the
//! last sequence number it saw after a drop, and hands the view batches of events.
//!
//! ```text
//!   gateway /api/v1/events/ws ──► WsConnector ──┐
//!   in-process EventBus ────────► BusConnector ─┤
//!                                               ▼
//!                                       ObserverClient ── dedup by seq
//!                                               │
//!                                        EventBuffer ── urgent: now / routine: every 250ms
//!                                               ▼
//!                                         batches (mpsc)
//! ```

pub mod buffer;
pub mod client;
pub mod connectors;
pub mod error;
pub mod policy;
pub mod view;

pub use buffer::EventBuffer;
pub use client::{ConnectionState, Connector, EventSource, ObserverClient, ObserverFeed};
pub use connectors::{BusConnector, WsConnector};
pub use error::ObserverError;
pub use policy::ReconnectPolicy;

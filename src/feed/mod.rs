//! Market feed integration
//!
//! Push channel (STOMP over WebSocket) for live ticks and a REST client for
//! chart pages.

pub mod rest;
pub mod stomp;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use rest::ChartRestClient;
pub use types::*;
pub use websocket::{FeedClient, FeedCommand, FeedHandle, SubscriptionSlot};

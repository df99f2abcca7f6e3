//! WebSocket transport to the pub/sub broker.
//!
//! The broker speaks a small JSON control protocol over text frames; see
//! [`client`] for the frame shapes.

mod client;

pub use client::WebSocketTransport;

//! Frame-level view of one dashboard viewer connection.
//!
//! The viewer session only exchanges text frames, so it is written against
//! [`ViewerSocket`] rather than a concrete WebSocket. The web server adapts
//! axum's socket; tests drive a channel pair.

use core::future::Future;

use thiserror::Error;

/// The viewer went away while a frame was being sent.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("viewer closed")]
pub struct ViewerClosed;

/// A bidirectional text channel to one viewer.
pub trait ViewerSocket: Send {
    /// Send one text frame.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), ViewerClosed>> + Send;

    /// Next text frame from the viewer, or `None` once it has left.
    ///
    /// Non-text frames are skipped. Must be cancel-safe: the session races
    /// it against updates and shutdown.
    fn recv_text(&mut self) -> impl Future<Output = Option<String>> + Send;

    /// Tell the viewer the server is closing the session.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

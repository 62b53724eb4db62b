//! UPnP callback server for receiving event notifications.
//!
//! One HTTP listener is shared by every device the bridge subscribes to.
//! Each device gets its own path below the listener (its callback URL is
//! `http://<local-ip>:<port>/<path>`), so the path alone tells which device
//! a `NOTIFY` came from; the SID header is passed along but not needed for
//! routing.
//!
//! - [`CallbackServer`]: binds the first free port in a range and serves
//!   `NOTIFY` requests until shut down.
//! - [`EventRouter`]: the set of registered paths; forwards accepted
//!   notifications to a channel.
//! - [`NotificationPayload`]: the routed path plus the raw XML body.
//!
//! The server knows nothing about the payload format; decoding happens on
//! the receiving end of the channel.
//!
//! ```no_run
//! use callback_server::{CallbackServer, NotificationPayload};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), callback_server::CallbackError> {
//!     let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
//!     let server = CallbackServer::new((3400, 3500), tx).await?;
//!
//!     server.router().register("kitchen".to_string()).await;
//!     println!("callback: {}", server.callback_url("192.168.1.10".parse().unwrap(), "kitchen"));
//!
//!     while let Some(notification) = rx.recv().await {
//!         println!("{}: {} bytes", notification.path, notification.event_xml.len());
//!     }
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

mod error;
pub mod router;
mod server;

pub use error::CallbackError;
pub use router::{EventRouter, NotificationPayload};
pub use server::CallbackServer;

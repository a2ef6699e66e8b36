//! # Ingestion
//!
//! UDP event ingestion.
//!
//! Responsibilities:
//! - Bind one UDP socket per listener kind and report its lifecycle
//! - Decode `;`-delimited datagrams into typed `Event`s
//! - Hand every decoded event to an `EventDispatch` on its own task
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::ListenerManager;
//! use contracts::ListenerKind;
//!
//! let manager = ListenerManager::new(dispatcher.clone());
//! let handle = manager
//!     .start_listener(ListenerKind::TaskFailure, "0.0.0.0", 9998)
//!     .await?;
//! // ...
//! handle.shutdown().await;
//! ```

mod decoder;
mod error;
mod listener;
mod metrics;

pub use decoder::{decode, decode_at, min_fields, FIELD_DELIMITER};
pub use error::{DecodeError, IngestionError, MalformedReason, Result};
pub use listener::{ListenerHandle, ListenerManager, MAX_DATAGRAM_SIZE};
pub use metrics::{ListenerMetrics, MetricsSnapshot};

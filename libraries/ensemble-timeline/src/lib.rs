//! Ensemble Player - Timeline Indexing
//!
//! Pure mapping from a global timeline position to the track item
//! active at that position, over sequences of items with explicit or
//! implied end boundaries. Stateless; every track manager calls into
//! this crate from its sync and seek paths.
//!
//! # Example
//!
//! ```rust
//! use ensemble_core::types::TimelineItem;
//! use ensemble_timeline::{find_item_at_time, item_relative_secs};
//!
//! let items = vec![
//!     TimelineItem {
//!         id: "intro".to_string(),
//!         src: "intro.mp4".to_string(),
//!         start_ms: 0,
//!         duration_ms: Some(30000),
//!         end_ms: None,
//!     },
//!     TimelineItem {
//!         id: "main".to_string(),
//!         src: "main.mp4".to_string(),
//!         start_ms: 30000,
//!         duration_ms: Some(60000),
//!         end_ms: None,
//!     },
//! ];
//!
//! let active = find_item_at_time(&items, 45000.0).unwrap();
//! assert_eq!(active.id, "main");
//! assert_eq!(item_relative_secs(active, 45000.0), 15.0);
//! ```

#![forbid(unsafe_code)]

mod continuity;
mod index;

pub use continuity::{validate_continuity, ContinuityIssue};
pub use index::{find_item_at_time, item_relative_secs};

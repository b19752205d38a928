//! Reactive, filtered, sortable views over the Entity Store (§4.G).
//!
//! A view is an identity `(view_key, filter)`: [`ViewLayer::get_view`]
//! recomputes it fresh against current store state every call rather
//! than maintaining cached, invalidated projections.

mod filter;
mod key;
mod layer;
mod sort;

pub use key::ViewKey;
pub use layer::ViewLayer;
pub use sort::{apply_overlay, dedup_recurring};

//! # Document Model
//!
//! Plain data that crosses every boundary of the crate: the domain-side
//! `Value`, its wire twin `WireValue`, and the `Document` envelope.
//!
//! Design rule: no I/O, no state, no async in here.

pub mod value;
pub mod wire;
pub mod field_map;
pub mod document;

pub use value::{Value, FromValue};
pub use wire::{WireValue, WireMap, WireDocument, TemporalMarker};
pub use field_map::{FieldMap, ID_FIELD, fields, map_value};
pub use document::{Document, FromDocument, Schema, embed};

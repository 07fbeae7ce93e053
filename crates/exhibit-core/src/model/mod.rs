//! Configuration payloads served by the exhibit configuration server.
//!
//! Field names follow the server's camelCase JSON. Everything the core does
//! not interpret is optional so older servers still deserialize.

pub mod inventory;
pub mod media;
pub mod time_series;

pub use inventory::{InventoryItem, Room, Tenant, TopographicalTable, TopographicalTableTopic};
pub use media::{MediaFile, MediaType, MultimediaPresentation, PresentationItem};
pub use time_series::{GeoEvent, GeoEventGroup, TimeSeries};

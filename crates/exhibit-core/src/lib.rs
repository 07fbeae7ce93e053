//! Client core for exhibit-floor installations: an offline-resilient
//! configuration cache and the scheduler that plays multi-slot
//! presentations from it.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod paths;
pub mod presentation;
pub mod provider;

pub use error::{ExhibitError, Result};

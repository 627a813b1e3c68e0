//! Shared types for the Cadenza composer.
//!
//! Plain data only: the four composition parameters, the option catalogs
//! offered by the UI, and the request/response shapes of the hosted
//! generative-text API.

pub mod api;
pub mod catalog;
pub mod selection;

pub use catalog::{DURATIONS, GENRES, MOODS, TEMPOS};
pub use selection::{Field, SelectionState};

//! Cadenza Studio
//!
//! The desktop composer: an egui window over the [`cadenza_core::Composer`],
//! which runs on a worker thread and loops a clip through cpal while a
//! composition is "playing".

pub mod app;
pub mod audio;
pub mod ui;
pub mod worker;

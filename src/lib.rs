//! runlens: a desktop dashboard for training-run scalars.
//!
//! ```text
//!   data (load files) ──► selector (runs, tag filter) ──► chart (smooth, draw)
//!                              │                              │
//!                           storage                      ui (egui plot)
//! ```

pub mod app;
pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod selector;
pub mod state;
pub mod storage;
pub mod ui;

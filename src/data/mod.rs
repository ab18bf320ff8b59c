//! Data layer: scalar types, loading, and run listing.
//!
//! Architecture:
//! ```text
//!  .parquet / .json / .csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → ScalarDataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────────┐
//!   │ ScalarDataset  │  run → tag → Vec<Datum>
//!   └───────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │   runs    │  RunSource → Vec<Run> for the selector
//!   └──────────┘
//! ```

pub mod loader;
pub mod model;
pub mod runs;

//! Report module - payload conversion, charts, console summaries and exports

pub mod chart;
pub mod export;
pub mod payload;
pub mod summary;

pub use export::*;
pub use summary::*;

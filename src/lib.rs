//! Cognitive multi-agent simulation engine.
//!
//! `model::world::World` runs the tick pipeline over the building blocks in
//! `cogverse_core`; `app` wraps it in a headless, interruptible runner.

pub mod app;
pub mod model;

pub use model::world::World;

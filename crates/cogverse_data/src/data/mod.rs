pub mod agent;
pub mod genome;
pub mod geometry;
pub mod memory;
pub mod world;

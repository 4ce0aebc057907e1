pub use cogverse_core::{init_logging, BrainLogic, MemoryLogic};
pub mod config {
    pub use cogverse_core::config::*;
}
pub mod error {
    pub use cogverse_core::error::*;
}
pub mod lifecycle {
    pub use cogverse_core::lifecycle::*;
}
pub mod snapshot {
    pub use cogverse_core::snapshot::*;
}
pub mod observer {
    pub use cogverse_observer::*;
}

pub mod world;

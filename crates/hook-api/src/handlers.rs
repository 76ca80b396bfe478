//! Request handlers.

pub mod health;
pub mod jobs;
pub mod presets;

pub use health::*;
pub use jobs::*;
pub use presets::*;

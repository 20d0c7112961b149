//! Tool layer exposing song generation to a calling host.

// === Modules ===

pub mod music;
pub mod registry;
pub mod spec;

// === Re-exports ===

pub use registry::ToolRegistry;
pub use spec::ToolContext;

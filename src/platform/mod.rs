// Platform-specific code module

pub mod gpu;

// Re-exports for clean imports
pub use gpu::{AmdSmi, CommandOutput, CommandRunner, SmiQuery, ToolLocator};

//! GPU-specific platform code.
//!
//! Locates the AMD SMI tool and runs it. Parsing of its output lives in
//! `core::system_monitor`.

mod amd;
pub mod locator;
pub mod runner;

pub use amd::{AmdSmi, SmiQuery};
pub use locator::{is_executable, ToolLocator, DEFAULT_SEARCH_PATHS, TOOL_NAMES};
pub use runner::{CommandOutput, CommandRunner, DEFAULT_COMMAND_TIMEOUT, JSON_FLAG};

// Terminal output module

pub mod formatters;

// Re-export commonly used items for cleaner imports
pub use formatters::{
    format_mb, format_summary_line, format_timestamp, print_driver_info, print_search_locations,
    print_snapshot,
};

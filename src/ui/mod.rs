// UI and formatting module

pub mod formatters;
pub mod impact_table;
pub mod screen;

// Re-export commonly used items for cleaner imports
pub use formatters::{format_bytes, format_rate, format_score};
pub use impact_table::print_impact_table;
pub use screen::clear_screen;

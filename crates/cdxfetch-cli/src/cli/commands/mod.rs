//! CLI command handlers. Each command is in its own file.

mod collections;
mod completions;
mod fetch;
mod num_pages;
mod target;

pub use collections::run_collections;
pub use completions::run_completions;
pub use fetch::run_fetch;
pub use num_pages::run_num_pages;

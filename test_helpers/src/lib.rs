//! Test helpers shared across the workspace.
//!
//! - [`env`]: guards that set or remove process environment variables and
//!   restore them on drop.
//! - [`settings_dir`]: a temporary directory for writing settings files.

pub mod env;
pub mod settings_dir;

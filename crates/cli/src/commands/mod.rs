//! CLI subcommand implementations

pub mod delete;
pub mod describe;
pub mod list;
pub mod submit;

//! Tooling layer
//!
//! Command-line front end over the generator, the bundle codec and the HTTP
//! adapter.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};

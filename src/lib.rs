//! binop-host - a minimal plugin host for binary operations
//!
//! Plugins are packaged as zip archives of WebAssembly modules. The host
//! discovers packages in a directory, loads each in its own isolated scope,
//! registers them by the name they declare and runs all of them against the
//! same pair of operands.

pub mod cli;
pub mod config;
pub mod logging;
pub mod plugin;

pub use config::HostConfig;
pub use plugin::{BinaryOperation, DiscoveryReport, Invocation, PluginHost, PluginRegistry};

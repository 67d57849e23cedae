//! Air Network - Application Library
//!
//! The command line shell around `air-network-lib`: settings, logging, the JSON dataset
//! store and the `init` / `import` / `export` / `inspect` commands.

pub mod app;

/// This module contains the [SwapBuilder](builder::SwapBuilder), which encodes
/// pool manager swap calls.
pub mod builder;
/// This module contains the [ChainClient](chain::ChainClient) boundary and its
/// alloy-backed implementation.
pub mod chain;
/// Command line surface: argument parsing, the interactive menu and startup.
pub mod cli;
pub mod config;
/// Solidity bindings.
pub mod contracts;
pub mod errors;
/// This module contains [executor](types::Executor) implementations.
pub mod executors;
pub mod reporter;
/// This module contains the transaction signing and confirmation state machine.
pub mod submitter;
/// This module contains the core type definitions.
pub mod types;

/// The account record and its deterministic byte encoding.
pub mod account;

/// Client identity, peer configuration and the org-matching guard.
pub mod auth;

/// Typed contract invocations, parsed from function names and positional arguments.
pub mod command;

/// Contract entry points: account CRUD and transfers.
/// Every entry point authorizes the caller before it reads or writes state.
pub mod contract;

/// World-state and endorsement-policy interfaces, plus an in-memory platform
/// that tracks read/write sets and validates them at commit.
pub mod state;

/// Transaction processor interface, plus "in memory" implementation.
/// Runs an invocation through simulation and commit on one peer.
pub mod processor;

/// CSV-driven bootstrap around the processor. Kept in the library so the
/// integration tests can use it.
pub mod bin_utils;

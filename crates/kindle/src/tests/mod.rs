//! Behaviour suites for the lifecycle crate.

mod signal_behaviour;
mod support;

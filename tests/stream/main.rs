//! Stream-level tests: write queues, read pausing and server push.

#[path = "../support/mod.rs"]
mod support;

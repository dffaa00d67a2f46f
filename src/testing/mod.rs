//! Test support: mock sessions and session factories.

pub mod mocks;

pub use mocks::{MockSession, MockSessionFactory, MockSessionHandle};

//! Test utilities for partloader integration tests
//!
//! `LoaderFixture` pairs an in-memory catalog with a scratch store rooted in a
//! temporary directory, so every test gets its own cache snapshot.

pub mod test_fixture;

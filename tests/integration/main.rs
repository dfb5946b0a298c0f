//! Integration tests for cgit-rover
//!
//! These tests run the provider against wiremock cgit servers with a real
//! SQLite database in a temporary directory.

mod common;
mod provider_tests;
mod search_tests;

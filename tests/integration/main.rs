//! End-to-end API tests against a running server
//!
//! Run with: cargo test --test integration -- --ignored

mod api_tests;
mod loan_tests;

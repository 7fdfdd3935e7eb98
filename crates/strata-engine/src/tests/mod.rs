//! Engine-level tests: every operation exercised against a fresh engine on
//! a temporary directory with a manual clock.

mod helpers;

mod listing;
mod versioning;

//! Libris application library
//!
//! Feature modules for the library catalog (authors, books, accounts,
//! favorites, recommendations), the zip bulk loader and the bootstrap that
//! wires them onto the kernel and HTTP facade.

pub mod app;
pub mod loader;
pub mod modules;
pub mod state;
pub mod utils;

pub use state::AppState;

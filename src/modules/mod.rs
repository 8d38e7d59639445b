pub mod accounts;
pub mod authors;
pub mod books;
pub mod favorites;
pub mod recommendations;

use libris_kernel::ModuleRegistry;

use crate::AppState;

/// Register every feature module. Order matters: migrations run in
/// registration order and favorites reference both users and books.
pub fn register_all(registry: &mut ModuleRegistry, state: &AppState) {
    registry.register(authors::create_module(state.clone()));
    registry.register(books::create_module(state.clone()));
    registry.register(accounts::create_module(state.clone()));
    registry.register(favorites::create_module(state.clone()));
    registry.register(recommendations::create_module(state.clone()));
}

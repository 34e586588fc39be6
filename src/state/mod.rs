// State management module
// Shared handles to the record store, block store and request limits

pub mod app_state;

pub use app_state::AppState;

#[cfg(test)]
pub(crate) use app_state::create_test_state;

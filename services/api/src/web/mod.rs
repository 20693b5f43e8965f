pub mod middleware;
pub mod preferences;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod scan;
pub mod state;

// Re-export the router builder so the binary and the tests share one assembly.
pub use router::app_router;
pub use state::AppState;

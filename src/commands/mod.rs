pub mod check;
pub mod serve;

// Re-export command functions for convenience
pub use check::check;
pub use serve::{serve, ServeParams};

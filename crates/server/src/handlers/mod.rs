//! HTTP request handlers.

pub mod deploy;
pub mod health;
pub mod revalidate;

pub use deploy::*;
pub use health::*;
pub use revalidate::*;

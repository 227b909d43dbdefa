//! Read-side state over the backend: the signed-in user's profile and the
//! cached directors collection with its mutations.

pub mod directors;
pub mod profile;

pub use directors::*;
pub use profile::*;

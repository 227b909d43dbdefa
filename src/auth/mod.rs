pub mod accounts;
pub mod permissions;
pub mod session;

pub use accounts::*;
pub use permissions::*;
pub use session::*;

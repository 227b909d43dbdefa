mod api;
mod sqlite;
pub mod utils;

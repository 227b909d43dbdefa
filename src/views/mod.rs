//! View models for the four screens. Nothing here talks to the backend.

pub mod admin;
pub mod dashboard;
pub mod landing;
pub mod theme;

// Presentation layer - HTTP surface standing in for the desktop renderer
pub mod app_state;
pub mod handlers;

//! egui shell drawing the controller's views.

pub mod app;

pub use app::BlogApp;

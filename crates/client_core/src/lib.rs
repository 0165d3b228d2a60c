//! View-state layer of the desktop blog: which screen is active, what each
//! user action does to it, and how a screen is composed from store data.

pub mod config;
pub mod controller;
pub mod screen;
pub mod view;

pub use controller::{ActionError, Notice, NoticeSeverity, ViewController};
pub use screen::{Screen, UiAction};
pub use view::{FormView, PostCard, PostForm, PostRow, View};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

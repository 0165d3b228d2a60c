//! Domain types and the error taxonomy shared by the post store, the view
//! controller and the desktop apps.

pub mod domain;
pub mod error;

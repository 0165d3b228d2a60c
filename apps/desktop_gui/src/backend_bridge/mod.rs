//! Blocking bridge between the egui frame loop and the async post store.

pub mod runtime;

pub use runtime::BackendBridge;

// src/model/mod.rs

//! Persistent task record and the graph submission shapes.

pub mod graph;
pub mod task;

pub use graph::{Edge, TaskGraph, TaskTemplate};
pub use task::{Header, Request, ServerResponse, Task};

/// Task identifiers are plain strings; relations between tasks are stored
/// as identifier sets on both sides and resolved through the store.
pub type TaskId = String;

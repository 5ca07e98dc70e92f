// src/controller/mod.rs

//! Per-task state machine.
//!
//! - [`transitions`] is pure: given a task it picks at most one transition
//!   from the guard table and lists the jobs that transition implies.
//! - [`TaskController`] holds the entry points. Each one checks a task out of
//!   the open transaction, applies its own field mutation, runs the table,
//!   writes the task back with CAS and schedules the emitted jobs.

pub mod task_controller;
pub mod transitions;

pub use task_controller::TaskController;
pub use transitions::{advance, next_transition, side_effects, Step};

// src/controller/transitions.rs

use crate::jobs::{DependencySignal, Job};
use crate::model::{Task, TaskId};
use crate::types::{Mode, State, StopFlag, Transition};

/// A fired transition and the jobs it emits, in order.
#[derive(Debug, Clone)]
pub struct Step {
    pub transition: Transition,
    pub jobs: Vec<Job>,
}

/// Evaluate the guard table for the task's current state. The first matching
/// guard wins; `None` means the task stays where it is.
pub fn next_transition(task: &Task) -> Option<Transition> {
    let stopping = task.stop_flag != StopFlag::None;
    let cancelled = task.stop_flag == StopFlag::Cancelled;
    let active = task.mode == Mode::Active;
    let ready = task.unfinished_dependencies <= 0;

    match task.state {
        State::New if stopping => Some(Transition::NewToStopped),
        State::New if active && ready => Some(Transition::NewToEnqueued),
        State::New if active => Some(Transition::NewToWaiting),

        State::Waiting if stopping => Some(Transition::WaitingToStopped),
        State::Waiting if active && ready => Some(Transition::WaitingToEnqueued),

        State::Enqueued if stopping => Some(Transition::EnqueuedToStopped),
        State::Enqueued if task.starting => Some(Transition::EnqueuedToStarting),

        State::Starting if cancelled => Some(Transition::StartingToStopping),
        State::Starting if task.has_response(State::Starting, true) => {
            Some(Transition::StartingToUp)
        }
        State::Starting if task.has_response(State::Starting, false) => {
            Some(Transition::StartingToStartFailed)
        }

        State::Up if cancelled => Some(Transition::UpToStopping),
        State::Up if task.has_response(State::Up, true) => Some(Transition::UpToSuccessful),
        State::Up if task.has_response(State::Up, false) => Some(Transition::UpToFailed),

        State::Stopping if task.has_response(State::Stopping, true) => {
            Some(Transition::StoppingToStopped)
        }
        State::Stopping if task.has_response(State::Stopping, false) => {
            Some(Transition::StoppingToStopFailed)
        }

        _ => None,
    }
}

/// Jobs emitted by `transition`. `task` is the task after the transition.
pub fn side_effects(transition: Transition, task: &Task, clean: bool) -> Vec<Job> {
    let mut jobs = Vec::new();

    let notify_dependents = |jobs: &mut Vec<Job>, signal: DependencySignal| {
        if !task.dependents.is_empty() {
            jobs.push(Job::NotifyDependents {
                signal,
                task: task.name.clone(),
                dependents: task.dependents.iter().cloned().collect::<Vec<TaskId>>(),
            });
        }
    };
    let free_slot = |jobs: &mut Vec<Job>| {
        jobs.push(Job::ReleaseSlot {
            task: task.name.clone(),
        });
        jobs.push(Job::PokeQueue);
    };

    match transition {
        Transition::EnqueuedToStarting => jobs.push(Job::InvokeStart { task: task.clone() }),
        Transition::UpToStopping | Transition::StartingToStopping => {
            jobs.push(Job::InvokeStop { task: task.clone() })
        }
        Transition::StoppingToStopped => {
            notify_dependents(&mut jobs, DependencySignal::Cancelled);
            free_slot(&mut jobs);
        }
        Transition::NewToStopped | Transition::WaitingToStopped | Transition::EnqueuedToStopped => {
            match task.stop_flag {
                StopFlag::Cancelled => notify_dependents(&mut jobs, DependencySignal::Cancelled),
                StopFlag::DependencyFailed => {
                    notify_dependents(&mut jobs, DependencySignal::Stopped)
                }
                StopFlag::None | StopFlag::Unsuccessful => {}
            }
        }
        Transition::UpToFailed
        | Transition::StartingToStartFailed
        | Transition::StoppingToStopFailed => {
            notify_dependents(&mut jobs, DependencySignal::Stopped);
            free_slot(&mut jobs);
        }
        Transition::UpToSuccessful => {
            notify_dependents(&mut jobs, DependencySignal::Succeeded);
            free_slot(&mut jobs);
        }
        Transition::StartingToUp
        | Transition::NewToWaiting
        | Transition::NewToEnqueued
        | Transition::WaitingToEnqueued => {}
    }

    let notify_caller = Job::NotifyCaller {
        transition,
        task: task.clone(),
    };
    let collectable = clean && task.state.is_final() && task.dependents.is_empty();
    match (collectable, task.caller_notification.is_some()) {
        (true, false) => {
            jobs.push(Job::delete_before_commit(task.name.clone()));
            jobs.push(notify_caller);
        }
        (true, true) => jobs.push(Job::delete_after(notify_caller, task.name.clone())),
        (false, _) => jobs.push(notify_caller),
    }
    jobs
}

/// Fire at most one transition on `task`, updating its state in place.
pub fn advance(task: &mut Task, clean: bool) -> Option<Step> {
    let transition = next_transition(task)?;
    task.state = transition.after();
    Some(Step {
        transition,
        jobs: side_effects(transition, task, clean),
    })
}

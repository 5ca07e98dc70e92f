// src/engine/transaction.rs

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};

use crate::jobs::Job;
use crate::store::UnitOfWork;

/// A unit of work plus the two deferred hooks jobs can bind to.
///
/// Store operations are reached through `Deref` to [`UnitOfWork`]. The
/// immediate hook needs no queue: in-progress jobs simply run while the
/// transaction is borrowed.
#[derive(Debug)]
pub struct Transaction {
    work: UnitOfWork,
    before_completion: VecDeque<Job>,
    after_success: Vec<Job>,
}

impl Transaction {
    pub(crate) fn new(work: UnitOfWork) -> Self {
        Self {
            work,
            before_completion: VecDeque::new(),
            after_success: Vec::new(),
        }
    }

    /// Queue a job to run just before commit, joined to this transaction.
    pub(crate) fn defer_before_completion(&mut self, job: Job) {
        self.before_completion.push_back(job);
    }

    /// Queue a job to run once this transaction has durably committed.
    pub(crate) fn defer_after_success(&mut self, job: Job) {
        self.after_success.push(job);
    }

    pub(crate) fn next_before_completion(&mut self) -> Option<Job> {
        self.before_completion.pop_front()
    }

    pub(crate) fn into_parts(self) -> (UnitOfWork, Vec<Job>) {
        (self.work, self.after_success)
    }

    pub fn pending_after_success(&self) -> &[Job] {
        &self.after_success
    }
}

impl Deref for Transaction {
    type Target = UnitOfWork;

    fn deref(&self) -> &UnitOfWork {
        &self.work
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut UnitOfWork {
        &mut self.work
    }
}

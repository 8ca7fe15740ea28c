// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Deferred work, driven by a virtual clock.
//!
//! An editor schedules at most one task per [`TaskPurpose`]; scheduling
//! again replaces the pending one, which is how auto-save is debounced.
//! Tasks remember which editor and which epoch scheduled them so that a
//! task outliving a reset or its editor is dropped instead of run.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use strum_macros::{Display, EnumIter};

static NEXT_EDITOR_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one editor instance for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EditorId(u64);

impl EditorId {
    pub fn next() -> Self {
        Self(NEXT_EDITOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "editor-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, Hash)]
pub enum TaskPurpose {
    /// The one-off check shortly after construction.
    IntegrityCheck,
    AutoSave,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredTask {
    pub purpose: TaskPurpose,
    pub owner: EditorId,
    pub epoch: u64,
    /// Virtual time at which the task becomes due.
    pub due: Duration,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    now: Duration,
    pending: Vec<DeferredTask>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `purpose` to run `delay` from now, cancelling any pending
    /// task with the same purpose.
    pub fn schedule(
        &mut self,
        purpose: TaskPurpose,
        owner: EditorId,
        epoch: u64,
        delay: Duration,
    ) {
        self.cancel(purpose);
        self.pending.push(DeferredTask {
            purpose,
            owner,
            epoch,
            due: self.now + delay,
        });
    }

    pub fn cancel(&mut self, purpose: TaskPurpose) {
        self.pending.retain(|task| task.purpose != purpose);
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, purpose: TaskPurpose) -> bool {
        self.pending.iter().any(|task| task.purpose == purpose)
    }

    pub fn pending(&self) -> &[DeferredTask] {
        &self.pending
    }

    /// Move the clock forward and take every task that became due, ordered
    /// by due time.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<DeferredTask> {
        self.now += elapsed;
        let now = self.now;
        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|task| task.due <= now);
        self.pending = pending;
        due.sort_by_key(|task| task.due);
        due
    }
}

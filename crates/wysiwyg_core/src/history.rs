// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Undo / Redo over sanitized content snapshots.
//!
//! History is a single list with a cursor rather than a pair of stacks:
//! undo and redo only move the cursor, and recording a new snapshot drops
//! everything after it.

use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Deref;

/// One recorded state of the document. Two snapshots are the same if
/// their markup is the same.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Snapshot(String);

impl Snapshot {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Snapshot {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Snapshot {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Snapshot {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Clone, Debug)]
pub struct HistoryManager {
    snapshots: Vec<Snapshot>,
    /// The current snapshot. `None` exactly when there are no snapshots.
    index: Option<usize>,
    limit: NonZeroUsize,
}

impl HistoryManager {
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            snapshots: Vec::new(),
            index: None,
            limit,
        }
    }

    /// Record `content` as the new current snapshot, unless it is already
    /// the current one. Anything that could have been redone is dropped,
    /// and once the limit is exceeded the oldest snapshot is evicted.
    ///
    /// Returns whether a snapshot was recorded.
    pub fn record_if_changed(&mut self, content: &str) -> bool {
        if self.current().is_some_and(|current| current == content) {
            return false;
        }

        let keep = self.index.map_or(0, |i| i + 1);
        self.snapshots.truncate(keep);
        self.snapshots.push(Snapshot(content.to_owned()));
        let mut index = self.snapshots.len() - 1;

        if self.snapshots.len() > self.limit.get() {
            self.snapshots.remove(0);
            index -= 1;
        }
        self.index = Some(index);

        self.assert_invariants();
        true
    }

    /// Step back one snapshot. Returns `None` if there is nothing to undo.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        let index = self.index.filter(|&i| i > 0)? - 1;
        self.index = Some(index);
        self.snapshots.get(index)
    }

    /// Step forward one snapshot. Returns `None` if there is nothing to
    /// redo.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        let index = self.index.filter(|&i| i + 1 < self.snapshots.len())? + 1;
        self.index = Some(index);
        self.snapshots.get(index)
    }

    /// The snapshot [`Self::undo`] would move to, without moving.
    pub fn peek_undo(&self) -> Option<&Snapshot> {
        let index = self.index?.checked_sub(1)?;
        self.snapshots.get(index)
    }

    /// The snapshot [`Self::redo`] would move to, without moving.
    pub fn peek_redo(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.index? + 1)
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.index = None;
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.index.and_then(|i| self.snapshots.get(i))
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit.get()
    }

    pub fn can_undo(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.index.is_some_and(|i| i + 1 < self.snapshots.len())
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    #[cfg(any(test, feature = "assert-invariants"))]
    pub(crate) fn assert_invariants(&self) {
        match self.index {
            None => assert!(self.snapshots.is_empty()),
            Some(i) => assert!(i < self.snapshots.len()),
        }
        assert!(self.snapshots.len() <= self.limit.get());
        assert!(
            self.snapshots.windows(2).all(|pair| pair[0] != pair[1]),
            "adjacent snapshots must differ"
        );
    }

    #[cfg(not(any(test, feature = "assert-invariants")))]
    pub(crate) fn assert_invariants(&self) {}
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;

    fn history(limit: usize) -> HistoryManager {
        HistoryManager::new(NonZeroUsize::new(limit).unwrap())
    }

    fn contents(history: &HistoryManager) -> Vec<&str> {
        history.snapshots().iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn new_history_is_empty() {
        let history = history(5);
        assert!(history.is_empty());
        assert_eq!(history.index(), None);
        assert!(history.current().is_none());
    }

    #[test]
    fn recording_moves_to_the_new_snapshot() {
        let mut history = history(5);
        assert!(history.record_if_changed("a"));
        assert!(history.record_if_changed("b"));
        assert_eq!(history.index(), Some(1));
        assert_eq!(history.current().unwrap(), "b");
    }

    #[test]
    fn recording_the_same_content_twice_creates_one_entry() {
        let mut history = history(5);
        history.record_if_changed("x");
        assert!(!history.record_if_changed("x"));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn undo_and_redo_visit_the_sequence_both_ways() {
        let mut history = history(10);
        let recorded = ["a", "b", "c", "d", "e"];
        for content in recorded {
            history.record_if_changed(content);
        }

        let mut backwards = Vec::new();
        for _ in 0..recorded.len() - 1 {
            backwards.push(history.undo().unwrap().to_string());
        }
        assert_eq!(backwards, vec!["d", "c", "b", "a"]);

        let mut forwards = Vec::new();
        for _ in 0..recorded.len() - 1 {
            forwards.push(history.redo().unwrap().to_string());
        }
        assert_eq!(forwards, vec!["b", "c", "d", "e"]);
        assert_eq!(history.current().unwrap(), "e");
    }

    #[test]
    fn peeking_does_not_move() {
        let mut history = history(5);
        assert!(history.peek_undo().is_none());
        history.record_if_changed("a");
        history.record_if_changed("b");
        assert_eq!(history.peek_undo().unwrap(), "a");
        assert!(history.peek_redo().is_none());
        assert_eq!(history.index(), Some(1));
        history.undo();
        assert_eq!(history.peek_redo().unwrap(), "b");
    }

    #[test]
    fn undo_at_the_start_does_nothing() {
        let mut history = history(5);
        assert!(history.undo().is_none());
        history.record_if_changed("a");
        assert!(history.undo().is_none());
        assert_eq!(history.index(), Some(0));
    }

    #[test]
    fn redo_at_the_end_does_nothing() {
        let mut history = history(5);
        assert!(history.redo().is_none());
        history.record_if_changed("a");
        history.record_if_changed("b");
        assert!(history.redo().is_none());
        assert_eq!(history.index(), Some(1));
    }

    #[test]
    fn undo_and_redo_never_record() {
        let mut history = history(5);
        history.record_if_changed("a");
        history.record_if_changed("b");
        history.undo();
        history.redo();
        history.undo();
        assert_eq!(contents(&history), vec!["a", "b"]);
    }

    #[test]
    fn new_edit_after_undo_discards_redo_entries() {
        let mut history = history(10);
        for content in ["a", "b", "c", "d"] {
            history.record_if_changed(content);
        }
        history.undo();
        history.undo();
        history.record_if_changed("x");

        assert_eq!(contents(&history), vec!["a", "b", "x"]);
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
    }

    #[test]
    fn recording_the_current_snapshot_after_undo_keeps_redo() {
        let mut history = history(10);
        history.record_if_changed("a");
        history.record_if_changed("b");
        history.undo();
        assert!(!history.record_if_changed("a"));
        assert!(history.can_redo());
    }

    #[test]
    fn overflow_evicts_the_oldest_snapshot() {
        let mut history = history(3);
        for content in ["a", "b", "c", "d"] {
            history.record_if_changed(content);
        }
        assert_eq!(contents(&history), vec!["b", "c", "d"]);
        assert_eq!(history.index(), Some(2));

        assert_eq!(history.undo().unwrap(), "c");
        assert_eq!(history.undo().unwrap(), "b");
        assert!(history.undo().is_none());
        assert_eq!(history.index(), Some(0));
    }

    #[test]
    fn eviction_keeps_the_current_snapshot_after_undo() {
        let mut history = history(3);
        for content in ["a", "b", "c"] {
            history.record_if_changed(content);
        }
        history.undo();
        history.record_if_changed("x");
        history.record_if_changed("y");

        assert_that!(history.len()).is_less_than_or_equal_to(3);
        assert_eq!(contents(&history), vec!["b", "x", "y"]);
        assert_eq!(history.current().unwrap(), "y");
    }

    #[test]
    fn a_limit_of_one_keeps_only_the_latest() {
        let mut history = history(1);
        history.record_if_changed("a");
        history.record_if_changed("b");
        assert_eq!(contents(&history), vec!["b"]);
        assert_eq!(history.index(), Some(0));
        assert!(!history.can_undo());
    }

    #[test]
    fn clear_empties_the_history() {
        let mut history = history(5);
        history.record_if_changed("a");
        history.record_if_changed("b");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.index(), None);
        assert!(history.record_if_changed("a"));
        assert_eq!(history.index(), Some(0));
    }

    #[test]
    fn length_never_exceeds_the_limit() {
        let mut history = history(4);
        for i in 0..20 {
            history.record_if_changed(&format!("<p>{i}</p>"));
            if i % 3 == 0 {
                history.undo();
            }
            assert_that!(history.len()).is_less_than_or_equal_to(4);
            history.assert_invariants();
        }
    }
}

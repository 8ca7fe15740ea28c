// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! In-memory capabilities, for hosts without a page and for tests.
//!
//! Each type is a cheap handle onto shared state: keep a clone, hand the
//! other to the [`EditorBuilder`](crate::EditorBuilder), and the clone sees
//! everything the editor does.

use std::cell::RefCell;
use std::rc::Rc;

use crate::capabilities::{
    NotificationKind, NotificationSink, Persistence, RichSurface,
    StorageError, SurfaceError,
};
use crate::dom::{escape_as_text, parse_fragment};
use crate::Mode;

#[derive(Debug)]
struct SurfaceState {
    markup: String,
    editable: bool,
    shown_mode: Option<Mode>,
    applied: Vec<(String, Option<String>)>,
    fail_next_write: bool,
    refuse_commands: bool,
    detached: bool,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            markup: String::new(),
            editable: true,
            shown_mode: None,
            applied: Vec::new(),
            fail_next_write: false,
            refuse_commands: false,
            detached: false,
        }
    }
}

/// A surface that keeps its markup in a string.
///
/// Markup written to it is re-serialized the way a browser would, so
/// reading back what was written gives the parser's canonical form.
#[derive(Clone, Debug, Default)]
pub struct HeadlessSurface {
    state: Rc<RefCell<SurfaceState>>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markup(markup: &str) -> Self {
        let surface = Self::new();
        surface.state.borrow_mut().markup = canonical(markup);
        surface
    }

    pub fn is_editable(&self) -> bool {
        self.state.borrow().editable
    }

    pub fn shown_mode(&self) -> Option<Mode> {
        self.state.borrow().shown_mode
    }

    /// Every command passed to [`RichSurface::apply`], in order.
    pub fn applied(&self) -> Vec<(String, Option<String>)> {
        self.state.borrow().applied.clone()
    }

    /// Replace the content as if the user had typed `text`: it shows up as
    /// literal text, never as markup.
    pub fn type_text(&mut self, text: &str) {
        self.state.borrow_mut().markup = canonical(&escape_as_text(text));
    }

    /// Replace the content directly, bypassing the editor, the way a
    /// paste or a script on the page would.
    pub fn type_markup(&mut self, markup: &str) {
        self.state.borrow_mut().markup = canonical(markup);
    }

    /// Make the next [`RichSurface::set_markup`] fail.
    pub fn fail_next_write(&mut self) {
        self.state.borrow_mut().fail_next_write = true;
    }

    /// Make formatting commands report that they had no effect.
    pub fn refuse_commands(&mut self, refuse: bool) {
        self.state.borrow_mut().refuse_commands = refuse;
    }

    /// Every later write fails, as if the surface had left the page.
    pub fn detach(&mut self) {
        self.state.borrow_mut().detached = true;
    }
}

impl RichSurface for HeadlessSurface {
    fn get_markup(&self) -> String {
        self.state.borrow().markup.clone()
    }

    fn set_markup(&mut self, markup: &str) -> Result<(), SurfaceError> {
        let mut state = self.state.borrow_mut();
        if state.detached {
            return Err(SurfaceError::Detached);
        }
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(SurfaceError::Rejected(String::from(
                "write refused",
            )));
        }
        state.markup = canonical(markup);
        Ok(())
    }

    fn set_editable(&mut self, editable: bool) {
        self.state.borrow_mut().editable = editable;
    }

    /// Records the command. `insertHTML`, `insertImage` and `createLink`
    /// append their result to the end of the content; other commands
    /// leave the content alone.
    fn apply(&mut self, command: &str, value: Option<&str>) -> bool {
        let mut state = self.state.borrow_mut();
        state
            .applied
            .push((command.to_owned(), value.map(str::to_owned)));
        if state.detached || state.refuse_commands {
            return false;
        }

        let inserted = match (command, value) {
            ("insertHTML", Some(html)) => html.to_owned(),
            ("insertImage", Some(src)) => {
                format!(r#"<img src="{}">"#, escape_attr(src))
            }
            ("createLink", Some(href)) => format!(
                r#"<a href="{}">{}</a>"#,
                escape_attr(href),
                escape_as_text(href)
            ),
            _ => return true,
        };
        let markup = format!("{}{}", state.markup, inserted);
        state.markup = canonical(&markup);
        true
    }

    fn show_mode(&mut self, mode: Mode) {
        self.state.borrow_mut().shown_mode = Some(mode);
    }
}

fn canonical(markup: &str) -> String {
    parse_fragment(markup).to_html()
}

fn escape_attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

#[derive(Debug, Default)]
struct StorageState {
    content: Option<String>,
    saves: usize,
    fail_next: bool,
}

/// Persistence backed by a single in-memory slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    state: Rc<RefCell<StorageState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: &str) -> Self {
        let storage = Self::new();
        storage.state.borrow_mut().content = Some(content.to_owned());
        storage
    }

    pub fn content(&self) -> Option<String> {
        self.state.borrow().content.clone()
    }

    /// How many times content was successfully saved.
    pub fn saves(&self) -> usize {
        self.state.borrow().saves
    }

    /// Make the next save or load fail.
    pub fn fail_next(&mut self) {
        self.state.borrow_mut().fail_next = true;
    }

    fn take_failure(&self) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        if state.fail_next {
            state.fail_next = false;
            return Err(StorageError::Unavailable(String::from(
                "quota exceeded",
            )));
        }
        Ok(())
    }
}

impl Persistence for MemoryStorage {
    fn save(&mut self, content: &str) -> Result<(), StorageError> {
        self.take_failure()?;
        let mut state = self.state.borrow_mut();
        state.content = Some(content.to_owned());
        state.saves += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<String>, StorageError> {
        self.take_failure()?;
        Ok(self.state.borrow().content.clone())
    }
}

/// A sink that keeps every notification.
#[derive(Clone, Debug, Default)]
pub struct CollectingNotifications {
    received: Rc<RefCell<Vec<(String, NotificationKind)>>>,
}

impl CollectingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<(String, NotificationKind)> {
        self.received.borrow().clone()
    }

    pub fn last(&self) -> Option<(String, NotificationKind)> {
        self.received.borrow().last().cloned()
    }

    pub fn contains(&self, message: &str, kind: NotificationKind) -> bool {
        self.received
            .borrow()
            .iter()
            .any(|(m, k)| m == message && *k == kind)
    }

    pub fn count_of(&self, kind: NotificationKind) -> usize {
        self.received.borrow().iter().filter(|(_, k)| *k == kind).count()
    }

    pub fn clear(&self) {
        self.received.borrow_mut().clear();
    }
}

impl NotificationSink for CollectingNotifications {
    fn notify(&mut self, message: &str, kind: NotificationKind) {
        self.received.borrow_mut().push((message.to_owned(), kind));
    }
}

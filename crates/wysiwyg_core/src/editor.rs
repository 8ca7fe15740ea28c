// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The [`Editor`]: history, modes and integrity checks wired to a surface.
//!
//! Every public operation runs to completion and never returns an error:
//! failures are turned into notifications at the boundary, and the editor
//! is left as it was before the operation started.

use std::num::NonZeroUsize;
use std::time::Duration;

use url::Url;

use crate::capabilities::{
    LogNotifications, NotificationKind, NotificationSink, Persistence,
    RichSurface,
};
use crate::dom::{parse_fragment, Fragment};
use crate::history::HistoryManager;
use crate::integrity::{
    normalize_fragment, repair, IntegrityReport, Repair, EMPTY_DOCUMENT,
};
use crate::mode::{literal_text, EditorState, Mode, ModeController, RawExit};
use crate::sanitizer::{sanitize, sanitize_fragment};
use crate::tasks::{DeferredTask, EditorId, TaskPurpose, TaskQueue};
use crate::{EditorConfig, EditorError};

const MAX_TABLE_SIZE: usize = 20;

pub struct EditorBuilder {
    config: EditorConfig,
    surface: Option<Box<dyn RichSurface>>,
    notifications: Option<Box<dyn NotificationSink>>,
    persistence: Option<Box<dyn Persistence>>,
    initial_content: Option<String>,
}

impl EditorBuilder {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            surface: None,
            notifications: None,
            persistence: None,
            initial_content: None,
        }
    }

    pub fn surface(mut self, surface: Box<dyn RichSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Where user-facing messages go. Defaults to [`LogNotifications`].
    pub fn notifications(
        mut self,
        notifications: Box<dyn NotificationSink>,
    ) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn persistence(mut self, persistence: Box<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Content to start with instead of whatever the surface already shows.
    pub fn initial_content(mut self, markup: impl Into<String>) -> Self {
        self.initial_content = Some(markup.into());
        self
    }

    pub fn build(self) -> Result<Editor, EditorError> {
        self.config.validate()?;
        let limit = NonZeroUsize::new(self.config.history_limit).ok_or_else(
            || EditorError::InvalidConfig(String::from("historyLimit is 0")),
        )?;
        let surface = self
            .surface
            .ok_or(EditorError::CapabilityUnavailable("rich surface"))?;

        let mut editor = Editor {
            id: EditorId::next(),
            epoch: 0,
            alive: true,
            config: self.config,
            surface,
            notifications: self
                .notifications
                .unwrap_or_else(|| Box::new(LogNotifications)),
            persistence: self.persistence,
            history: HistoryManager::new(limit),
            modes: ModeController::new(),
            tasks: TaskQueue::new(),
            last_saved: None,
        };

        let initial = self
            .initial_content
            .unwrap_or_else(|| editor.surface.get_markup());
        let initial = if initial.trim().is_empty() {
            EMPTY_DOCUMENT
        } else {
            initial.as_str()
        };
        let content = editor.set_content(initial)?;
        editor.history.record_if_changed(&content);

        let delay = editor.config.integrity_check_delay();
        editor.schedule(TaskPurpose::IntegrityCheck, delay);

        tracing::debug!(editor = %editor.id, "Editor created");
        Ok(editor)
    }
}

pub struct Editor {
    id: EditorId,
    /// Bumped by every full reset. Tasks from an older epoch are stale.
    epoch: u64,
    alive: bool,
    config: EditorConfig,
    surface: Box<dyn RichSurface>,
    notifications: Box<dyn NotificationSink>,
    persistence: Option<Box<dyn Persistence>>,
    history: HistoryManager,
    modes: ModeController,
    tasks: TaskQueue,
    last_saved: Option<Duration>,
}

impl Editor {
    pub fn id(&self) -> EditorId {
        self.id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn state(&self) -> &EditorState {
        self.modes.state()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn pending_tasks(&self) -> &[DeferredTask] {
        self.tasks.pending()
    }

    /// Virtual time of the last successful save.
    pub fn last_saved(&self) -> Option<Duration> {
        self.last_saved
    }

    /// The sanitized document. In code view this is the source being
    /// edited, which may not have been accepted yet.
    pub fn content(&self) -> String {
        match self.modes.mode() {
            Mode::RawMarkup => sanitize(
                self.modes
                    .raw_draft()
                    .unwrap_or(self.modes.last_known_good()),
            ),
            Mode::Normal | Mode::Preview => sanitize(&self.surface.get_markup()),
        }
    }

    /// Replace the whole document.
    pub fn set_html(&mut self, markup: &str) -> bool {
        self.run(|editor| {
            editor.modes.ensure_mutable("set content")?;
            let content = editor.set_content(markup)?;
            editor.content_changed(&content);
            Ok(true)
        })
    }

    /// The host calls this after the user edited the surface directly.
    pub fn handle_input(&mut self) {
        self.run(|editor| editor.try_handle_input().map(|_| true));
    }

    /// Run a formatting command against the current selection.
    pub fn apply(&mut self, command: &str, value: Option<&str>) -> bool {
        self.run(|editor| editor.try_apply(command, value))
    }

    pub fn insert_link(&mut self, url: &str) -> bool {
        self.run(|editor| {
            let url = Url::parse(url).map_err(EditorError::InvalidUrl)?;
            let applied = editor.try_apply("createLink", Some(url.as_str()))?;
            if applied {
                editor.notify("Link created successfully", NotificationKind::Success);
            }
            Ok(applied)
        })
    }

    pub fn insert_image(&mut self, url: &str) -> bool {
        self.run(|editor| {
            let url = Url::parse(url).map_err(EditorError::InvalidUrl)?;
            let applied = editor.try_apply("insertImage", Some(url.as_str()))?;
            if applied {
                editor.notify("Image inserted successfully", NotificationKind::Success);
            }
            Ok(applied)
        })
    }

    /// Insert a table of placeholder cells. Both dimensions must be
    /// between 1 and 20.
    pub fn insert_table(&mut self, rows: usize, cols: usize) -> bool {
        self.run(|editor| {
            let valid = 1..=MAX_TABLE_SIZE;
            if !valid.contains(&rows) || !valid.contains(&cols) {
                return Err(EditorError::InvalidTableDimensions { rows, cols });
            }
            let applied =
                editor.try_apply("insertHTML", Some(&table_markup(rows, cols)))?;
            if applied {
                editor.notify("Table inserted successfully", NotificationKind::Success);
            }
            Ok(applied)
        })
    }

    pub fn undo(&mut self) -> bool {
        self.run(|editor| {
            editor.modes.ensure_mutable("undo")?;
            let Some(target) = editor.history.peek_undo().cloned() else {
                editor.notify("Nothing to undo", NotificationKind::Info);
                return Ok(false);
            };
            editor.render(&target)?;
            editor.history.undo();
            editor.notify("Undo completed", NotificationKind::Info);
            Ok(true)
        })
    }

    pub fn redo(&mut self) -> bool {
        self.run(|editor| {
            editor.modes.ensure_mutable("redo")?;
            let Some(target) = editor.history.peek_redo().cloned() else {
                editor.notify("Nothing to redo", NotificationKind::Info);
                return Ok(false);
            };
            editor.render(&target)?;
            editor.history.redo();
            editor.notify("Redo completed", NotificationKind::Info);
            Ok(true)
        })
    }

    /// Normal <-> Preview. Returns the mode afterwards.
    pub fn toggle_preview(&mut self) -> Mode {
        self.run(|editor| {
            let mode = editor.modes.toggle_preview(editor.surface.as_mut())?;
            let message = match mode {
                Mode::Preview => "Preview mode enabled",
                _ => "Preview mode disabled",
            };
            editor.notify(message, NotificationKind::Info);
            Ok(true)
        });
        self.modes.mode()
    }

    /// Normal <-> RawMarkup. Returns the mode afterwards.
    pub fn toggle_raw_markup(&mut self) -> Mode {
        self.run(|editor| {
            match editor.modes.mode() {
                Mode::RawMarkup => editor.exit_raw_markup()?,
                Mode::Normal | Mode::Preview => {
                    let current = sanitize(&editor.surface.get_markup());
                    editor
                        .modes
                        .enter_raw_markup(&current, editor.surface.as_mut())?;
                    editor.notify(
                        "Code view enabled - Edit HTML directly",
                        NotificationKind::Info,
                    );
                }
            }
            Ok(true)
        });
        self.modes.mode()
    }

    /// Look for markup showing as text and fix it, resetting the editor if
    /// it cannot be fixed.
    pub fn check_integrity(&mut self) -> IntegrityReport {
        if !self.alive || self.modes.mode() == Mode::RawMarkup {
            return IntegrityReport::Skipped;
        }

        match repair(&self.surface.get_markup()) {
            Repair::Clean => IntegrityReport::Clean,
            Repair::Repaired(fragment) => {
                self.notify(
                    "Detected corrupted content. Fixing...",
                    NotificationKind::Warning,
                );
                let (content, _) = prepare(fragment);
                if let Err(error) = self.surface.set_markup(&content) {
                    self.report(error.into());
                    return IntegrityReport::Failed;
                }
                self.modes.force_normal(self.surface.as_mut());
                self.modes.note_content(&content);
                self.history.record_if_changed(&content);
                self.notify("Content fixed successfully", NotificationKind::Success);
                IntegrityReport::Repaired
            }
            Repair::Irreparable => {
                self.notify(
                    "Detected corrupted content. Fixing...",
                    NotificationKind::Warning,
                );
                match self.reset_document() {
                    Ok(()) => {
                        self.report(EditorError::IntegrityViolation(String::from(
                            "content could not be repaired and was reset",
                        )));
                        IntegrityReport::Reset
                    }
                    Err(error) => {
                        self.report(error);
                        IntegrityReport::Failed
                    }
                }
            }
        }
    }

    /// Throw everything away and start again from an empty document.
    pub fn reset(&mut self) -> bool {
        self.run(|editor| {
            editor.reset_document()?;
            editor.notify("Editor reset successfully", NotificationKind::Success);
            Ok(true)
        })
    }

    pub fn save(&mut self) -> bool {
        self.run(|editor| editor.try_save())
    }

    /// Replace the document with the saved one, if there is one.
    pub fn load(&mut self) -> bool {
        let loaded = self.run(|editor| {
            editor.modes.ensure_mutable("load content")?;
            let persistence = editor
                .persistence
                .as_mut()
                .ok_or(EditorError::CapabilityUnavailable("persistence"))?;
            let Some(saved) = persistence.load()? else {
                editor.notify("No saved content", NotificationKind::Info);
                return Ok(false);
            };
            let content = editor.set_content(&saved)?;
            editor.history.record_if_changed(&content);
            editor.notify("Content loaded", NotificationKind::Success);
            Ok(true)
        });
        if loaded {
            self.check_integrity();
        }
        loaded
    }

    /// Move the virtual clock forward, running whatever became due.
    pub fn advance(&mut self, elapsed: Duration) {
        if !self.alive {
            return;
        }
        for task in self.tasks.advance(elapsed) {
            if !self.alive || task.owner != self.id || task.epoch != self.epoch
            {
                tracing::debug!(
                    editor = %self.id,
                    purpose = %task.purpose,
                    "Dropping stale task"
                );
                continue;
            }
            match task.purpose {
                TaskPurpose::IntegrityCheck => {
                    self.check_integrity();
                }
                TaskPurpose::AutoSave => {
                    self.run(|editor| editor.try_save());
                }
            }
        }
    }

    /// Cancel all pending work. Every later call does nothing.
    pub fn destroy(&mut self) {
        self.tasks.cancel_all();
        self.alive = false;
        tracing::debug!(editor = %self.id, "Editor destroyed");
    }

    fn run(
        &mut self,
        operation: impl FnOnce(&mut Self) -> Result<bool, EditorError>,
    ) -> bool {
        if !self.alive {
            return false;
        }
        match operation(self) {
            Ok(done) => done,
            Err(error) => {
                self.report(error);
                false
            }
        }
    }

    /// Tell the user about `error`, and log it.
    fn report(&mut self, error: EditorError) {
        let kind = error.notification_kind();
        match kind {
            NotificationKind::Error => {
                tracing::error!(editor = %self.id, %error, "Operation failed")
            }
            _ => tracing::warn!(editor = %self.id, %error, "Operation rejected"),
        }
        self.notifications.notify(&error.to_string(), kind);
    }

    fn notify(&mut self, message: &str, kind: NotificationKind) {
        self.notifications.notify(message, kind);
    }

    /// Sanitize, normalize and show `markup`. Returns what was shown.
    fn set_content(&mut self, markup: &str) -> Result<String, EditorError> {
        let (content, restructured) = prepare(parse_fragment(markup));
        self.render(&content)?;
        if restructured {
            self.notify("Content structure fixed", NotificationKind::Info);
        }
        Ok(content)
    }

    /// Show already-prepared content.
    fn render(&mut self, content: &str) -> Result<(), EditorError> {
        self.surface.set_markup(content)?;
        self.modes.note_content(content);
        Ok(())
    }

    fn content_changed(&mut self, content: &str) {
        self.history.record_if_changed(content);
        if let Some(delay) = self.config.auto_save_delay() {
            self.schedule(TaskPurpose::AutoSave, delay);
        }
    }

    fn schedule(&mut self, purpose: TaskPurpose, delay: Duration) {
        self.tasks.schedule(purpose, self.id, self.epoch, delay);
    }

    fn try_handle_input(&mut self) -> Result<(), EditorError> {
        match self.modes.mode() {
            Mode::Normal => {
                let current = self.surface.get_markup();
                let content = sanitize(&current);
                if content != current {
                    self.surface.set_markup(&content)?;
                }
                self.modes.note_content(&content);
                self.content_changed(&content);
                Ok(())
            }
            Mode::RawMarkup => {
                let draft = literal_text(&self.surface.get_markup());
                self.modes.record_raw_edit(draft);
                if let Some(delay) = self.config.auto_save_delay() {
                    self.schedule(TaskPurpose::AutoSave, delay);
                }
                Ok(())
            }
            Mode::Preview => {
                let shown = self
                    .history
                    .current()
                    .map(|snapshot| snapshot.to_string())
                    .unwrap_or_else(|| String::from(EMPTY_DOCUMENT));
                self.surface.set_markup(&shown)?;
                Err(EditorError::Validation(String::from(
                    "Preview mode is read-only",
                )))
            }
        }
    }

    fn try_apply(
        &mut self,
        command: &str,
        value: Option<&str>,
    ) -> Result<bool, EditorError> {
        self.modes.ensure_mutable("format text")?;
        if !self.surface.apply(command, value) {
            tracing::warn!(editor = %self.id, command, "Command had no effect");
            return Ok(false);
        }
        let current = self.surface.get_markup();
        let content = sanitize(&current);
        if content != current {
            self.surface.set_markup(&content)?;
        }
        self.modes.note_content(&content);
        self.content_changed(&content);
        Ok(true)
    }

    fn exit_raw_markup(&mut self) -> Result<(), EditorError> {
        match self.modes.raw_exit(self.surface.as_ref())? {
            RawExit::Unchanged(content) => {
                self.surface.set_markup(&content)?;
                self.modes
                    .complete_raw_exit(&content, self.surface.as_mut());
                self.notify("Code view disabled", NotificationKind::Info);
            }
            RawExit::Parsed(fragment) => {
                let (content, _) = prepare(fragment);
                self.surface.set_markup(&content)?;
                self.modes
                    .complete_raw_exit(&content, self.surface.as_mut());
                self.history.record_if_changed(&content);
                self.notify("HTML updated successfully", NotificationKind::Success);
            }
            RawExit::Unparseable { restore } => {
                let parse_errors = parse_fragment(&restore).parse_errors();
                self.surface.set_markup(&restore)?;
                self.modes
                    .complete_raw_exit(&restore, self.surface.as_mut());
                self.report(EditorError::ParseFailure { parse_errors });
            }
        }
        self.check_integrity();
        Ok(())
    }

    fn reset_document(&mut self) -> Result<(), EditorError> {
        self.surface.set_markup(EMPTY_DOCUMENT)?;
        self.modes.force_normal(self.surface.as_mut());
        self.modes.clear_last_known_good();
        self.history.clear();
        self.history.record_if_changed(EMPTY_DOCUMENT);
        self.epoch += 1;
        tracing::debug!(editor = %self.id, epoch = self.epoch, "Editor reset");
        Ok(())
    }

    fn try_save(&mut self) -> Result<bool, EditorError> {
        let content = self.content();
        let persistence = self
            .persistence
            .as_mut()
            .ok_or(EditorError::CapabilityUnavailable("persistence"))?;
        persistence.save(&content)?;
        self.last_saved = Some(self.tasks.now());
        self.notify("Content saved", NotificationKind::Success);
        Ok(true)
    }
}

/// Sanitize and normalize a parsed document, returning the markup to show
/// and whether normalization changed anything.
///
/// Reinterpreted fragments can nest elements in ways the parser never
/// would (a `<p>` inside a `<p>`), so the serialized result goes through
/// [`sanitize`] again: what a surface holds after parsing it is both
/// canonical and clean.
fn prepare(mut fragment: Fragment) -> (String, bool) {
    sanitize_fragment(&mut fragment);
    let restructured = normalize_fragment(&mut fragment);
    let content = sanitize(&fragment.to_html());
    if content.trim().is_empty() {
        (String::from(EMPTY_DOCUMENT), restructured)
    } else {
        (content, restructured)
    }
}

fn table_markup(rows: usize, cols: usize) -> String {
    let mut html = String::from(
        r#"<table border="1" style="border-collapse: collapse; width: 100%;">"#,
    );
    for _ in 0..rows {
        html.push_str("<tr>");
        for _ in 0..cols {
            html.push_str(
                r#"<td style="padding: 8px; border: 1px solid #ddd;">Cell</td>"#,
            );
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

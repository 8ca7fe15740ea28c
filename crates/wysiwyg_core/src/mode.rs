// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Normal, Preview and RawMarkup modes, and what the surface holds in each.
//!
//! In Normal and Preview the surface shows the rendered document. In
//! RawMarkup it shows the document source as literal text, and edits to
//! that text only become the document again once they survive a parse on
//! the way out.

use strum_macros::{Display, EnumIter};

use crate::capabilities::RichSurface;
use crate::dom::{escape_as_text, parse_fragment, Fragment};
use crate::EditorError;

#[derive(
    Clone, Copy, Debug, Default, Display, EnumIter, PartialEq, Eq, Hash,
)]
pub enum Mode {
    #[default]
    Normal,
    Preview,
    RawMarkup,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditorState {
    pub mode: Mode,
    /// Sanitized markup to fall back on when raw markup is rejected.
    pub last_known_good: String,
    /// Literal text most recently typed in RawMarkup mode.
    pub raw_draft: Option<String>,
}

/// What leaving RawMarkup mode should render.
#[derive(Debug)]
pub enum RawExit {
    /// The source was not edited.
    Unchanged(String),
    /// The edited source parsed into at least one element.
    Parsed(Fragment),
    /// The edited source is not markup. `restore` is the pre-entry markup.
    Unparseable { restore: String },
}

#[derive(Debug, Default)]
pub struct ModeController {
    state: EditorState,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn last_known_good(&self) -> &str {
        &self.state.last_known_good
    }

    pub fn raw_draft(&self) -> Option<&str> {
        self.state.raw_draft.as_deref()
    }

    /// Fail unless the document may currently be changed by `action`.
    pub fn ensure_mutable(&self, action: &str) -> Result<(), EditorError> {
        match self.state.mode {
            Mode::Normal => Ok(()),
            Mode::Preview => Err(EditorError::Validation(format!(
                "Cannot {action} in preview mode"
            ))),
            Mode::RawMarkup => Err(EditorError::Validation(format!(
                "Cannot {action} in code view"
            ))),
        }
    }

    /// Remember a successful Normal-mode content change.
    pub fn note_content(&mut self, markup: &str) {
        if self.state.mode == Mode::Normal {
            self.state.last_known_good = markup.to_owned();
        }
    }

    pub fn clear_last_known_good(&mut self) {
        self.state.last_known_good.clear();
    }

    /// Normal <-> Preview. Returns the new mode.
    pub fn toggle_preview(
        &mut self,
        surface: &mut dyn RichSurface,
    ) -> Result<Mode, EditorError> {
        let next = match self.state.mode {
            Mode::Normal => Mode::Preview,
            Mode::Preview => Mode::Normal,
            Mode::RawMarkup => {
                return Err(EditorError::Validation(String::from(
                    "Exit code view before previewing",
                )))
            }
        };
        surface.set_editable(next == Mode::Normal);
        self.switch_to(next, surface);
        Ok(next)
    }

    /// Show `current` (the sanitized document) as editable source text.
    pub fn enter_raw_markup(
        &mut self,
        current: &str,
        surface: &mut dyn RichSurface,
    ) -> Result<(), EditorError> {
        match self.state.mode {
            Mode::Normal => {}
            Mode::Preview => {
                return Err(EditorError::Validation(String::from(
                    "Exit preview mode before opening code view",
                )))
            }
            Mode::RawMarkup => {
                return Err(EditorError::Validation(String::from(
                    "Code view is already open",
                )))
            }
        }
        surface.set_markup(&escape_as_text(current))?;
        surface.set_editable(true);
        self.state.last_known_good = current.to_owned();
        self.state.raw_draft = None;
        self.switch_to(Mode::RawMarkup, surface);
        Ok(())
    }

    /// Track an edit to the source text. Ignored outside RawMarkup.
    pub fn record_raw_edit(&mut self, draft: String) {
        if self.state.mode == Mode::RawMarkup {
            self.state.raw_draft = Some(draft);
        }
    }

    /// Decide what leaving RawMarkup should render, from the text currently
    /// on the surface. Nothing changes until [`Self::complete_raw_exit`].
    pub fn raw_exit(
        &self,
        surface: &dyn RichSurface,
    ) -> Result<RawExit, EditorError> {
        if self.state.mode != Mode::RawMarkup {
            return Err(EditorError::Validation(String::from(
                "Code view is not open",
            )));
        }

        let candidate = literal_text(&surface.get_markup());
        if candidate == self.state.last_known_good {
            return Ok(RawExit::Unchanged(candidate));
        }

        let fragment = parse_fragment(&candidate);
        if fragment.element_count() >= 1 {
            Ok(RawExit::Parsed(fragment))
        } else {
            tracing::debug!(
                parse_errors = fragment.parse_errors(),
                "Raw markup contains no elements"
            );
            Ok(RawExit::Unparseable {
                restore: self.state.last_known_good.clone(),
            })
        }
    }

    /// Back to Normal, with `rendered` already on the surface.
    pub fn complete_raw_exit(
        &mut self,
        rendered: &str,
        surface: &mut dyn RichSurface,
    ) {
        self.state.raw_draft = None;
        self.switch_to(Mode::Normal, surface);
        self.state.last_known_good = rendered.to_owned();
    }

    /// Drop whatever mode is active and go back to an editable Normal
    /// surface, without touching its content.
    pub fn force_normal(&mut self, surface: &mut dyn RichSurface) {
        self.state.raw_draft = None;
        surface.set_editable(true);
        self.switch_to(Mode::Normal, surface);
    }

    fn switch_to(&mut self, mode: Mode, surface: &mut dyn RichSurface) {
        if self.state.mode != mode {
            tracing::debug!(from = %self.state.mode, to = %mode, "Mode change");
        }
        self.state.mode = mode;
        surface.show_mode(mode);
    }
}

/// The text a reader sees in `markup`: what the user typed while the
/// surface showed source.
pub fn literal_text(markup: &str) -> String {
    parse_fragment(markup).text_content()
}

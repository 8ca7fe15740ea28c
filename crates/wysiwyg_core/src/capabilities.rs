// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The collaborators an [`Editor`](crate::Editor) is built from.
//!
//! The engine never renders, never touches storage and never talks to the
//! user directly. The host supplies those abilities through the traits in
//! this module; [`crate::headless`] has in-memory versions of all of them.

use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::Mode;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("The editing surface has been detached")]
    Detached,
    #[error("The editing surface rejected the content: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The rendered, editable area of the page.
///
/// In normal and preview mode the markup is the document. In raw markup
/// mode the editor writes the document source as escaped text, so the
/// surface shows (and lets the user edit) the source itself.
pub trait RichSurface {
    fn get_markup(&self) -> String;

    fn set_markup(&mut self, markup: &str) -> Result<(), SurfaceError>;

    fn set_editable(&mut self, editable: bool);

    /// Run a formatting command (bold, createLink, insertHTML, ...) against
    /// the current selection. Returns whether the command took effect.
    fn apply(&mut self, command: &str, value: Option<&str>) -> bool;

    /// Reflect the active mode in any mode indicators (toolbar buttons,
    /// container classes).
    fn show_mode(&mut self, _mode: Mode) {}
}

#[derive(
    Clone, Copy, Debug, Display, EnumIter, EnumString, PartialEq, Eq, Hash,
)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Where user-facing messages go. Fire and forget.
pub trait NotificationSink {
    fn notify(&mut self, message: &str, kind: NotificationKind);
}

pub trait Persistence {
    fn save(&mut self, content: &str) -> Result<(), StorageError>;

    fn load(&mut self) -> Result<Option<String>, StorageError>;
}

/// The default sink: messages become `tracing` events.
#[derive(Clone, Debug, Default)]
pub struct LogNotifications;

impl NotificationSink for LogNotifications {
    fn notify(&mut self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Info | NotificationKind::Success => {
                tracing::info!(%kind, "{message}")
            }
            NotificationKind::Warning => tracing::warn!(%kind, "{message}"),
            NotificationKind::Error => tracing::error!(%kind, "{message}"),
        }
    }
}

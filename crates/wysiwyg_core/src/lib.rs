// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

pub mod capabilities;
mod config;
pub mod dom;
mod editor;
mod error;
pub mod headless;
mod history;
pub mod integrity;
mod mode;
pub mod sanitizer;
pub mod tasks;

pub use crate::capabilities::LogNotifications;
pub use crate::capabilities::NotificationKind;
pub use crate::capabilities::NotificationSink;
pub use crate::capabilities::Persistence;
pub use crate::capabilities::RichSurface;
pub use crate::capabilities::StorageError;
pub use crate::capabilities::SurfaceError;
pub use crate::config::EditorConfig;
pub use crate::editor::Editor;
pub use crate::editor::EditorBuilder;
pub use crate::error::EditorError;
pub use crate::history::HistoryManager;
pub use crate::history::Snapshot;
pub use crate::integrity::IntegrityReport;
pub use crate::integrity::EMPTY_DOCUMENT;
pub use crate::mode::EditorState;
pub use crate::mode::Mode;
pub use crate::mode::ModeController;
pub use crate::mode::RawExit;
pub use crate::sanitizer::sanitize;

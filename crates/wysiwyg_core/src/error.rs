// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use thiserror::Error;

use crate::capabilities::{NotificationKind, StorageError, SurfaceError};

#[derive(Debug, Error)]
pub enum EditorError {
    /// A collaborator the editor cannot work without was not supplied.
    #[error("Required capability unavailable: {0}")]
    CapabilityUnavailable(&'static str),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// An operation that is not allowed right now. Nothing was changed.
    #[error("{0}")]
    Validation(String),
    #[error("Invalid URL format")]
    InvalidUrl(#[source] url::ParseError),
    #[error("Invalid table dimensions")]
    InvalidTableDimensions { rows: usize, cols: usize },
    /// Raw markup that does not parse into any element. The markup from
    /// before code view was opened is back on screen.
    #[error("Invalid HTML - restored original content")]
    ParseFailure { parse_errors: usize },
    #[error("Corrupted content: {0}")]
    IntegrityViolation(String),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EditorError {
    /// How loudly the user should hear about this error.
    pub fn notification_kind(&self) -> NotificationKind {
        match self {
            EditorError::Validation(_) | EditorError::ParseFailure { .. } => {
                NotificationKind::Warning
            }
            EditorError::CapabilityUnavailable(_)
            | EditorError::InvalidConfig(_)
            | EditorError::InvalidUrl(_)
            | EditorError::InvalidTableDimensions { .. }
            | EditorError::IntegrityViolation(_)
            | EditorError::Surface(_)
            | EditorError::Storage(_) => NotificationKind::Error,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validation_problems_are_warnings() {
        let error = EditorError::Validation("Exit preview first".into());
        assert_eq!(error.notification_kind(), NotificationKind::Warning);
        assert_eq!(error.to_string(), "Exit preview first");
    }

    #[test]
    fn bad_command_arguments_are_errors() {
        let error = EditorError::InvalidTableDimensions { rows: 0, cols: 3 };
        assert_eq!(error.notification_kind(), NotificationKind::Error);
        assert_eq!(error.to_string(), "Invalid table dimensions");

        let error = EditorError::InvalidUrl(url::ParseError::RelativeUrlWithoutBase);
        assert_eq!(error.to_string(), "Invalid URL format");
    }

    #[test]
    fn unparseable_raw_markup_is_a_warning() {
        let error = EditorError::ParseFailure { parse_errors: 2 };
        assert_eq!(error.notification_kind(), NotificationKind::Warning);
        assert_eq!(
            error.to_string(),
            "Invalid HTML - restored original content"
        );
    }

    #[test]
    fn storage_errors_convert_and_are_errors() {
        let error: EditorError =
            StorageError::Unavailable("quota exceeded".into()).into();
        assert_eq!(error.notification_kind(), NotificationKind::Error);
        assert_eq!(error.to_string(), "Storage unavailable: quota exceeded");
    }
}

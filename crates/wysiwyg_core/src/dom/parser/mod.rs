// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

mod fragment_creator;

use html5ever::{LocalName, Namespace, QualName};

use super::element_node::HTML_NAMESPACE;
use super::Fragment;
use fragment_creator::FragmentCreator;

/// Markup is always parsed as if it were the contents of a `<body>`,
/// which is where the editable surface lives.
fn context_name() -> QualName {
    QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from("body"),
    )
}

/// Parse `markup` the way a browser would parse it into an element's
/// contents. Never fails: malformed input is repaired, and the number of
/// repairs is available from [`Fragment::parse_errors`].
pub fn parse_fragment(markup: &str) -> Fragment {
    FragmentCreator::parse(markup)
}

// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! A small, tolerant markup tree.
//!
//! [`parse_fragment`] runs html5ever's tree builder over untrusted markup and
//! never fails. The resulting [`Fragment`] can be inspected, edited in place
//! by the sanitizer and integrity guard, and serialized back with
//! [`Fragment::to_html`].

mod element_node;
mod fragment;
mod parser;
mod to_html;

pub use element_node::ElementNode;
pub use fragment::{Fragment, FragmentNode, NodeHandle};
pub use parser::parse_fragment;
pub use to_html::escape_as_text;

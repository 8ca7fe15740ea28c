// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use html5ever::QualName;

use super::NodeHandle;

pub(crate) const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Elements which never have an end tag.
const VOID_ELEMENTS: [&str; 17] = [
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame",
    "hr", "img", "input", "keygen", "link", "meta", "param", "source",
    "track",
];

/// Elements whose text children are written out unescaped.
const RAW_TEXT_ELEMENTS: [&str; 8] = [
    "style",
    "script",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "noscript",
    "plaintext",
];

/// Elements which swallow a single newline directly after the start tag.
const LEADING_NEWLINE_ELEMENTS: [&str; 3] = ["pre", "textarea", "listing"];

#[derive(Clone, Debug, PartialEq)]
pub struct ElementNode {
    pub(crate) name: QualName,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) children: Vec<NodeHandle>,
    pub(crate) template_contents: Option<NodeHandle>,
    pub(crate) mathml_annotation_xml_integration_point: bool,
}

impl ElementNode {
    pub(crate) fn new(name: QualName) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
            template_contents: None,
            mathml_annotation_xml_integration_point: false,
        }
    }

    pub fn local_name(&self) -> &str {
        self.name.local.as_ref()
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub(crate) fn is_html(&self) -> bool {
        self.name.ns.as_ref() == HTML_NAMESPACE
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _v)| n == name)
            .map(|(_n, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .map(|v| v.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Drop every attribute matching `predicate`, returning the names
    /// that were removed.
    pub(crate) fn remove_attrs_where(
        &mut self,
        mut predicate: impl FnMut(&str, &str) -> bool,
    ) -> Vec<String> {
        let mut removed = Vec::new();
        self.attrs.retain(|(name, value)| {
            if predicate(name, value) {
                removed.push(name.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub(crate) fn is_void(&self) -> bool {
        self.is_html() && VOID_ELEMENTS.contains(&self.local_name())
    }

    pub(crate) fn is_raw_text(&self) -> bool {
        self.is_html() && RAW_TEXT_ELEMENTS.contains(&self.local_name())
    }

    pub(crate) fn is_plaintext(&self) -> bool {
        self.is_html() && self.local_name() == "plaintext"
    }

    pub(crate) fn swallows_leading_newline(&self) -> bool {
        self.is_html() && LEADING_NEWLINE_ELEMENTS.contains(&self.local_name())
    }
}

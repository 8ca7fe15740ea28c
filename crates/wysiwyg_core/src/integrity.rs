// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Detects serialized markup that ended up on screen as text, and keeps
//! loose text at the top level wrapped in paragraphs.
//!
//! Detection is heuristic. Only text nodes are inspected, only when their
//! trimmed content starts with `<`, and never inside elements that
//! legitimately show source (`pre`, `code`, `textarea`, `xmp`, raw text
//! elements). Each rule in [`LEAK_PREDICATES`] recognises one shape of
//! leaked markup.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{parse_fragment, ElementNode, Fragment, FragmentNode, NodeHandle};
use crate::sanitizer::sanitize_fragment;

/// What an empty editor contains.
pub const EMPTY_DOCUMENT: &str = "<p><br></p>";

/// Repair passes attempted before giving up and resetting.
const MAX_REPAIR_PASSES: usize = 4;

/// Elements whose text is expected to look like markup.
const SOURCE_ELEMENTS: [&str; 4] = ["pre", "code", "textarea", "xmp"];

static STYLED_OPENING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<[a-z][a-z0-9-]*\s[^<>]*\bstyle\s*=\s*["']"#)
        .expect("valid regex")
});

static HANDLER_OPENING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<[a-z][a-z0-9-]*\s[^<>]*\bon[a-z]+\s*=")
        .expect("valid regex")
});

static OPENING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<([a-z][a-z0-9-]*)[\s/>]").expect("valid regex")
});

/// One named rule for recognising leaked markup in a piece of text.
pub struct LeakPredicate {
    pub name: &'static str,
    matches: fn(&str) -> bool,
}

impl LeakPredicate {
    pub fn matches(&self, text: &str) -> bool {
        (self.matches)(text)
    }
}

impl std::fmt::Debug for LeakPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LeakPredicate").field(&self.name).finish()
    }
}

pub static LEAK_PREDICATES: [LeakPredicate; 3] = [
    LeakPredicate {
        name: "inline-style-opening",
        matches: has_styled_opening_tag,
    },
    LeakPredicate {
        name: "element-pair",
        matches: has_element_pair,
    },
    LeakPredicate {
        name: "event-handler-opening",
        matches: has_handler_opening_tag,
    },
];

fn has_styled_opening_tag(text: &str) -> bool {
    STYLED_OPENING_TAG.is_match(text)
}

fn has_handler_opening_tag(text: &str) -> bool {
    HANDLER_OPENING_TAG.is_match(text)
}

/// An opening tag followed, somewhere later, by its own closing tag.
fn has_element_pair(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    OPENING_TAG.captures_iter(&lower).any(|captures| {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1))
        else {
            return false;
        };
        let closing = format!("</{}", name.as_str());
        lower[whole.end()..]
            .match_indices(&closing)
            .any(|(at, _)| {
                let after = whole.end() + at + closing.len();
                lower[after..]
                    .chars()
                    .next()
                    .map_or(true, |c| c == '>' || c.is_ascii_whitespace())
            })
    })
}

/// A text node that looks like markup, and the first rule it matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leak {
    pub handle: NodeHandle,
    pub predicate: &'static str,
}

/// Find every text node in `fragment` that looks like leaked markup.
pub fn detect(fragment: &Fragment) -> Vec<Leak> {
    let root = fragment.root();
    fragment
        .descendants(&root)
        .into_iter()
        .filter_map(|handle| {
            let FragmentNode::Text(text) = fragment.get_node(&handle) else {
                return None;
            };
            if !text.trim_start().starts_with('<')
                || fragment.has_ancestor(&handle, shows_source)
            {
                return None;
            }
            let text = text.trim();
            LEAK_PREDICATES
                .iter()
                .find(|predicate| predicate.matches(text))
                .map(|predicate| Leak {
                    handle,
                    predicate: predicate.name,
                })
        })
        .collect()
}

fn shows_source(element: &ElementNode) -> bool {
    element.is_raw_text() || SOURCE_ELEMENTS.contains(&element.local_name())
}

/// Replace each leaked text node by the nodes its text parses into.
/// Returns `false`, leaving `fragment` partly rewritten, if any of them
/// does not parse into at least one element.
pub fn reinterpret(fragment: &mut Fragment, leaks: &[Leak]) -> bool {
    for leak in leaks {
        let FragmentNode::Text(text) = fragment.get_node(&leak.handle) else {
            continue;
        };
        let parsed = parse_fragment(text);
        if parsed.element_count() == 0 {
            return false;
        }
        let replacements: Vec<NodeHandle> = parsed
            .root_children()
            .iter()
            .map(|child| fragment.import(&parsed, child))
            .collect();
        fragment.replace_with(&leak.handle, replacements);
    }
    true
}

/// The outcome of trying to repair a document.
#[derive(Debug)]
pub enum Repair {
    /// Nothing looked like leaked markup.
    Clean,
    /// Leaked markup was turned back into elements, and sanitized.
    Repaired(Fragment),
    /// The document has to be reset.
    Irreparable,
}

/// Detect leaked markup in `markup` and reinterpret it, repeating on the
/// result until it comes out clean.
pub fn repair(markup: &str) -> Repair {
    let mut fragment = parse_fragment(markup);
    let mut passes = 0;
    loop {
        let leaks = detect(&fragment);
        if leaks.is_empty() {
            break;
        }
        tracing::debug!(
            pass = passes,
            leaks = leaks.len(),
            predicate = leaks[0].predicate,
            "Leaked markup detected"
        );
        if passes == MAX_REPAIR_PASSES || !reinterpret(&mut fragment, &leaks)
        {
            return Repair::Irreparable;
        }
        sanitize_fragment(&mut fragment);
        passes += 1;
    }

    if passes == 0 {
        Repair::Clean
    } else {
        Repair::Repaired(fragment)
    }
}

/// Wrap each top-level text node with visible content in its own `<p>`.
/// Returns whether anything changed.
pub fn normalize_fragment(fragment: &mut Fragment) -> bool {
    let mut changed = false;
    for handle in fragment.root_children() {
        let trimmed = match fragment.get_node(&handle) {
            FragmentNode::Text(text) if !text.trim().is_empty() => {
                text.trim().to_owned()
            }
            _ => continue,
        };
        let paragraph = fragment.create_html_element("p");
        let text = fragment.add_node(FragmentNode::Text(trimmed));
        fragment.append_child(&paragraph, text);
        fragment.replace_with(&handle, vec![paragraph]);
        changed = true;
    }
    changed
}

/// What an integrity check did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegrityReport {
    Clean,
    Repaired,
    /// Nothing could be salvaged; the editor was reset.
    Reset,
    /// The check did not run, because source is expected on screen or the
    /// editor is gone.
    Skipped,
    /// A repair or reset was needed but could not be written.
    Failed,
}

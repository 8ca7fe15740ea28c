// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use html5ever::{LocalName, Namespace, QualName};
use once_cell::sync::Lazy;

use super::element_node::{ElementNode, HTML_NAMESPACE};

/// Index of a node inside its owning [`Fragment`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub(crate) usize);

#[derive(Clone, Debug, PartialEq)]
pub enum FragmentNode {
    /// The document itself, or the contents of a `<template>`.
    Document(Vec<NodeHandle>),
    Element(ElementNode),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug, PartialEq)]
struct Slot {
    parent: Option<NodeHandle>,
    node: FragmentNode,
}

/// A parsed markup fragment.
///
/// All nodes are owned by one big list, and parents refer to their children
/// by handle. Nodes which were detached during parsing or sanitizing stay in
/// the list but are unreachable from the document, so every traversal starts
/// from [`Fragment::document_handle`].
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    slots: Vec<Slot>,
    document_handle: NodeHandle,
    pub(crate) parse_errors: usize,
}

static NO_NAME: Lazy<QualName> = Lazy::new(|| {
    QualName::new(None, Namespace::from(""), LocalName::from(""))
});

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}

impl Fragment {
    pub(crate) fn new() -> Self {
        Self {
            slots: vec![Slot {
                parent: None,
                node: FragmentNode::Document(Vec::new()),
            }],
            document_handle: NodeHandle(0),
            parse_errors: 0,
        }
    }

    pub fn document_handle(&self) -> &NodeHandle {
        &self.document_handle
    }

    /// Number of recoverable errors the parser reported.
    pub fn parse_errors(&self) -> usize {
        self.parse_errors
    }

    pub(crate) fn add_node(&mut self, node: FragmentNode) -> NodeHandle {
        self.slots.push(Slot { parent: None, node });
        NodeHandle(self.slots.len() - 1)
    }

    pub fn get_node(&self, handle: &NodeHandle) -> &FragmentNode {
        &self.slots[handle.0].node
    }

    pub(crate) fn get_mut_node(
        &mut self,
        handle: &NodeHandle,
    ) -> &mut FragmentNode {
        &mut self.slots[handle.0].node
    }

    pub fn parent(&self, handle: &NodeHandle) -> Option<&NodeHandle> {
        self.slots[handle.0].parent.as_ref()
    }

    pub(crate) fn name(&self, handle: &NodeHandle) -> &QualName {
        match self.get_node(handle) {
            FragmentNode::Element(element) => &element.name,
            _ => &NO_NAME,
        }
    }

    pub fn element(&self, handle: &NodeHandle) -> Option<&ElementNode> {
        match self.get_node(handle) {
            FragmentNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(
        &mut self,
        handle: &NodeHandle,
    ) -> Option<&mut ElementNode> {
        match self.get_mut_node(handle) {
            FragmentNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn children(&self, handle: &NodeHandle) -> &[NodeHandle] {
        match self.get_node(handle) {
            FragmentNode::Document(children) => children,
            FragmentNode::Element(element) => &element.children,
            FragmentNode::Text(_) | FragmentNode::Comment(_) => &[],
        }
    }

    fn children_mut(
        &mut self,
        handle: &NodeHandle,
    ) -> Option<&mut Vec<NodeHandle>> {
        match self.get_mut_node(handle) {
            FragmentNode::Document(children) => Some(children),
            FragmentNode::Element(element) => Some(&mut element.children),
            FragmentNode::Text(_) | FragmentNode::Comment(_) => None,
        }
    }

    /// The children a serializer should visit: a template's contents
    /// rather than its (always empty) child list.
    pub(crate) fn content_children(&self, handle: &NodeHandle) -> &[NodeHandle] {
        match self.element(handle).and_then(|e| e.template_contents.as_ref()) {
            Some(contents) => self.children(contents),
            None => self.children(handle),
        }
    }

    /// The element holding the parsed content. Fragment parsing always
    /// creates a single `html` element below the document.
    pub fn root(&self) -> NodeHandle {
        self.children(&self.document_handle)
            .iter()
            .find(|h| self.element(h).is_some())
            .cloned()
            .unwrap_or_else(|| self.document_handle.clone())
    }

    pub fn root_children(&self) -> Vec<NodeHandle> {
        self.children(&self.root()).to_vec()
    }

    /// Detach `child` from wherever it is and append it to `parent`.
    pub(crate) fn append_child(
        &mut self,
        parent: &NodeHandle,
        child: NodeHandle,
    ) {
        self.detach(&child);
        if let Some(children) = self.children_mut(parent) {
            children.push(child.clone());
            self.slots[child.0].parent = Some(parent.clone());
        }
    }

    /// Detach `child` and insert it directly before `sibling`. Does nothing
    /// if `sibling` has no parent.
    pub(crate) fn insert_before(
        &mut self,
        sibling: &NodeHandle,
        child: NodeHandle,
    ) {
        self.detach(&child);
        let Some(parent) = self.parent(sibling).cloned() else {
            return;
        };
        if let Some(children) = self.children_mut(&parent) {
            let index = children
                .iter()
                .position(|h| h == sibling)
                .unwrap_or(children.len());
            children.insert(index, child.clone());
            self.slots[child.0].parent = Some(parent);
        }
    }

    pub(crate) fn previous_sibling(
        &self,
        handle: &NodeHandle,
    ) -> Option<NodeHandle> {
        let parent = self.parent(handle)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|h| h == handle)?;
        index.checked_sub(1).map(|i| siblings[i].clone())
    }

    /// Remove `handle` from its parent. The subtree stays in the arena but
    /// is no longer reachable.
    pub(crate) fn detach(&mut self, handle: &NodeHandle) {
        if let Some(parent) = self.slots[handle.0].parent.take() {
            if let Some(children) = self.children_mut(&parent) {
                children.retain(|h| h != handle);
            }
        }
    }

    /// Put `replacements` where `target` was, in order, and detach `target`.
    pub(crate) fn replace_with(
        &mut self,
        target: &NodeHandle,
        replacements: Vec<NodeHandle>,
    ) {
        for replacement in replacements {
            self.insert_before(target, replacement);
        }
        self.detach(target);
    }

    pub(crate) fn create_html_element(&mut self, local: &str) -> NodeHandle {
        self.add_node(FragmentNode::Element(ElementNode::new(QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(local),
        ))))
    }

    /// Deep-copy `handle` out of `other` into this fragment. The copy has
    /// no parent.
    pub(crate) fn import(
        &mut self,
        other: &Fragment,
        handle: &NodeHandle,
    ) -> NodeHandle {
        let copy = match other.get_node(handle) {
            FragmentNode::Element(element) => {
                let mut shallow = element.clone();
                shallow.children = Vec::new();
                shallow.template_contents = None;
                FragmentNode::Element(shallow)
            }
            FragmentNode::Document(_) => FragmentNode::Document(Vec::new()),
            node => node.clone(),
        };
        let new_handle = self.add_node(copy);
        for child in other.children(handle) {
            let new_child = self.import(other, child);
            self.append_child(&new_handle, new_child);
        }
        if let Some(contents) =
            other.element(handle).and_then(|e| e.template_contents.clone())
        {
            let new_contents = self.import(other, &contents);
            if let Some(element) = self.element_mut(&new_handle) {
                element.template_contents = Some(new_contents);
            }
        }
        new_handle
    }

    /// Every node reachable from `handle` (inclusive), in document order.
    /// Template contents are visited as part of their template.
    pub fn descendants(&self, handle: &NodeHandle) -> Vec<NodeHandle> {
        let mut found = Vec::new();
        let mut stack = vec![handle.clone()];
        while let Some(current) = stack.pop() {
            let mut next: Vec<NodeHandle> =
                self.children(&current).to_vec();
            if let Some(contents) = self
                .element(&current)
                .and_then(|e| e.template_contents.clone())
            {
                next.push(contents);
            }
            stack.extend(next.into_iter().rev());
            found.push(current);
        }
        found
    }

    pub fn has_ancestor(
        &self,
        handle: &NodeHandle,
        mut predicate: impl FnMut(&ElementNode) -> bool,
    ) -> bool {
        let mut current = self.parent(handle);
        while let Some(parent) = current {
            if self.element(parent).is_some_and(&mut predicate) {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Number of elements in the parsed content, not counting the
    /// synthetic root.
    pub fn element_count(&self) -> usize {
        let root = self.root();
        self.descendants(&root)
            .iter()
            .filter(|h| **h != root && self.element(h).is_some())
            .count()
    }

    /// The text a reader would see, in document order. Line breaks read as
    /// newlines.
    pub fn text_content(&self) -> String {
        let root = self.root();
        let mut text = String::new();
        for handle in self.descendants(&root) {
            match self.get_node(&handle) {
                FragmentNode::Text(content) => text.push_str(content),
                FragmentNode::Element(element)
                    if element.is_html() && element.local_name() == "br" =>
                {
                    text.push('\n')
                }
                _ => {}
            }
        }
        text
    }
}

#[cfg(test)]
mod test {
    use crate::dom::parse_fragment;

    use super::*;

    #[test]
    fn root_is_the_synthetic_html_element() {
        let fragment = parse_fragment("<p>a</p>");
        let root = fragment.root();
        assert_eq!(fragment.element(&root).unwrap().local_name(), "html");
        assert_eq!(fragment.root_children().len(), 1);
    }

    #[test]
    fn element_count_ignores_text_and_root() {
        assert_eq!(parse_fragment("plain text").element_count(), 0);
        assert_eq!(parse_fragment("<p>a<b>b</b></p>").element_count(), 2);
    }

    #[test]
    fn text_content_reads_escaped_markup_literally() {
        let fragment = parse_fragment("&lt;p&gt;hi&lt;/p&gt;");
        assert_eq!(fragment.element_count(), 0);
        assert_eq!(fragment.text_content(), "<p>hi</p>");
    }

    #[test]
    fn text_content_turns_line_breaks_into_newlines() {
        assert_eq!(parse_fragment("a<br>b").text_content(), "a\nb");
    }

    #[test]
    fn detached_nodes_are_not_visited() {
        let mut fragment = parse_fragment("<i>x</i><b>y</b>");
        let first = fragment.root_children()[0].clone();
        fragment.detach(&first);
        assert_eq!(fragment.to_html(), "<b>y</b>");
        assert_eq!(fragment.element_count(), 1);
    }

    #[test]
    fn replace_with_keeps_position() {
        let mut fragment = parse_fragment("a<i>x</i>c");
        let italic = fragment.root_children()[1].clone();
        let other = parse_fragment("<b>1</b><u>2</u>");
        let imported: Vec<NodeHandle> = other
            .root_children()
            .iter()
            .map(|h| fragment.import(&other, h))
            .collect();
        fragment.replace_with(&italic, imported);
        assert_eq!(fragment.to_html(), "a<b>1</b><u>2</u>c");
    }

    #[test]
    fn has_ancestor_walks_up_to_the_root() {
        let fragment = parse_fragment("<pre><code>x</code></pre>");
        let text = fragment
            .descendants(fragment.document_handle())
            .into_iter()
            .find(|h| matches!(fragment.get_node(h), FragmentNode::Text(_)))
            .unwrap();
        assert!(fragment.has_ancestor(&text, |e| e.local_name() == "pre"));
        assert!(!fragment.has_ancestor(&text, |e| e.local_name() == "p"));
    }
}

// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::borrow::Cow;
use std::cell::{Ref, RefCell};

use html5ever::interface::NextParserState;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{parse_fragment, Attribute, QualName};

use super::context_name;
use crate::dom::{ElementNode, Fragment, FragmentNode, NodeHandle};

/// Builds a [`Fragment`] from html5ever's tree-construction callbacks.
///
/// Unlike a validating parser this never fails: every callback html5ever
/// can make is handled, and parse errors are only counted.
pub(crate) struct FragmentCreator {
    state: RefCell<CreatorState>,
}

#[derive(Default)]
struct CreatorState {
    fragment: Fragment,
    parse_errors: Vec<Cow<'static, str>>,
}

impl FragmentCreator {
    pub fn parse(markup: &str) -> Fragment {
        parse_fragment(
            FragmentCreator::default(),
            Default::default(),
            context_name(),
            vec![],
        )
        .from_utf8()
        .one(markup.as_bytes())
    }

    fn append_text(&self, parent: &NodeHandle, text: &str) {
        let fragment = &mut self.state.borrow_mut().fragment;
        let last_text = fragment
            .children(parent)
            .last()
            .filter(|h| {
                matches!(fragment.get_node(h), FragmentNode::Text(_))
            })
            .cloned();
        match last_text {
            Some(handle) => {
                if let FragmentNode::Text(content) =
                    fragment.get_mut_node(&handle)
                {
                    content.push_str(text);
                }
            }
            None => {
                let handle =
                    fragment.add_node(FragmentNode::Text(text.to_owned()));
                fragment.append_child(parent, handle);
            }
        }
    }
}

impl Default for FragmentCreator {
    fn default() -> Self {
        Self {
            state: RefCell::new(CreatorState::default()),
        }
    }
}

fn attr_name(attr: &Attribute) -> String {
    match &attr.name.prefix {
        Some(prefix) => format!("{}:{}", prefix, attr.name.local),
        None => attr.name.local.to_string(),
    }
}

impl TreeSink for FragmentCreator {
    type Handle = NodeHandle;
    type Output = Fragment;
    type ElemName<'a> = Ref<'a, QualName>;

    fn finish(self) -> Self::Output {
        let state = self.state.into_inner();
        if !state.parse_errors.is_empty() {
            tracing::trace!(
                errors = ?state.parse_errors,
                "tolerated markup parse errors"
            );
        }
        let mut fragment = state.fragment;
        fragment.parse_errors = state.parse_errors.len();
        fragment
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.state.borrow_mut().parse_errors.push(msg);
    }

    fn get_document(&self) -> Self::Handle {
        self.state.borrow().fragment.document_handle().clone()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.state.borrow(), |state| state.fragment.name(target))
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Self::Handle {
        let fragment = &mut self.state.borrow_mut().fragment;
        let mut element = ElementNode::new(name);
        element.attrs = attrs
            .iter()
            .map(|attr| (attr_name(attr), attr.value.to_string()))
            .collect();
        element.mathml_annotation_xml_integration_point =
            flags.mathml_annotation_xml_integration_point;
        if flags.template {
            element.template_contents =
                Some(fragment.add_node(FragmentNode::Document(Vec::new())));
        }
        fragment.add_node(FragmentNode::Element(element))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.state
            .borrow_mut()
            .fragment
            .add_node(FragmentNode::Comment(text.to_string()))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        // HTML has no processing instructions; keep them as the bogus
        // comment a browser would produce.
        self.state
            .borrow_mut()
            .fragment
            .add_node(FragmentNode::Comment(format!("?{target} {data}")))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(child) => self
                .state
                .borrow_mut()
                .fragment
                .append_child(parent, child),
            NodeOrText::AppendText(text) => self.append_text(parent, &text),
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent =
            self.state.borrow().fragment.parent(element).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        // A doctype carries no content in a fragment
    }

    fn mark_script_already_started(&self, _node: &Self::Handle) {}

    fn pop(&self, _node: &Self::Handle) {}

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        self.state
            .borrow()
            .fragment
            .element(target)
            .and_then(|e| e.template_contents.clone())
            .unwrap_or_else(|| target.clone())
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(
        &self,
        sibling: &Self::Handle,
        new_node: NodeOrText<Self::Handle>,
    ) {
        match new_node {
            NodeOrText::AppendNode(node) => self
                .state
                .borrow_mut()
                .fragment
                .insert_before(sibling, node),
            NodeOrText::AppendText(text) => {
                let fragment = &mut self.state.borrow_mut().fragment;
                let previous = fragment.previous_sibling(sibling);
                if let Some(FragmentNode::Text(content)) =
                    previous.as_ref().map(|h| fragment.get_mut_node(h))
                {
                    content.push_str(&text);
                } else {
                    let handle = fragment
                        .add_node(FragmentNode::Text(text.to_string()));
                    fragment.insert_before(sibling, handle);
                }
            }
        }
    }

    fn add_attrs_if_missing(
        &self,
        target: &Self::Handle,
        attrs: Vec<Attribute>,
    ) {
        let fragment = &mut self.state.borrow_mut().fragment;
        if let Some(element) = fragment.element_mut(target) {
            for attr in &attrs {
                let name = attr_name(attr);
                if element.get_attr(&name).is_none() {
                    element.attrs.push((name, attr.value.to_string()));
                }
            }
        }
    }

    fn associate_with_form(
        &self,
        _target: &Self::Handle,
        _form: &Self::Handle,
        _nodes: (&Self::Handle, Option<&Self::Handle>),
    ) {
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.state.borrow_mut().fragment.detach(target);
    }

    fn reparent_children(
        &self,
        node: &Self::Handle,
        new_parent: &Self::Handle,
    ) {
        let fragment = &mut self.state.borrow_mut().fragment;
        let children = fragment.children(node).to_vec();
        for child in children {
            fragment.append_child(new_parent, child);
        }
    }

    fn is_mathml_annotation_xml_integration_point(
        &self,
        handle: &Self::Handle,
    ) -> bool {
        self.state
            .borrow()
            .fragment
            .element(handle)
            .is_some_and(|e| e.mathml_annotation_xml_integration_point)
    }

    fn set_current_line(&self, _line_number: u64) {}

    fn complete_script(&self, _node: &Self::Handle) -> NextParserState {
        NextParserState::Continue
    }

    fn allow_declarative_shadow_roots(
        &self,
        _intended_parent: &Self::Handle,
    ) -> bool {
        false
    }

    fn attach_declarative_shadow(
        &self,
        _location: &Self::Handle,
        _template: &Self::Handle,
        _attrs: Vec<Attribute>,
    ) -> Result<(), String> {
        Err(String::from("declarative shadow roots are not supported"))
    }
}

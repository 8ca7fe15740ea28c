// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::{Fragment, FragmentNode, NodeHandle};

#[derive(Default)]
struct HtmlWriter {
    html: String,
    /// Set once a `<plaintext>` element has been written: the parser
    /// treats everything after its start tag as text, so nothing else
    /// (not even end tags) may follow.
    terminated: bool,
}

impl Fragment {
    /// Serialize the parsed content. Parsing the result again yields the
    /// same tree.
    pub fn to_html(&self) -> String {
        let mut writer = HtmlWriter::default();
        for child in self.root_children() {
            self.write_node(&child, false, &mut writer);
        }
        writer.html
    }

    fn write_node(
        &self,
        handle: &NodeHandle,
        raw_text: bool,
        writer: &mut HtmlWriter,
    ) {
        if writer.terminated {
            return;
        }
        match self.get_node(handle) {
            FragmentNode::Document(children) => {
                for child in children {
                    self.write_node(child, false, writer);
                }
            }
            FragmentNode::Text(text) => {
                if raw_text {
                    writer.html.push_str(text);
                } else {
                    writer.html.push_str(&encode_text(text));
                }
            }
            FragmentNode::Comment(comment) => {
                writer.html.push_str("<!--");
                writer.html.push_str(comment);
                writer.html.push_str("-->");
            }
            FragmentNode::Element(element) => {
                let name = element.local_name();
                writer.html.push('<');
                writer.html.push_str(name);
                for (attr, value) in &element.attrs {
                    writer.html.push(' ');
                    writer.html.push_str(attr);
                    writer.html.push_str("=\"");
                    writer
                        .html
                        .push_str(&encode_double_quoted_attribute(value));
                    writer.html.push('"');
                }
                writer.html.push('>');

                if element.is_void() {
                    return;
                }

                let children = self.content_children(handle);
                if element.swallows_leading_newline() {
                    let starts_with_newline = children
                        .first()
                        .map(|h| self.get_node(h))
                        .is_some_and(|node| {
                            matches!(node, FragmentNode::Text(t) if t.starts_with('\n'))
                        });
                    if starts_with_newline {
                        writer.html.push('\n');
                    }
                }
                for child in children {
                    self.write_node(child, element.is_raw_text(), writer);
                }

                if element.is_plaintext() {
                    writer.terminated = true;
                    return;
                }
                if !writer.terminated {
                    writer.html.push_str("</");
                    writer.html.push_str(name);
                    writer.html.push('>');
                }
            }
        }
    }
}

/// Render `markup` as literal text: the result, parsed as markup, reads as
/// exactly `markup`.
pub fn escape_as_text(markup: &str) -> String {
    encode_text(markup).into_owned()
}

#[cfg(test)]
mod test {
    use speculoos::{assert_that, AssertionFailure, Spec};

    use crate::dom::parse_fragment;

    use super::*;

    trait Roundtrips<T> {
        fn roundtrips(&self);
    }

    impl<'s, T> Roundtrips<T> for Spec<'s, T>
    where
        T: AsRef<str>,
    {
        fn roundtrips(&self) {
            let subject = self.subject.as_ref();
            let output = parse_fragment(subject).to_html();
            if output != subject {
                AssertionFailure::from_spec(self)
                    .with_expected(String::from(subject))
                    .with_actual(output)
                    .fail();
            }
        }
    }

    fn reserialized(markup: &str) -> String {
        parse_fragment(markup).to_html()
    }

    #[test]
    fn plain_text_roundtrips() {
        assert_that!("some text").roundtrips();
    }

    #[test]
    fn nested_tags_roundtrip() {
        assert_that!("<b><em>ZZ</em></b>").roundtrips();
        assert_that!("X<b>Y<em>ZZ</em>0</b>1").roundtrips();
        assert_that!(" X <b> Y <em> ZZ </em> 0 </b> 1 ").roundtrips();
    }

    #[test]
    fn attributes_roundtrip() {
        assert_that!(r#"<b><a href="http://example.com">ZZ</a></b>"#)
            .roundtrips();
        assert_that!(r#"<span style="letter-spacing: 2px">Hi</span>"#)
            .roundtrips();
    }

    #[test]
    fn void_elements_have_no_end_tag() {
        assert_eq!(reserialized("a<br/>b<img src=x>"), r#"a<br>b<img src="x">"#);
    }

    #[test]
    fn text_is_escaped() {
        assert_that!("1 &lt; 2 &amp;&amp; 3 &gt; 2").roundtrips();
    }

    #[test]
    fn attribute_quotes_are_escaped() {
        let html = reserialized(r#"<a title='say "hi"'>x</a>"#);
        assert_eq!(parse_fragment(&html).to_html(), html);
        assert!(html.contains("&quot;hi&quot;"));
    }

    #[test]
    fn raw_text_elements_are_not_escaped() {
        assert_that!("<style>a > b { color: red }</style>").roundtrips();
    }

    #[test]
    fn leading_newline_in_pre_survives_reparsing() {
        let once = reserialized("<pre>\n\nx</pre>");
        assert_eq!(once, "<pre>\n\nx</pre>");
        assert_eq!(reserialized(&once), once);
    }

    #[test]
    fn nothing_is_written_after_plaintext() {
        let once = reserialized("<p>a<plaintext>b</p><i>c");
        assert_eq!(once, "<p>a</p><plaintext>b</p><i>c");
        assert_eq!(reserialized(&once), once);
    }

    #[test]
    fn escape_as_text_reads_back_literally() {
        let markup = r#"<p class="x">a &amp; b</p>"#;
        let fragment = parse_fragment(&escape_as_text(markup));
        assert_eq!(fragment.element_count(), 0);
        assert_eq!(fragment.text_content(), markup);
    }
}

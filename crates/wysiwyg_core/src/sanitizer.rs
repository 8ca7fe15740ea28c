// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Strips active content out of untrusted markup before it becomes part of
//! the document.

use crate::dom::{parse_fragment, Fragment, NodeHandle};

/// Elements removed together with everything inside them.
const DENIED_ELEMENTS: [&str; 5] = ["script", "object", "embed", "applet", "form"];

/// The built-in "copy code" button keeps its click handler.
const TRUSTED_CLASS: &str = "code-copy-btn";
const TRUSTED_HANDLER: &str = "onclick";

/// Parse, clean and re-serialize rounds tried before giving up on markup
/// that keeps changing shape.
const MAX_SANITIZE_PASSES: usize = 6;

/// Parse, clean and re-serialize `markup`. Never fails.
///
/// Cleaning can change how the serialized markup parses (foreign content
/// and foster parenting move nodes between namespaces), so the output is
/// parsed and cleaned again until a pass removes nothing and reproduces
/// it exactly. Markup that never settles is dropped.
pub fn sanitize(markup: &str) -> String {
    let mut html = String::from(markup);
    for pass in 0..MAX_SANITIZE_PASSES {
        let mut fragment = parse_fragment(&html);
        let removed = sanitize_fragment(&mut fragment);
        let next = fragment.to_html();
        if !removed && next == html {
            return html;
        }
        tracing::trace!(pass, removed, "Markup changed while sanitizing");
        html = next;
    }
    tracing::warn!("Markup did not settle while sanitizing, dropping it");
    String::new()
}

/// Clean an already-parsed fragment in place. Returns whether anything was
/// removed.
pub fn sanitize_fragment(fragment: &mut Fragment) -> bool {
    let document = fragment.document_handle().clone();
    let mut any_removed = false;
    let mut denied: Vec<NodeHandle> = Vec::new();

    for handle in fragment.descendants(&document) {
        let Some(element) = fragment.element(&handle) else {
            continue;
        };
        if is_denied_element(element.local_name()) {
            denied.push(handle);
            continue;
        }

        let trusted = element.has_class(TRUSTED_CLASS);
        let Some(element) = fragment.element_mut(&handle) else {
            continue;
        };
        let removed = element.remove_attrs_where(|name, value| {
            if trusted && name.eq_ignore_ascii_case(TRUSTED_HANDLER) {
                return false;
            }
            is_event_handler(name) || is_script_uri(value)
        });
        if !removed.is_empty() {
            any_removed = true;
            tracing::debug!(
                element = element.local_name(),
                ?removed,
                "Removed denied attributes"
            );
        }
    }

    // Descendants come out in document order, so an ancestor is always
    // detached before its own denied children are looked at.
    for handle in denied {
        if let Some(element) = fragment.element(&handle) {
            tracing::debug!(element = element.local_name(), "Removed denied element");
        }
        fragment.detach(&handle);
        any_removed = true;
    }
    any_removed
}

fn is_denied_element(local_name: &str) -> bool {
    DENIED_ELEMENTS
        .iter()
        .any(|denied| local_name.eq_ignore_ascii_case(denied))
}

fn is_event_handler(name: &str) -> bool {
    name.get(..2)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
}

/// Browsers ignore whitespace and control characters inside a URL scheme,
/// so `java\tscript:` is still a script URI.
fn is_script_uri(value: &str) -> bool {
    let scheme: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .take("javascript:".len())
        .collect();
    scheme.eq_ignore_ascii_case("javascript:")
}

#[cfg(test)]
mod test {
    use indoc::indoc;
    use speculoos::prelude::*;

    use super::*;

    fn assert_idempotent(markup: &str) {
        let once = sanitize(markup);
        assert_eq!(sanitize(&once), once, "not idempotent for {markup:?}");
    }

    #[test]
    fn harmless_markup_is_unchanged() {
        let markup =
            r#"<p>Hello <b>bold</b> <a href="https://example.com">link</a></p>"#;
        assert_eq!(sanitize(markup), markup);
    }

    #[test]
    fn denied_elements_are_removed_with_their_contents() {
        assert_eq!(
            sanitize("<p>a<script>alert(1)</script>b</p>"),
            "<p>ab</p>"
        );
        assert_eq!(
            sanitize(r#"<object data="x"><p>inner</p></object><p>kept</p>"#),
            "<p>kept</p>"
        );
        assert_eq!(sanitize("<form><input></form>after"), "after");
        assert_eq!(sanitize(r#"x<embed src="y">z"#), "xz");
        assert_eq!(sanitize("<applet>q</applet>ok"), "ok");
    }

    #[test]
    fn denied_elements_are_matched_in_any_namespace() {
        let html = sanitize("<svg><script>alert(1)</script><rect></rect></svg>");
        assert_that!(html.as_str()).does_not_contain("script");
        assert_that!(html.as_str()).contains("<rect>");
    }

    #[test]
    fn denied_elements_inside_templates_are_removed() {
        let html = sanitize("<template><script>x()</script><b>t</b></template>");
        assert_eq!(html, "<template><b>t</b></template>");
    }

    #[test]
    fn event_handlers_are_removed() {
        assert_eq!(
            sanitize(r#"<img src="a.png" onerror="steal()">"#),
            r#"<img src="a.png">"#
        );
        assert_eq!(
            sanitize(r#"<p onClick="x()" ONMOUSEOVER="y()">t</p>"#),
            "<p>t</p>"
        );
        assert_eq!(
            sanitize(r#"<div onfocusin="z()">t</div>"#),
            "<div>t</div>"
        );
    }

    #[test]
    fn script_uris_are_removed() {
        assert_eq!(
            sanitize(r#"<a href="javascript:alert(1)">x</a>"#),
            "<a>x</a>"
        );
        assert_eq!(
            sanitize("<a href=\" JaVa\tScRiPt:alert(1)\">x</a>"),
            "<a>x</a>"
        );
        assert_eq!(
            sanitize(r#"<a href="https://example.com/javascript:">x</a>"#),
            r#"<a href="https://example.com/javascript:">x</a>"#
        );
    }

    #[test]
    fn copy_button_keeps_its_click_handler_only() {
        let html = sanitize(
            r#"<button class="code-copy-btn" onclick="copyCode(this)" onmouseover="x()">Copy</button>"#,
        );
        assert_eq!(
            html,
            r#"<button class="code-copy-btn" onclick="copyCode(this)">Copy</button>"#
        );
    }

    #[test]
    fn code_blocks_with_copy_buttons_survive_intact() {
        let markup = indoc! {r#"
            <div class="code-block">
            <button class="code-copy-btn" onclick="copyCode(this)">Copy</button>
            <pre><code>let x = 1;
            &lt;b&gt;not markup&lt;/b&gt;</code></pre>
            </div>"#};
        assert_eq!(sanitize(markup), markup);
    }

    #[test]
    fn other_buttons_lose_their_click_handler() {
        assert_eq!(
            sanitize(r#"<button class="copy" onclick="x()">Copy</button>"#),
            r#"<button class="copy">Copy</button>"#
        );
    }

    #[test]
    fn copy_button_still_loses_script_uris() {
        assert_eq!(
            sanitize(
                r#"<a class="code-copy-btn" href="javascript:x()" onclick="c()">c</a>"#
            ),
            r#"<a class="code-copy-btn" onclick="c()">c</a>"#
        );
    }

    #[test]
    fn malformed_markup_is_cleaned_best_effort() {
        assert_eq!(sanitize("<b>unclosed <i>tags"), "<b>unclosed <i>tags</i></b>");
        assert_eq!(sanitize("<p onclick=x>broken <script"), "<p>broken </p>");
    }

    /// Markup that parses differently once serialized: foreign content,
    /// integration points, `noscript` and foster-parented table content.
    const SHAPE_SHIFTING: [&str; 10] = [
        "<math><mtext><table><mglyph><style><img src=x onerror=alert(1)>",
        r#"<math><mtext><h1><a><h6></a></h6><mglyph><svg><mtext><style><a title="</style><img src onerror=alert(1)>"></style></h1>"#,
        r#"<svg></p><style><a id="</style><img src=1 onerror=alert(1)>">"#,
        "<svg><foreignObject><img src=x onerror=y()></foreignObject></svg>",
        r#"<math><annotation-xml encoding="text/html"><script>x()</script><b onclick=y()>b</b></annotation-xml></math>"#,
        "<svg><desc><form><img onerror=z()></form></desc></svg>",
        r#"<noscript><p title="</noscript><img src=x onerror=alert(1)>"></noscript>"#,
        "<table><tr><td>a</td></tr><img src=x onerror=y()><script>z()</script></table>",
        "<table><b onmouseover=x()>t</b><form><input></form></table>",
        "<math><mi><svg><style><img onerror=q()></style></svg></mi></math>",
    ];

    /// Parse the sanitized markup the way a surface would and check that no
    /// active content came back.
    fn assert_clean_when_reparsed(markup: &str) {
        let fragment = parse_fragment(&sanitize(markup));
        let document = fragment.document_handle().clone();
        for handle in fragment.descendants(&document) {
            let Some(element) = fragment.element(&handle) else {
                continue;
            };
            assert!(
                !is_denied_element(element.local_name()),
                "{} survived in {markup:?}",
                element.local_name()
            );
            for (name, value) in element.attrs() {
                assert!(
                    !is_event_handler(name) && !is_script_uri(value),
                    "{name}={value:?} survived in {markup:?}"
                );
            }
        }
    }

    #[test]
    fn sanitizing_is_idempotent() {
        for markup in [
            "",
            "plain",
            "<p>a<script>b</script>c</p>",
            "<b><i>x</b>y</i>",
            "<table><tr><td>1</td></tr><form>f</form></table>",
            "<pre>\n\ncode</pre>",
            r#"<a href="java&#x09;script:x">l</a>"#,
            "<p>a<plaintext>b</p><form>c",
            "<template><object></object>t</template>",
            "<svg><style>s</style></svg><noscript><p>n</p></noscript>",
        ]
        .into_iter()
        .chain(SHAPE_SHIFTING)
        {
            assert_idempotent(markup);
        }
    }

    #[test]
    fn no_denied_element_survives() {
        for markup in [
            "<scr<script>ipt>alert(1)</script>",
            "<SCRIPT>x</SCRIPT>",
            "<object><embed><applet><form>",
            "<math><script>x</script></math>",
        ]
        .into_iter()
        .chain(SHAPE_SHIFTING)
        {
            assert_clean_when_reparsed(markup);
        }
    }

    #[test]
    fn handler_hidden_in_raw_text_does_not_come_back() {
        let once =
            sanitize("<math><mtext><table><mglyph><style><img src=x onerror=alert(1)>");
        assert_that!(sanitize(&once)).is_equal_to(once.clone());
        assert_clean_when_reparsed(&once);
    }
}

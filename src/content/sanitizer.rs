use scraper::{ElementRef, Html};

use crate::scrape::resolve_url;

/// Kept on every image after rewriting.
const IMG_STYLE: &str = "max-width:100%;height:auto;";
/// Kept on every anchor.
const A_STYLE: &str = "word-break:break-all;";

/// Elements whose entire subtree is dropped.
const DROPPED: &[&str] = &["script", "style", "iframe", "noscript", "template"];

/// Elements serialized without a closing tag.
const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Rewrite untrusted article HTML for safe display.
///
/// Structural whitelist, one case per tag kind:
/// - `<img>`: src resolved against the site domain and routed through the
///   image proxy; keeps exactly src, a lazy-load hint, and a fixed style.
/// - `<a>`: href resolved, target/rel forced, fixed style; nothing else.
/// - script/style/iframe and comments: gone.
/// - everything else: tag and children survive, every attribute dropped.
pub fn sanitize(html: &str, site_domain: &str, proxy_path: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    render_children(fragment.root_element(), site_domain, proxy_path, &mut out);
    out
}

fn render_children(parent: ElementRef, domain: &str, proxy_path: &str, out: &mut String) {
    for child in parent.children() {
        if let Some(element) = ElementRef::wrap(child) {
            render_element(element, domain, proxy_path, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(&escape_text(text));
        }
        // Comments and other node kinds are dropped.
    }
}

fn render_element(element: ElementRef, domain: &str, proxy_path: &str, out: &mut String) {
    let name = element.value().name();

    if DROPPED.contains(&name) {
        return;
    }

    match name {
        "img" => {
            let Some(src) = element.value().attr("src") else {
                return;
            };
            let absolute = resolve_url(src.trim(), domain);
            out.push_str(&format!(
                r#"<img src="{}?url={}" loading="lazy" style="{}">"#,
                escape_attr(proxy_path),
                urlencoding::encode(&absolute),
                IMG_STYLE
            ));
        }
        "a" => {
            let href = element
                .value()
                .attr("href")
                .map(|h| resolve_url(h.trim(), domain))
                .unwrap_or_default();
            out.push_str(&format!(
                r#"<a href="{}" target="_blank" rel="noopener noreferrer" style="{}">"#,
                escape_attr(&href),
                A_STYLE
            ));
            render_children(element, domain, proxy_path, out);
            out.push_str("</a>");
        }
        _ => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            if !VOID.contains(&name) {
                render_children(element, domain, proxy_path, out);
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

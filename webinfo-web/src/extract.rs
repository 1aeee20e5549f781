//! Main-content selection and noise removal.
//!
//! The page is decoded per its declared charset and parsed once. The content
//! root is `main`, then `article`, then a non-empty `body`. Noise elements are
//! detached from the tree in place before the remaining subtree is converted
//! to Markdown.

use crate::charset::decode_html;
use crate::fetch::FetchedPage;
use crate::markdown::{MarkdownOptions, MarkdownRenderer};
use scraper::{ElementRef, Html, Node};

pub const DEFAULT_NOISE_TAGS: &[&str] = &["aside", "footer", "nav", "script"];
pub const DEFAULT_AD_CLASSES: &[&str] = &["ad", "advertisement", "banner"];

const AD_CONTAINER_TAG: &str = "div";

/// Tags and classes removed from the content root before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRules {
    /// Any descendant with one of these tag names is dropped.
    pub noise_tags: Vec<String>,
    /// `div` descendants carrying one of these class tokens are dropped.
    pub ad_classes: Vec<String>,
}

impl Default for ExtractRules {
    fn default() -> Self {
        Self {
            noise_tags: DEFAULT_NOISE_TAGS.iter().map(|s| s.to_string()).collect(),
            ad_classes: DEFAULT_AD_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExtractRules {
    fn is_noise(&self, el: &ElementRef<'_>) -> bool {
        let name = el.value().name();
        if self.noise_tags.iter().any(|t| t.eq_ignore_ascii_case(name)) {
            return true;
        }
        name == AD_CONTAINER_TAG
            && el
                .value()
                .classes()
                .any(|class| self.ad_classes.iter().any(|ad| ad == class))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    rules: ExtractRules,
    renderer: MarkdownRenderer,
}

impl ContentExtractor {
    pub fn new(rules: ExtractRules, options: MarkdownOptions) -> Self {
        Self {
            rules,
            renderer: MarkdownRenderer::new(options),
        }
    }

    pub fn rules(&self) -> &ExtractRules {
        &self.rules
    }

    /// Extract the main content of an HTML document as Markdown.
    ///
    /// Returns `None` when the document has no `main`, no `article` and an
    /// empty `body`. The encoding comes from a byte order mark or a `<meta>`
    /// declaration, falling back to UTF-8 with invalid sequences replaced.
    ///
    /// ```
    /// use webinfo_web::extract::ContentExtractor;
    ///
    /// let html = b"<html><body><main><h2>Hello</h2><nav>menu</nav></main></body></html>";
    /// let md = ContentExtractor::default().extract(html);
    /// assert_eq!(md.as_deref(), Some("## Hello"));
    /// ```
    pub fn extract(&self, html: &[u8]) -> Option<String> {
        self.extract_with_content_type(html, None)
    }

    /// [`extract`](Self::extract) for a fetched page, letting the
    /// `Content-Type` charset take part in decoding.
    pub fn extract_page(&self, page: &FetchedPage) -> Option<String> {
        self.extract_with_content_type(&page.body, page.content_type.as_deref())
    }

    fn extract_with_content_type(&self, html: &[u8], content_type: Option<&str>) -> Option<String> {
        let decoded = decode_html(html, content_type);
        tracing::debug!(
            encoding = decoded.encoding.name(),
            source = ?decoded.source,
            had_errors = decoded.had_errors,
            "extract.decoded"
        );
        let mut document = Html::parse_document(&decoded.text);

        let (root_id, root_tag, doomed) = {
            let root = find_content_root(&document)?;
            let doomed: Vec<_> = root
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .filter(|el| self.rules.is_noise(el))
                .map(|el| el.id())
                .collect();
            (root.id(), root.value().name().to_string(), doomed)
        };

        // Detaching an ancestor first leaves nested matches in a detached
        // subtree, which is harmless.
        for id in &doomed {
            if let Some(mut node) = document.tree.get_mut(*id) {
                node.detach();
            }
        }

        let root = document.tree.get(root_id).and_then(ElementRef::wrap)?;
        let markdown = match self.renderer.render(root) {
            Ok(md) => md,
            Err(err) => {
                tracing::warn!(root = %root_tag, error = %err, "extract.markdown_failed");
                plain_text(root)
            }
        };

        tracing::info!(
            root = %root_tag,
            removed = doomed.len(),
            markdown_chars = markdown.len(),
            "extract.done"
        );
        Some(markdown)
    }
}

/// Whitespace-collapsed text of `root`, used when conversion fails.
fn plain_text(root: ElementRef<'_>) -> String {
    root.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn find_content_root(document: &Html) -> Option<ElementRef<'_>> {
    let first = |tag: &str| {
        document
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == tag)
    };

    first("main")
        .or_else(|| first("article"))
        .or_else(|| first("body").filter(has_content))
}

/// html5ever synthesizes a `body` for every document, so an empty one does
/// not count as content.
fn has_content(el: &ElementRef<'_>) -> bool {
    el.children().any(|child| match child.value() {
        Node::Element(_) => true,
        Node::Text(text) => !text.trim().is_empty(),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::HeadingStyle;

    fn extract(html: &str) -> Option<String> {
        ContentExtractor::default().extract(html.as_bytes())
    }

    #[test]
    fn no_content_root_yields_none() {
        assert_eq!(extract(""), None);
        assert_eq!(extract("<html><head><title>t</title></head></html>"), None);
        assert_eq!(extract("<html><body>   \n </body></html>"), None);
    }

    #[test]
    fn body_fallback_uses_atx_headings() {
        let md = extract("<body><h1>Title</h1><p>Text</p></body>").unwrap();
        assert!(md.contains("# Title"));
        assert!(md.contains("Text"));
        assert!(!md.contains("====="));
    }

    #[test]
    fn prefers_main_then_article() {
        let html = "<body><p>outside</p><article><p>story</p></article><main><p>primary</p></main></body>";
        assert_eq!(extract(html).as_deref(), Some("primary"));

        let html = "<body><p>outside</p><article><p>story</p></article></body>";
        assert_eq!(extract(html).as_deref(), Some("story"));
    }

    #[test]
    fn empty_main_still_counts_as_root() {
        assert_eq!(extract("<body><main></main><p>x</p></body>").as_deref(), Some(""));
    }

    #[test]
    fn noise_tags_are_removed() {
        let html = r#"<main>
            <nav>Menu</nav>
            <p>Body copy</p>
            <aside>Related</aside>
            <script>var tracking = 1;</script>
            <footer>Copyright</footer>
        </main>"#;
        let md = extract(html).unwrap();
        assert_eq!(md, "Body copy");
    }

    #[test]
    fn ad_divs_are_removed_by_class_token() {
        let html = r#"<main>
            <div class="ad">Buy now</div>
            <div class="sidebar banner">Sale</div>
            <div class="advertisement">Sponsored</div>
            <div class="adventure">Kept</div>
            <p class="ad">Paragraph with ad class</p>
        </main>"#;
        let md = extract(html).unwrap();
        assert!(!md.contains("Buy now"));
        assert!(!md.contains("Sale"));
        assert!(!md.contains("Sponsored"));
        assert!(md.contains("Kept"));
        assert!(md.contains("Paragraph with ad class"));
    }

    #[test]
    fn nested_noise_inside_removed_subtree() {
        let html = r#"<main><div class="ad"><nav>inner</nav></div><p>ok</p></main>"#;
        assert_eq!(extract(html).as_deref(), Some("ok"));
    }

    #[test]
    fn rules_are_injectable() {
        let rules = ExtractRules {
            noise_tags: vec!["header".into()],
            ad_classes: vec!["promo".into()],
        };
        let extractor = ContentExtractor::new(rules, MarkdownOptions::default());
        let html = r#"<main><header>Top</header><nav>Menu</nav><div class="promo">Deal</div><div class="ad">Ad</div></main>"#;
        let md = extractor.extract(html.as_bytes()).unwrap();
        assert!(!md.contains("Top"));
        assert!(!md.contains("Deal"));
        assert!(md.contains("Menu"));
        assert!(md.contains("Ad"));
    }

    #[test]
    fn setext_option_reaches_the_renderer() {
        let extractor = ContentExtractor::new(
            ExtractRules::default(),
            MarkdownOptions {
                heading_style: HeadingStyle::Setext,
                ..Default::default()
            },
        );
        let md = extractor.extract(b"<body><h1>Title</h1></body>").unwrap();
        assert!(md.starts_with("Title\n==="), "got {md:?}");
    }

    #[test]
    fn paragraph_spacing_is_normalized() {
        let md = extract("<main><p>```not a fence</p><p>a   </p>\n\n\n<p>b</p></main>").unwrap();
        assert!(!md.contains("\n\n\n"), "got {md:?}");
        assert!(md.ends_with("a\n\nb"), "got {md:?}");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let md = ContentExtractor::default()
            .extract(b"<main><p>caf\xe9</p></main>")
            .unwrap();
        assert_eq!(md, "caf\u{FFFD}");
    }

    #[test]
    fn latin1_meta_charset_is_decoded() {
        let page = b"<html><head><meta charset=\"iso-8859-1\"></head><body><main><p>Caf\xe9 cr\xe8me</p></main></body></html>";
        let md = ContentExtractor::default().extract(page).unwrap();
        assert_eq!(md, "Café crème");
    }

    #[test]
    fn content_type_charset_applies_to_fetched_pages() {
        let page = FetchedPage {
            status: 200,
            content_type: Some("text/html; charset=ISO-8859-1".into()),
            body: b"<main><p>Cr\xe8me br\xfbl\xe9e</p></main>".to_vec(),
        };
        let md = ContentExtractor::default().extract_page(&page).unwrap();
        assert_eq!(md, "Crème brûlée");
    }
}

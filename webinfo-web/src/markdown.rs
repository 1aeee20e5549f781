//! HTML to Markdown conversion of an extracted subtree.
//!
//! Conversion is delegated to `htmd`; this module only maps our options onto
//! its builder and tidies the outer edges of the result.

use htmd::HtmlToMarkdown;
use htmd::options::{BulletListMarker, CodeBlockFence, CodeBlockStyle, Options};
use scraper::ElementRef;
use std::str::FromStr;

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// How headings are marked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingStyle {
    /// `# Title`
    #[default]
    Atx,
    /// `Title` underlined with `=` or `-`; levels 3 to 6 fall back to ATX.
    Setext,
}

impl FromStr for HeadingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atx" => Ok(Self::Atx),
            "setext" => Ok(Self::Setext),
            other => Err(format!("unknown heading style {other:?} (expected atx or setext)")),
        }
    }
}

/// Marker used for unordered list items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulletMarker {
    #[default]
    Asterisk,
    Dash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkdownOptions {
    pub heading_style: HeadingStyle,
    pub bullet: BulletMarker,
}

impl MarkdownOptions {
    fn to_htmd(self) -> Options {
        Options {
            heading_style: match self.heading_style {
                HeadingStyle::Atx => htmd::options::HeadingStyle::Atx,
                HeadingStyle::Setext => htmd::options::HeadingStyle::Setex,
            },
            bullet_list_marker: match self.bullet {
                BulletMarker::Asterisk => BulletListMarker::Asterisk,
                BulletMarker::Dash => BulletListMarker::Dash,
            },
            code_block_style: CodeBlockStyle::Fenced,
            code_block_fence: CodeBlockFence::Backticks,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: MarkdownOptions,
}

impl MarkdownRenderer {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Convert `root` and everything still attached below it.
    ///
    /// ```
    /// use scraper::Html;
    /// use webinfo_web::markdown::MarkdownRenderer;
    ///
    /// let doc = Html::parse_document("<body><h1>Title</h1><p>Text</p></body>");
    /// let md = MarkdownRenderer::default().render(doc.root_element()).unwrap();
    /// assert_eq!(md, "# Title\n\nText");
    /// ```
    pub fn render(&self, root: ElementRef<'_>) -> std::io::Result<String> {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(SKIPPED_TAGS.to_vec())
            .options(self.options.to_htmd())
            .build();
        let markdown = converter.convert(&root.html())?;
        Ok(markdown.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn render_with(html: &str, options: MarkdownOptions) -> String {
        let doc = Html::parse_document(html);
        MarkdownRenderer::new(options)
            .render(doc.root_element())
            .unwrap()
    }

    fn render(html: &str) -> String {
        render_with(html, MarkdownOptions::default())
    }

    #[test]
    fn parses_heading_style() {
        assert_eq!("ATX".parse::<HeadingStyle>(), Ok(HeadingStyle::Atx));
        assert_eq!(" setext ".parse::<HeadingStyle>(), Ok(HeadingStyle::Setext));
        assert!("fancy".parse::<HeadingStyle>().is_err());
    }

    #[test]
    fn atx_headings_by_default() {
        let md = render("<body><h2>Hello</h2><h4>Deep</h4></body>");
        assert_eq!(md, "## Hello\n\n#### Deep");
    }

    #[test]
    fn setext_underlines_top_levels() {
        let md = render_with(
            "<body><h1>Title</h1><h2>Sub</h2><h3>Small</h3></body>",
            MarkdownOptions {
                heading_style: HeadingStyle::Setext,
                ..Default::default()
            },
        );
        assert!(md.starts_with("Title\n==="), "got {md:?}");
        assert!(md.contains("Sub\n---"), "got {md:?}");
        assert!(md.contains("### Small"), "got {md:?}");
        assert!(!md.contains("# Title"));
    }

    #[test]
    fn paragraphs_are_separated_by_one_blank_line() {
        let md = render("<main><p>```not a fence</p><p>a   </p>\n\n\n<p>b</p></main>");
        assert!(!md.contains("\n\n\n"), "got {md:?}");
        assert!(md.contains("not a fence"), "got {md:?}");
        assert!(md.ends_with("a\n\nb"), "got {md:?}");
    }

    #[test]
    fn links_and_emphasis() {
        let md = render(r#"<p>Read <a href="https://example.com/doc">the <em>docs</em></a> <strong>now</strong></p>"#);
        assert!(md.contains("](https://example.com/doc)"), "got {md:?}");
        assert!(md.contains("_docs_") || md.contains("*docs*"), "got {md:?}");
        assert!(md.contains("**now**"), "got {md:?}");
    }

    #[test]
    fn bullet_marker_is_configurable() {
        let html = "<ul><li>one</li><li>two</li></ul>";
        let md = render(html);
        assert!(md.lines().all(|l| l.trim_start().starts_with('*')), "got {md:?}");

        let md = render_with(
            html,
            MarkdownOptions {
                bullet: BulletMarker::Dash,
                ..Default::default()
            },
        );
        assert!(md.lines().all(|l| l.trim_start().starts_with('-')), "got {md:?}");
    }

    #[test]
    fn pre_blocks_become_fenced_code() {
        let md = render("<pre><code>fn main() {\n    println!(\"hi\");\n}\n</code></pre><p>after</p>");
        assert!(md.starts_with("```"), "got {md:?}");
        assert!(md.contains("    println!(\"hi\");"), "got {md:?}");
        assert!(md.ends_with("after"), "got {md:?}");
    }

    #[test]
    fn skipped_tags_are_not_rendered() {
        let md = render("<body><p>Visible</p><style>p{}</style><noscript>enable js</noscript><template><p>t</p></template></body>");
        assert_eq!(md, "Visible");
    }
}

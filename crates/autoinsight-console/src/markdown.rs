//! Content rendering: transcript markdown to sanitized HTML.
//!
//! [`MarkdownRenderer`] is built with the default `markdown` feature.
//! [`EscapedTextRenderer`] is always available and is the fallback when the
//! markdown renderer is not compiled in or fails.

use std::sync::Arc;

use tracing::warn;

/// Error from content rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Renderer abstraction: convert transcript content to display HTML.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, content: &str) -> Result<String, RenderError>;
}

/// Escapes the five HTML-special characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Literal-text renderer: no markup is interpreted.
#[derive(Clone, Copy, Debug, Default)]
pub struct EscapedTextRenderer;

impl ContentRenderer for EscapedTextRenderer {
    fn render(&self, content: &str) -> Result<String, RenderError> {
        Ok(escape_html(content))
    }
}

/// Renders with `renderer`, degrading to escaped literal text on failure.
pub fn render_or_escape(renderer: &dyn ContentRenderer, content: &str) -> String {
    match renderer.render(content) {
        Ok(html) => html,
        Err(err) => {
            warn!(
                event = "render.fallback",
                domain = "render",
                error = %err,
                "content renderer failed; showing escaped text"
            );
            escape_html(content)
        }
    }
}

/// The best renderer compiled into this build.
pub fn default_renderer() -> Arc<dyn ContentRenderer> {
    #[cfg(feature = "markdown")]
    {
        Arc::new(MarkdownRenderer::new())
    }
    #[cfg(not(feature = "markdown"))]
    {
        Arc::new(EscapedTextRenderer)
    }
}

#[cfg(feature = "markdown")]
pub use highlight::MarkdownRenderer;

#[cfg(feature = "markdown")]
mod highlight {
    use once_cell::sync::Lazy;
    use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
    use syntect::html::{ClassStyle, ClassedHTMLGenerator};
    use syntect::parsing::SyntaxSet;
    use syntect::util::LinesWithEndings;

    use super::{ContentRenderer, RenderError, escape_html};

    static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

    /// Markdown renderer (GFM-style tables, strikethrough, task lists) with
    /// class-based syntax highlighting of fenced code.
    ///
    /// Raw HTML in the source is shown as text, and `javascript:` links are
    /// neutralized, so the output is safe to inject into a page.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MarkdownRenderer;

    impl MarkdownRenderer {
        pub fn new() -> Self {
            Self
        }
    }

    impl ContentRenderer for MarkdownRenderer {
        fn render(&self, content: &str) -> Result<String, RenderError> {
            let options =
                Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
            let mut events: Vec<Event<'_>> = Vec::new();
            let mut code: Option<(String, String)> = None;

            for event in Parser::new_ext(content, options) {
                if let Some((lang, buf)) = code.as_mut() {
                    match event {
                        Event::Text(text) => buf.push_str(&text),
                        Event::End(TagEnd::CodeBlock) => {
                            let block = highlight_block(lang, buf)?;
                            events.push(Event::Html(CowStr::from(block)));
                            code = None;
                        }
                        _ => {}
                    }
                    continue;
                }
                match event {
                    Event::Start(Tag::CodeBlock(kind)) => {
                        let lang = match kind {
                            CodeBlockKind::Fenced(info) => {
                                info.split_whitespace().next().unwrap_or("").to_string()
                            }
                            CodeBlockKind::Indented => String::new(),
                        };
                        code = Some((lang, String::new()));
                    }
                    Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
                    Event::SoftBreak => events.push(Event::HardBreak),
                    Event::Start(Tag::Link {
                        link_type,
                        dest_url,
                        title,
                        id,
                    }) => events.push(Event::Start(Tag::Link {
                        link_type,
                        dest_url: safe_url(dest_url),
                        title,
                        id,
                    })),
                    Event::Start(Tag::Image {
                        link_type,
                        dest_url,
                        title,
                        id,
                    }) => events.push(Event::Start(Tag::Image {
                        link_type,
                        dest_url: safe_url(dest_url),
                        title,
                        id,
                    })),
                    other => events.push(other),
                }
            }

            let mut out = String::with_capacity(content.len() * 3 / 2);
            html::push_html(&mut out, events.into_iter());
            Ok(out)
        }
    }

    fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
        let scheme = url.trim_start().to_ascii_lowercase();
        if scheme.starts_with("javascript:")
            || scheme.starts_with("vbscript:")
            || scheme.starts_with("data:text/html")
        {
            CowStr::from("#")
        } else {
            url
        }
    }

    fn highlight_block(lang: &str, code: &str) -> Result<String, RenderError> {
        let syntax = if lang.is_empty() {
            None
        } else {
            SYNTAXES
                .find_syntax_by_token(lang)
                .or_else(|| SYNTAXES.find_syntax_by_extension(lang))
        };
        let Some(syntax) = syntax else {
            let class = if lang.is_empty() {
                String::new()
            } else {
                format!(" class=\"language-{}\"", escape_html(lang))
            };
            return Ok(format!("<pre><code{class}>{}</code></pre>\n", escape_html(code)));
        };

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|e| RenderError(format!("highlighting failed: {e}")))?;
        }
        Ok(format!(
            "<pre><code class=\"language-{}\">{}</code></pre>\n",
            escape_html(lang),
            generator.finalize()
        ))
    }
}

use std::sync::Arc;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

pub const HTML_BEGIN: &str = r#"<!DOCTYPE html>
<html lang="en-US">
<head>
<meta charset="UTF-8">
<link rel="shortcut icon" href="/static/favicon.ico" />
<link rel="stylesheet" media="all" href="/static/main.css"/>
<link rel="stylesheet" media="all" href="/static/ansi.css"/>
<link rel="stylesheet" media="all" href="/static/highlight.css"/>
</head>
<body>"#;

pub const HTML_END: &str = "</body>
</html>";

/// Class style shared by the highlighter and the generated stylesheet.
pub const CLASS_STYLE: ClassStyle = ClassStyle::Spaced;

/// How a paste should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Syntax-highlighted HTML.
    Default,
    /// The stored bytes as `text/plain`.
    Raw,
    /// The stored bytes as `text/html`.
    Html,
    /// Terminal colors translated to HTML.
    Ansi,
}

impl Variant {
    /// Parse the trailing path segment of `/{id}/{suffix}`.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "raw" => Some(Variant::Raw),
            "html" => Some(Variant::Html),
            "ansi" => Some(Variant::Ansi),
            _ => None,
        }
    }
}

/// A rendered response body together with its content type.
#[derive(Debug)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: Bytes,
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

#[derive(Clone)]
pub struct Renderer {
    syntaxes: Arc<SyntaxSet>,
    default_syntax: Option<Arc<str>>,
}

impl Renderer {
    pub fn new(default_syntax: Option<&str>) -> Self {
        Renderer {
            syntaxes: Arc::new(SyntaxSet::load_defaults_newlines()),
            default_syntax: default_syntax.map(Into::into),
        }
    }

    /// Render `data` as `variant`. `lang` only affects the highlighted variant.
    pub fn render(
        &self,
        data: Bytes,
        variant: Variant,
        lang: Option<&str>,
    ) -> crate::ApiResult<Rendered> {
        let rendered = match variant {
            Variant::Raw => Rendered {
                content_type: "text/plain; charset=utf-8",
                body: data,
            },
            Variant::Html => Rendered {
                content_type: "text/html; charset=utf-8",
                body: data,
            },
            Variant::Ansi => {
                let html = ansi_to_html::convert_escaped(&String::from_utf8_lossy(&data))?;
                Rendered {
                    content_type: "text/html; charset=utf-8",
                    body: wrap_page(&html).into(),
                }
            }
            Variant::Default => {
                let html = self.highlight(&String::from_utf8_lossy(&data), lang)?;
                Rendered {
                    content_type: "text/html; charset=utf-8",
                    body: wrap_page(&html).into(),
                }
            }
        };

        Ok(rendered)
    }

    fn highlight(&self, text: &str, lang: Option<&str>) -> crate::ApiResult<String> {
        let syntax = self.pick_syntax(text, lang);
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, CLASS_STYLE);
        for line in LinesWithEndings::from(text) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        Ok(generator.finalize())
    }

    fn pick_syntax(&self, text: &str, lang: Option<&str>) -> &SyntaxReference {
        let by_token = |token: &str| self.syntaxes.find_syntax_by_token(token);

        lang.and_then(by_token)
            .or_else(|| {
                let first_line = text.lines().next()?;
                self.syntaxes.find_syntax_by_first_line(first_line)
            })
            .or_else(|| self.default_syntax.as_deref().and_then(by_token))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }
}

fn wrap_page(body: &str) -> String {
    format!("{HTML_BEGIN}<pre><code>{body}</code></pre>{HTML_END}")
}

//! Loads [`gtmpl`] templates from disk and renders template values into
//! strings. Also defines how the [`Site`] description is exposed to
//! templates.

use crate::config::Site;
use gtmpl::{Context, Template};
use gtmpl_value::Value;
use pulldown_cmark::escape::escape_html;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Loads the template file contents, joins them with a space, and parses
/// the result into a single template. Concatenation lets a theme share
/// `{{ define }}` blocks between its templates.
pub fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut sources = Vec::new();
    for template_file in template_files {
        let template_file = template_file.as_ref();
        let source =
            std::fs::read_to_string(template_file).map_err(|err| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err,
            })?;
        sources.push(source);
    }

    let mut template = Template::default();
    template
        .parse(&sources.join(" "))
        .map_err(Error::ParseTemplate)?;
    Ok(template)
}

/// Executes `template` against `value` and returns the output.
pub fn render(template: &Template, value: Value) -> std::result::Result<String, String> {
    let context = Context::from(value)?;
    let mut out: Vec<u8> = Vec::new();
    template.execute(&mut out, &context)?;
    String::from_utf8(out).map_err(|e| e.to_string())
}

/// Builds a [`Value::Object`] from `(key, value)` pairs.
pub fn object<I, K>(fields: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Object(
        fields
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<HashMap<String, Value>>(),
    )
}

/// Escapes `&`, `<`, `>`, and `"` so plain text can be spliced into HTML and
/// Atom documents.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // writing into a String can't fail
    let _ = escape_html(&mut out, s);
    out
}

/// Plain text as an escaped [`Value::String`]. Markup that is already HTML
/// (rendered content) should go in as a bare [`Value::String`] instead.
pub fn text(s: &str) -> Value {
    Value::String(escape(s))
}

/// Like [`text`], but [`Value::Nil`] for `None`.
pub fn optional(s: Option<&str>) -> Value {
    match s {
        Some(s) => text(s),
        None => Value::Nil,
    }
}

impl From<&Site> for Value {
    /// Converts the [`Site`] into a template value with fields `title`,
    /// `author`, and `url`, all escaped.
    fn from(site: &Site) -> Value {
        object(vec![
            ("title", text(&site.title)),
            ("author", optional(site.author.as_deref())),
            ("url", text(site.url.as_str())),
        ])
    }
}

/// The result of loading a template.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading a template.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening or reading template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => write!(f, "Parsing template: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_and_render() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let base = dir.path().join("base.html");
        let page = dir.path().join("page.html");
        std::fs::write(&base, r#"{{ define "greeting" }}Hello, {{ . }}!{{ end }}"#)?;
        std::fs::write(&page, r#"{{ template "greeting" .name }}"#)?;

        let template = parse_template(vec![&base, &page].into_iter())?;
        let rendered = render(
            &template,
            object(vec![("name", Value::String("world".to_owned()))]),
        )?;
        assert_eq!(rendered.trim(), "Hello, world!");
        Ok(())
    }

    #[test]
    fn test_text_is_escaped() -> std::result::Result<(), String> {
        let mut template = Template::default();
        template.parse("<title>{{ .title }}</title>{{ .body }}")?;
        let rendered = render(
            &template,
            object(vec![
                ("title", text(r#"Rust & <C> "quoted""#)),
                ("body", Value::String("<p>raw</p>".to_owned())),
            ]),
        )?;
        assert_eq!(
            rendered,
            "<title>Rust &amp; &lt;C&gt; &quot;quoted&quot;</title><p>raw</p>"
        );
        Ok(())
    }

    #[test]
    fn test_parse_template_adds_no_trailing_text() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let page = dir.path().join("page.html");
        std::fs::write(&page, "<ul>{{ .name }}</ul>")?;

        let template = parse_template(std::iter::once(&page))?;
        let rendered = render(
            &template,
            object(vec![("name", Value::String("x".to_owned()))]),
        )?;
        assert_eq!(rendered, "<ul>x</ul>");
        Ok(())
    }

    #[test]
    fn test_missing_template_file() {
        let result = parse_template(vec![Path::new("/nonexistent/post.html")].into_iter());
        assert!(matches!(result, Err(Error::OpenTemplateFile { .. })));
    }

    #[test]
    fn test_range_over_array() -> std::result::Result<(), String> {
        let mut template = Template::default();
        template.parse("{{ range .posts }}[{{ .title }}]{{ end }}")?;
        let post = |title: &str| object(vec![("title", Value::String(title.to_owned()))]);
        let rendered = render(
            &template,
            object(vec![("posts", Value::Array(vec![post("a"), post("b")]))]),
        )?;
        assert_eq!(rendered, "[a][b]");
        Ok(())
    }
}

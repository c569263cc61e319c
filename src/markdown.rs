//! Finds the markdown source inside of a post directory and converts it to
//! HTML with [`crate::htmlrenderer`].

use crate::htmlrenderer::{self, Heading};
use pulldown_cmark::{Options, Parser};
use std::io;
use std::path::{Path, PathBuf};

/// The extension that identifies a post's markdown source.
pub const MARKDOWN_EXTENSION: &str = "md";

/// A rendered markdown document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Content {
    /// The HTML fragment for the document body.
    pub html: String,

    /// The table of contents as HTML (empty if there are no headings).
    pub toc: String,

    /// The headings in document order.
    pub headings: Vec<Heading>,
}

/// Converts markdown to HTML. Fenced code blocks, footnotes, tables,
/// strikethrough, task lists, and smart punctuation are enabled.
pub fn to_html(markdown: &str) -> io::Result<Content> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut html = String::new();
    let headings = htmlrenderer::push_html(&mut html, Parser::new_ext(markdown, options))?;
    Ok(Content {
        toc: htmlrenderer::toc_html(&headings),
        html,
        headings,
    })
}

/// Reads the markdown file at `path` and converts it to HTML.
pub fn render_file(path: &Path) -> io::Result<Content> {
    to_html(&std::fs::read_to_string(path)?)
}

/// Lists the markdown files directly inside of `dir`, sorted by name.
pub fn candidates(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for result in std::fs::read_dir(dir)? {
        let entry = result?;
        let path = entry.path();
        if entry.file_type()?.is_file()
            && path.extension().map_or(false, |ext| ext == MARKDOWN_EXTENSION)
        {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

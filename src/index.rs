//! The HTML index page: one page listing every published post.

use crate::config::Site;
use crate::post::{self, remove_drafts, Post};
use crate::template::{self, object};
use gtmpl::{Template, Value};
use std::fmt;
use std::path::Path;

/// The name of the index page inside of the output root.
pub const INDEX_FILE_NAME: &str = "index.html";

/// A view over the published posts, in the order they were given. Drafts
/// are dropped on construction.
pub struct Index<'p, 'a> {
    template: &'p Template,
    posts: Vec<&'p Post<'a>>,
}

impl<'p, 'a> Index<'p, 'a> {
    /// `posts` should already be ordered; the index doesn't sort.
    pub fn new(template: &'p Template, posts: &'p [Post<'a>]) -> Result<Self> {
        Ok(Index {
            template,
            posts: remove_drafts(posts)?,
        })
    }

    pub fn posts(&self) -> &[&'p Post<'a>] {
        &self.posts
    }

    /// Renders the template with `site` and `posts` (see
    /// [`Post::to_value`]) and writes `{output_root}/index.html`.
    pub fn generate(&self, output_root: &Path, site: &Site) -> Result<()> {
        let posts = self
            .posts
            .iter()
            .map(|post| post.to_value())
            .collect::<post::Result<Vec<Value>>>()?;
        let rendered = template::render(
            self.template,
            object(vec![("site", site.into()), ("posts", Value::Array(posts))]),
        )
        .map_err(Error::Template)?;
        std::fs::write(output_root.join(INDEX_FILE_NAME), rendered)?;
        Ok(())
    }
}

/// The result of an index operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem rendering the index page.
#[derive(Debug)]
pub enum Error {
    /// Returned when one of the listed posts can't be read.
    Post(post::Error),

    /// Returned for errors executing the index template.
    Template(String),

    /// Returned when the index page can't be written.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Post(err) => err.fmt(f),
            Error::Template(err) => write!(f, "Rendering index: {}", err),
            Error::Io(err) => write!(f, "Writing index: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Post(err) => Some(err),
            Error::Template(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<post::Error> for Error {
    /// Converts [`post::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: post::Error) -> Error {
        Error::Post(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test::{site, template, write_post};
    use crate::post::{discover, order};

    #[test]
    fn test_index_lists_published_posts_in_order() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let out = tempfile::tempdir()?;
        write_post(root.path(), "old", "Title: Old\nDate: 2023-01-01\nStatus: published\n", Some("old"));
        write_post(root.path(), "new", "Title: New\nDate: 2024-01-01\nStatus: published\n", Some("new"));
        write_post(root.path(), "wip", "Title: WIP\nDate: 2025-01-01\n", Some("wip"));

        let site = site();
        let post_template = template("{{ .title }}");
        let posts = order(discover(root.path(), &post_template, &site)?)?;

        let index_template = template("{{ .site.title }}:{{ range .posts }}[{{ .name }}]{{ end }}");
        let index = Index::new(&index_template, &posts)?;
        assert_eq!(index.posts().len(), 2);
        index.generate(out.path(), &site)?;

        let rendered = std::fs::read_to_string(out.path().join(INDEX_FILE_NAME))?;
        assert_eq!(rendered, "Test:[new][old]");
        Ok(())
    }

    #[test]
    fn test_empty_index() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let out = tempfile::tempdir()?;
        let site = site();
        let index_template = template("{{ range .posts }}[{{ .name }}]{{ end }}empty");
        let posts: Vec<Post> = Vec::new();
        Index::new(&index_template, &posts)?.generate(out.path(), &site)?;
        assert_eq!(
            std::fs::read_to_string(out.path().join(INDEX_FILE_NAME))?,
            "empty"
        );
        Ok(())
    }
}

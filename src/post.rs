//! Defines the [`Post`] type and the operations over lists of posts:
//! discovering them on disk ([`discover`]), ordering them ([`order`]), and
//! hiding drafts from public listings ([`remove_drafts`]).
//!
//! A post is a directory. It holds a `metadata.txt` (see
//! [`crate::metadata`]), exactly one markdown file, and any number of other
//! files (images, etc.) that are copied verbatim next to the rendered page:
//!
//! ```text
//! posts/
//!   hello-world/
//!     metadata.txt
//!     hello-world.md
//!     diagram.png
//! ```
//!
//! Both the metadata and the rendered content are computed on first access
//! and cached for the lifetime of the [`Post`].

use crate::config::Site;
use crate::markdown::{self, Content};
use crate::metadata::{self, format_date, Metadata, METADATA_FILE_NAME};
use crate::template::{self, object, optional, text};
use gtmpl::{Template, Value};
use spdlog::debug;
use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the rendered page inside of a post's output directory.
pub const PAGE_FILE_NAME: &str = "index.html";

/// A single post, backed by a directory of source files.
pub struct Post<'a> {
    /// The template used to render the post's page.
    template: &'a Template,

    /// Site-wide values made available to the template.
    site: &'a Site,

    /// The source directory.
    directory: PathBuf,

    /// The source directory's name. This is also the name of the output
    /// directory and the last segment of the post's URL.
    name: String,

    metadata: OnceCell<Metadata>,
    content: OnceCell<Content>,
}

impl<'a> Post<'a> {
    /// Creates a post for `directory`. Nothing is read until
    /// [`Post::metadata`] or [`Post::content`] is called.
    pub fn new(template: &'a Template, site: &'a Site, directory: PathBuf) -> Result<Post<'a>> {
        let name = directory
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidDirectoryName(directory.clone()))?
            .to_owned();
        Ok(Post {
            template,
            site,
            directory,
            name,
            metadata: OnceCell::new(),
            content: OnceCell::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The post's parsed `metadata.txt`.
    pub fn metadata(&self) -> Result<&Metadata> {
        if let Some(metadata) = self.metadata.get() {
            return Ok(metadata);
        }
        let metadata = Metadata::read(&self.directory.join(METADATA_FILE_NAME))?;
        Ok(self.metadata.get_or_init(|| metadata))
    }

    /// The post's markdown source rendered to HTML.
    pub fn content(&self) -> Result<&Content> {
        if let Some(content) = self.content.get() {
            return Ok(content);
        }
        let source = self.source()?;
        let content = markdown::render_file(&source).map_err(|err| Error::Io {
            path: source.clone(),
            err,
        })?;
        Ok(self.content.get_or_init(|| content))
    }

    /// The path of the post's single markdown file.
    pub fn source(&self) -> Result<PathBuf> {
        let mut candidates = markdown::candidates(&self.directory).map_err(|err| Error::Io {
            path: self.directory.clone(),
            err,
        })?;
        match candidates.len() {
            0 => Err(Error::NoContentFound(self.directory.clone())),
            1 => Ok(candidates.remove(0)),
            _ => Err(Error::AmbiguousContent {
                directory: self.directory.clone(),
                candidates,
            }),
        }
    }

    /// The public URL of the post's page: `{site.url}/{name}/`.
    pub fn url(&self) -> Result<Url> {
        Ok(self.site.url.join(&format!("{}/", self.name))?)
    }

    /// Converts the post into a template [`Value`]. The result is a
    /// [`Value::Object`] with the fields `name`, `url`, `title`, `author`,
    /// `date`, `date_short`, `updated`, `updated_short`, `status`, `draft`,
    /// `content`, and `toc`. Dates are RFC 3339 strings; the `_short`
    /// variants are `YYYY-MM-DD`. A post without an author falls back to the
    /// site's author. Text fields are HTML-escaped; `content` and `toc` are
    /// markup already.
    pub fn to_value(&self) -> Result<Value> {
        let metadata = self.metadata()?;
        let content = self.content()?;
        let author = metadata.author.as_deref().or(self.site.author.as_deref());
        Ok(object(vec![
            ("name", text(&self.name)),
            ("url", text(self.url()?.as_str())),
            ("title", text(&metadata.title)),
            ("author", optional(author)),
            ("date", Value::String(format_date(&metadata.date))),
            (
                "date_short",
                Value::String(metadata.date.format("%Y-%m-%d").to_string()),
            ),
            ("updated", Value::String(format_date(&metadata.updated))),
            (
                "updated_short",
                Value::String(metadata.updated.format("%Y-%m-%d").to_string()),
            ),
            ("status", text(metadata.status.as_str())),
            ("draft", Value::Bool(metadata.status.is_draft())),
            ("content", Value::String(content.html.clone())),
            ("toc", Value::String(content.toc.clone())),
        ]))
    }

    /// Writes the post into `{output_root}/{name}/`: every source file is
    /// copied verbatim (markdown and metadata included), then the rendered
    /// page is written as `index.html`.
    pub fn generate(&self, output_root: &Path) -> Result<()> {
        let output_directory = output_root.join(&self.name);
        debug!("writing post `{}` to {}", self.name, output_directory.display());
        std::fs::create_dir_all(&output_directory).map_err(|err| Error::Io {
            path: output_directory.clone(),
            err,
        })?;
        self.copy_sources(&output_directory)?;

        let mut value = self.to_value()?;
        if let Value::Object(obj) = &mut value {
            obj.insert("site".to_owned(), self.site.into());
        }
        let rendered = template::render(self.template, value).map_err(|err| Error::Template {
            name: self.name.clone(),
            err,
        })?;

        let page = output_directory.join(PAGE_FILE_NAME);
        std::fs::write(&page, rendered).map_err(|err| Error::Io { path: page, err })
    }

    fn copy_sources(&self, output_directory: &Path) -> Result<()> {
        use walkdir::WalkDir;
        for result in WalkDir::new(&self.directory).min_depth(1) {
            let entry = result?;
            // strip_prefix shouldn't fail since `self.directory` is always an
            // ancestor of the entry
            let relative = match entry.path().strip_prefix(&self.directory) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let destination = output_directory.join(relative);
            let io_err = |err| Error::Io {
                path: destination.clone(),
                err,
            };
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&destination).map_err(io_err)?;
            } else {
                std::fs::copy(entry.path(), &destination).map_err(io_err)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Post<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Post")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .finish()
    }
}

/// Creates one [`Post`] per immediate subdirectory of `root`, in name order.
/// Files directly inside of `root` are ignored.
pub fn discover<'a>(root: &Path, template: &'a Template, site: &'a Site) -> Result<Vec<Post<'a>>> {
    let io_err = |err| Error::Io {
        path: root.to_owned(),
        err,
    };

    let mut directories = Vec::new();
    for result in std::fs::read_dir(root).map_err(io_err)? {
        let entry = result.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_dir() {
            directories.push(entry.path());
        } else {
            debug!("skipping `{}`: not a post directory", entry.path().display());
        }
    }
    directories.sort();

    directories
        .into_iter()
        .map(|directory| Post::new(template, site, directory))
        .collect()
}

/// Sorts posts by date, most recent first. The sort is stable, so posts with
/// the same date keep their relative order. Every post's metadata is parsed
/// here, so a broken `metadata.txt` surfaces before anything is written.
pub fn order(posts: Vec<Post>) -> Result<Vec<Post>> {
    let mut dated = posts
        .into_iter()
        .map(|post| -> Result<_> {
            let date = post.metadata()?.date;
            Ok((date, post))
        })
        .collect::<Result<Vec<_>>>()?;
    dated.sort_by(|(a, _), (b, _)| b.cmp(a));
    Ok(dated.into_iter().map(|(_, post)| post).collect())
}

/// Returns the posts that aren't drafts, preserving their order.
pub fn remove_drafts<'p, 'a>(posts: &'p [Post<'a>]) -> Result<Vec<&'p Post<'a>>> {
    let mut published = Vec::with_capacity(posts.len());
    for post in posts {
        if !post.metadata()?.status.is_draft() {
            published.push(post);
        }
    }
    Ok(published)
}

/// Represents the result of a [`Post`] operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading or writing a [`Post`].
#[derive(Debug)]
pub enum Error {
    /// Returned when `metadata.txt` can't be read or interpreted.
    Metadata(metadata::Error),

    /// Returned when a post directory has no markdown file.
    NoContentFound(PathBuf),

    /// Returned when a post directory has more than one markdown file.
    AmbiguousContent {
        directory: PathBuf,
        candidates: Vec<PathBuf>,
    },

    /// Returned when a post directory's name isn't valid UTF-8.
    InvalidDirectoryName(PathBuf),

    /// Returned when the post's URL can't be built from the site URL.
    UrlParse(url::ParseError),

    /// Returned for errors executing the post template.
    Template { name: String, err: String },

    /// Returned for I/O problems with a specific path.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned for WalkDir I/O errors while copying source files.
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Metadata(err) => err.fmt(f),
            Error::NoContentFound(directory) => {
                write!(f, "There is no markdown file in `{}`", directory.display())
            }
            Error::AmbiguousContent {
                directory,
                candidates,
            } => write!(
                f,
                "There is more than one markdown file in `{}`: {:?}",
                directory.display(),
                candidates
            ),
            Error::InvalidDirectoryName(directory) => {
                write!(f, "invalid post directory name: {:?}", directory)
            }
            Error::UrlParse(err) => err.fmt(f),
            Error::Template { name, err } => {
                write!(f, "Rendering post `{}`: {}", name, err)
            }
            Error::Io { path, err } => write!(f, "{}: {}", path.display(), err),
            Error::WalkDir(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Metadata(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::Io { path: _, err } => Some(err),
            Error::WalkDir(err) => Some(err),
            _ => None,
        }
    }
}

impl From<metadata::Error> for Error {
    /// Converts a [`metadata::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for metadata parsing.
    fn from(err: metadata::Error) -> Error {
        Error::Metadata(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator while walking source directories.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::metadata::Status;
    use std::fs;
    use tempfile::TempDir;

    pub(crate) fn site() -> Site {
        Site {
            title: "Test".to_owned(),
            author: Some("Site Author".to_owned()),
            url: Url::parse("https://example.org/blog/").unwrap(),
        }
    }

    pub(crate) fn template(text: &str) -> Template {
        let mut template = Template::default();
        template.parse(text).unwrap();
        template
    }

    /// Writes a post directory named `name` under `root`.
    pub(crate) fn write_post(root: &Path, name: &str, metadata: &str, markdown: Option<&str>) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(METADATA_FILE_NAME), metadata).unwrap();
        if let Some(markdown) = markdown {
            fs::write(dir.join(format!("{}.md", name)), markdown).unwrap();
        }
    }

    fn posts_root() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_metadata_is_memoized() -> Result<()> {
        let root = posts_root();
        write_post(root.path(), "hello", "Title: Hello\nDate: 2024-01-01\n", Some("Hi"));
        let site = site();
        let template = template("{{ .title }}");
        let post = Post::new(&template, &site, root.path().join("hello"))?;

        let first = post.metadata()? as *const Metadata;
        // the cached value survives the source disappearing
        fs::remove_file(root.path().join("hello").join(METADATA_FILE_NAME)).unwrap();
        let second = post.metadata()? as *const Metadata;
        assert_eq!(first, second);
        assert_eq!(post.metadata()?.status, Status::Draft);
        Ok(())
    }

    #[test]
    fn test_no_content_found() -> Result<()> {
        let root = posts_root();
        write_post(root.path(), "empty", "Title: Empty\nDate: 2024-01-01\n", None);
        let site = site();
        let template = template("{{ .title }}");
        let post = Post::new(&template, &site, root.path().join("empty"))?;
        assert!(matches!(post.content(), Err(Error::NoContentFound(_))));
        Ok(())
    }

    #[test]
    fn test_ambiguous_content() -> Result<()> {
        let root = posts_root();
        write_post(root.path(), "two", "Title: Two\nDate: 2024-01-01\n", Some("one"));
        fs::write(root.path().join("two").join("other.md"), "two").unwrap();
        let site = site();
        let template = template("{{ .title }}");
        let post = Post::new(&template, &site, root.path().join("two"))?;
        match post.content() {
            Err(Error::AmbiguousContent { candidates, .. }) => assert_eq!(candidates.len(), 2),
            other => panic!("expected AmbiguousContent, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_single_markdown_file_renders() -> Result<()> {
        let root = posts_root();
        write_post(
            root.path(),
            "one",
            "Title: One\nDate: 2024-01-01\n",
            Some("## Intro\n\nHello *there*.\n"),
        );
        let site = site();
        let template = template("{{ .title }}");
        let post = Post::new(&template, &site, root.path().join("one"))?;
        let content = post.content()?;
        assert!(content.html.contains(r#"<h2 id="intro">Intro</h2>"#));
        assert!(content.html.contains("<em>there</em>"));
        Ok(())
    }

    #[test]
    fn test_metadata_errors_propagate() -> Result<()> {
        let root = posts_root();
        write_post(root.path(), "bad", "Title Missing colon\n", Some("x"));
        let site = site();
        let template = template("{{ .title }}");
        let post = Post::new(&template, &site, root.path().join("bad"))?;
        assert!(matches!(
            post.metadata(),
            Err(Error::Metadata(metadata::Error::Malformed { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_generate() -> Result<()> {
        let root = posts_root();
        let out = tempfile::tempdir().unwrap();
        write_post(
            root.path(),
            "hello",
            "Title: Hello\nDate: 2024-01-01\nStatus: published\n",
            Some("Body text\n"),
        );
        fs::create_dir(root.path().join("hello").join("img")).unwrap();
        fs::write(root.path().join("hello").join("img").join("a.png"), b"png").unwrap();

        let site = site();
        let template = template(
            "{{ .title }}|{{ .author }}|{{ .date }}|{{ .updated }}|{{ .status }}|{{ .url }}|{{ .site.title }}|{{ .content }}",
        );
        let post = Post::new(&template, &site, root.path().join("hello"))?;
        post.generate(out.path())?;

        let dir = out.path().join("hello");
        let page = fs::read_to_string(dir.join(PAGE_FILE_NAME)).unwrap();
        assert_eq!(
            page.trim(),
            "Hello|Site Author|2024-01-01T00:00:00Z|2024-01-01T00:00:00Z|published|https://example.org/blog/hello/|Test|<p>Body text</p>"
        );
        assert_eq!(
            fs::read_to_string(dir.join("hello.md")).unwrap(),
            "Body text\n"
        );
        assert!(dir.join(METADATA_FILE_NAME).is_file());
        assert_eq!(fs::read(dir.join("img").join("a.png")).unwrap(), b"png");
        Ok(())
    }

    #[test]
    fn test_generate_escapes_text_fields() -> Result<()> {
        let root = posts_root();
        let out = tempfile::tempdir().unwrap();
        write_post(
            root.path(),
            "amp",
            "Title: Rust & <C>\nAuthor: Tom & Jerry\nDate: 2024-01-01\n",
            Some("Fish & chips\n"),
        );

        let site = site();
        let template = template("<h1>{{ .title }}</h1>{{ .author }}{{ .content }}");
        let post = Post::new(&template, &site, root.path().join("amp"))?;
        post.generate(out.path())?;

        let page = fs::read_to_string(out.path().join("amp").join(PAGE_FILE_NAME)).unwrap();
        assert_eq!(
            page.trim(),
            "<h1>Rust &amp; &lt;C&gt;</h1>Tom &amp; Jerry<p>Fish &amp; chips</p>"
        );
        Ok(())
    }

    #[test]
    fn test_discover_only_directories() -> Result<()> {
        let root = posts_root();
        write_post(root.path(), "b", "Title: B\nDate: 2024-01-01\n", Some("b"));
        write_post(root.path(), "a", "Title: A\nDate: 2024-01-01\n", Some("a"));
        fs::write(root.path().join("README"), "not a post").unwrap();

        let site = site();
        let template = template("{{ .title }}");
        let posts = discover(root.path(), &template, &site)?;
        let names: Vec<&str> = posts.iter().map(Post::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        Ok(())
    }

    #[test]
    fn test_order_is_descending_and_stable() -> Result<()> {
        let root = posts_root();
        write_post(root.path(), "a", "Title: A\nDate: 2024-01-01\n", None);
        write_post(root.path(), "b", "Title: B\nDate: 2024-06-01\n", None);
        write_post(root.path(), "c", "Title: C\nDate: 2024-01-01\n", None);
        write_post(root.path(), "d", "Title: D\nDate: 2023-12-31T23:00:00-02:00\n", None);

        let site = site();
        let template = template("{{ .title }}");
        let posts = order(discover(root.path(), &template, &site)?)?;
        let names: Vec<&str> = posts.iter().map(Post::name).collect();
        // `d` is 2024-01-01T01:00:00Z
        assert_eq!(names, vec!["b", "d", "a", "c"]);
        Ok(())
    }

    #[test]
    fn test_remove_drafts_preserves_order() -> Result<()> {
        let root = posts_root();
        write_post(root.path(), "a", "Title: A\nDate: 2024-01-01\nStatus: published\n", None);
        write_post(root.path(), "b", "Title: B\nDate: 2024-01-02\n", None);
        write_post(root.path(), "c", "Title: C\nDate: 2024-01-03\nStatus: draft\n", None);
        write_post(root.path(), "d", "Title: D\nDate: 2024-01-04\nStatus: hidden\n", None);

        let site = site();
        let template = template("{{ .title }}");
        let posts = discover(root.path(), &template, &site)?;
        let published = remove_drafts(&posts)?;
        let names: Vec<&str> = published.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "d"]);
        Ok(())
    }
}

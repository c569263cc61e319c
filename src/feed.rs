//! The Atom feed. Like the index page it only lists published posts, and it
//! additionally carries a feed-wide `updated` timestamp. The document itself
//! comes from a template; before it's written we parse it back with
//! [`atom_syndication`] so a broken theme fails the build instead of feed
//! readers.

use crate::config::Site;
use crate::metadata::format_date;
use crate::post::{self, remove_drafts, Post};
use crate::template::{self, object};
use atom_syndication::Error as AtomError;
use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use gtmpl::{Template, Value};
use std::fmt;
use std::path::Path;

/// The name of the feed document inside of the output root.
pub const ATOM_FILE_NAME: &str = "atom.xml";

/// The source of "now" for feeds without any published posts.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system's wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// An Atom feed over the published posts, in the order they were given.
pub struct Atom<'p, 'a> {
    template: &'p Template,
    posts: Vec<&'p Post<'a>>,
    updated: DateTime<FixedOffset>,
}

impl<'p, 'a> Atom<'p, 'a> {
    /// Drops drafts from `posts` and computes [`Atom::updated`].
    ///
    /// `posts` must be ordered most recent first (see [`post::order`]): the
    /// feed's `updated` is taken from the first published post.
    pub fn new(template: &'p Template, posts: &'p [Post<'a>], clock: &dyn Clock) -> Result<Self> {
        let posts = remove_drafts(posts)?;
        let updated = match posts.first() {
            Some(latest) => latest.metadata()?.updated,
            None => clock.now().trunc_subsecs(0).into(),
        };
        Ok(Atom {
            template,
            posts,
            updated,
        })
    }

    pub fn posts(&self) -> &[&'p Post<'a>] {
        &self.posts
    }

    /// The first published post's `updated`, or the current UTC time with
    /// the sub-second part cut off when nothing is published.
    pub fn updated(&self) -> DateTime<FixedOffset> {
        self.updated
    }

    /// Renders the template with `site`, `updated` (RFC 3339), and `posts`
    /// (see [`Post::to_value`]), checks that the output is an Atom document,
    /// and writes `{output_root}/atom.xml`.
    pub fn generate(&self, output_root: &Path, site: &Site) -> Result<()> {
        let posts = self
            .posts
            .iter()
            .map(|post| post.to_value())
            .collect::<post::Result<Vec<Value>>>()?;
        let rendered = template::render(
            self.template,
            object(vec![
                ("site", site.into()),
                ("updated", Value::String(format_date(&self.updated))),
                ("posts", Value::Array(posts)),
            ]),
        )
        .map_err(Error::Template)?;

        atom_syndication::Feed::read_from(rendered.as_bytes()).map_err(Error::InvalidAtom)?;

        std::fs::write(output_root.join(ATOM_FILE_NAME), rendered)?;
        Ok(())
    }
}

/// The result of a feed operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating the feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when one of the listed posts can't be read.
    Post(post::Error),

    /// Returned for errors executing the feed template.
    Template(String),

    /// Returned when the template's output isn't a valid Atom document.
    InvalidAtom(AtomError),

    /// Returned when the feed can't be written.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Post(err) => err.fmt(f),
            Error::Template(err) => write!(f, "Rendering feed: {}", err),
            Error::InvalidAtom(err) => write!(f, "Feed template produced invalid Atom: {}", err),
            Error::Io(err) => write!(f, "Writing feed: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Post(err) => Some(err),
            Error::Template(_) => None,
            Error::InvalidAtom(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<post::Error> for Error {
    /// Converts [`post::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: post::Error) -> Error {
        Error::Post(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test::{site, template, write_post};
    use crate::post::{discover, order};
    use chrono::TimeZone;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn fixed_clock() -> FixedClock {
        FixedClock(
            Utc.with_ymd_and_hms(2024, 7, 1, 12, 30, 45).unwrap()
                + chrono::Duration::nanoseconds(999_999_999),
        )
    }

    const ATOM_TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
<title>{{ .site.title }}</title>
<id>{{ .site.url }}</id>
<updated>{{ .updated }}</updated>
{{ range .posts }}<entry>
<title>{{ .title }}</title>
<id>{{ .url }}</id>
<updated>{{ .updated }}</updated>
</entry>
{{ end }}</feed>
"#;

    #[test]
    fn test_empty_feed_uses_truncated_now() -> TestResult {
        let template = template(ATOM_TEMPLATE);
        let posts: Vec<Post> = Vec::new();
        let atom = Atom::new(&template, &posts, &fixed_clock())?;
        let expected = Utc.with_ymd_and_hms(2024, 7, 1, 12, 30, 45).unwrap();
        assert_eq!(atom.updated(), expected);
        assert_eq!(format_date(&atom.updated()), "2024-07-01T12:30:45Z");
        Ok(())
    }

    #[test]
    fn test_updated_comes_from_first_published_post() -> TestResult {
        let root = tempfile::tempdir()?;
        write_post(
            root.path(),
            "older",
            "Title: Older\nDate: 2024-01-01\nUpdated: 2024-05-01T10:00:00+02:00\nStatus: published\n",
            Some("older"),
        );
        write_post(
            root.path(),
            "newer",
            "Title: Newer\nDate: 2024-03-01\nUpdated: 2024-03-02T08:00:00Z\nStatus: published\n",
            Some("newer"),
        );
        write_post(root.path(), "draft", "Title: Draft\nDate: 2024-06-01\n", Some("draft"));

        let site = site();
        let post_template = template("{{ .title }}");
        let posts = order(discover(root.path(), &post_template, &site)?)?;
        let atom_template = template(ATOM_TEMPLATE);
        let atom = Atom::new(&atom_template, &posts, &fixed_clock())?;

        let names: Vec<&str> = atom.posts().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["newer", "older"]);
        assert_eq!(format_date(&atom.updated()), "2024-03-02T08:00:00Z");
        Ok(())
    }

    #[test]
    fn test_generate_writes_valid_atom() -> TestResult {
        let root = tempfile::tempdir()?;
        let out = tempfile::tempdir()?;
        write_post(
            root.path(),
            "hello",
            "Title: Hello\nDate: 2024-01-01\nStatus: published\n",
            Some("hello"),
        );
        write_post(root.path(), "secret", "Title: Secret\nDate: 2024-02-01\n", Some("secret"));

        let site = site();
        let post_template = template("{{ .title }}");
        let posts = order(discover(root.path(), &post_template, &site)?)?;
        let atom_template = template(ATOM_TEMPLATE);
        Atom::new(&atom_template, &posts, &fixed_clock())?.generate(out.path(), &site)?;

        let xml = std::fs::read_to_string(out.path().join(ATOM_FILE_NAME))?;
        assert!(xml.contains("<updated>2024-01-01T00:00:00Z</updated>"));
        assert!(xml.contains("<id>https://example.org/blog/hello/</id>"));
        assert!(!xml.contains("Secret"));
        Ok(())
    }

    #[test]
    fn test_generate_escapes_titles() -> TestResult {
        let root = tempfile::tempdir()?;
        let out = tempfile::tempdir()?;
        write_post(
            root.path(),
            "amp",
            "Title: Rust & <C>\nDate: 2024-01-01\nStatus: published\n",
            Some("amp"),
        );

        let site = site();
        let post_template = template("{{ .title }}");
        let posts = order(discover(root.path(), &post_template, &site)?)?;
        let atom_template = template(ATOM_TEMPLATE);
        Atom::new(&atom_template, &posts, &fixed_clock())?.generate(out.path(), &site)?;

        let xml = std::fs::read_to_string(out.path().join(ATOM_FILE_NAME))?;
        assert!(xml.contains("<title>Rust &amp; &lt;C&gt;</title>"));
        Ok(())
    }

    #[test]
    fn test_invalid_atom_is_rejected() -> TestResult {
        let out = tempfile::tempdir()?;
        let site = site();
        let template = template("<html>not a feed</html>");
        let posts: Vec<Post> = Vec::new();
        let result = Atom::new(&template, &posts, &fixed_clock())?.generate(out.path(), &site);
        assert!(matches!(result, Err(Error::InvalidAtom(_))));
        assert!(!out.path().join(ATOM_FILE_NAME).exists());
        Ok(())
    }
}

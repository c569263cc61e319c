//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output site: discovering and ordering the posts
//! ([`crate::post`]), recreating the output directory, writing every post
//! page, rendering the index page ([`crate::index`]) and the Atom feed
//! ([`crate::feed`]), and finally copying the shared static assets.

use crate::config::Config;
use crate::feed::{self, Atom, Clock};
use crate::index::{self, Index};
use crate::post::{self, discover, order};
use crate::template::{self, parse_template};
use spdlog::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

/// Builds the site described by `config`. Any failure aborts the build; the
/// output directory is then left incomplete until the next successful run.
pub fn build_site(config: &Config, clock: &dyn Clock) -> Result<()> {
    // Parse the templates first so a theme typo fails before the output
    // directory is touched.
    let post_template = parse_template(config.post_template.iter())?;
    let feed_template = parse_template(config.feed_template.iter())?;
    let atom_template = parse_template(config.atom_template.iter())?;

    info!("collecting posts from {}", config.posts_directory.display());
    let posts = order(discover(
        &config.posts_directory,
        &post_template,
        &config.site,
    )?)?;

    let output = &config.output_directory;
    recreate(output)?;

    info!("writing {} posts", posts.len());
    for post in &posts {
        post.generate(output)?;
    }

    let index = Index::new(&feed_template, &posts)?;
    info!("writing index with {} posts", index.posts().len());
    index.generate(output, &config.site)?;

    let atom = Atom::new(&atom_template, &posts, clock)?;
    info!("writing feed updated at {}", atom.updated().to_rfc3339());
    atom.generate(output, &config.site)?;

    copy_static_assets(&config.share_directory, output)?;

    info!("site written to {}", output.display());
    Ok(())
}

/// Removes `dir` and everything in it (if it exists) and creates it empty.
pub fn recreate(dir: &Path) -> Result<()> {
    debug!("recreating {}", dir.display());
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            })
        }
    }
    std::fs::create_dir_all(dir).map_err(|err| Error::Io {
        path: dir.to_owned(),
        err,
    })
}

/// Copies every regular file directly inside of `src` into `dst`, replacing
/// files of the same name. Subdirectories are not copied. A missing `src` is
/// skipped with a warning.
pub fn copy_static_assets(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        warn!("no static assets: {} is not a directory", src.display());
        return Ok(());
    }

    let io_err = |path: &Path| {
        let path = path.to_owned();
        move |err| Error::Io { path, err }
    };
    for entry in std::fs::read_dir(src).map_err(io_err(src))? {
        let entry = entry.map_err(io_err(src))?;
        let source = entry.path();
        if !entry.file_type().map_err(io_err(&source))?.is_file() {
            debug!("skipping static asset {}: not a file", source.display());
            continue;
        }
        let destination = dst.join(entry.file_name());
        debug!("copying {} to {}", source.display(), destination.display());
        std::fs::copy(&source, &destination).map_err(io_err(&destination))?;
    }
    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during template loading,
/// post parsing or writing, index or feed rendering, cleaning the output
/// directory, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors loading templates.
    Template(template::Error),

    /// Returned for errors reading or writing posts.
    Post(post::Error),

    /// Returned for errors writing the index page.
    Index(index::Error),

    /// Returned for errors writing the feed.
    Feed(feed::Error),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for other I/O errors.
    Io { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Post(err) => err.fmt(f),
            Error::Index(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Io { path, err } => write!(f, "{}: {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(err) => Some(err),
            Error::Post(err) => Some(err),
            Error::Index(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::Io { path: _, err } => Some(err),
        }
    }
}

impl From<template::Error> for Error {
    /// Converts [`template::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}

impl From<post::Error> for Error {
    /// Converts [`post::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: post::Error) -> Error {
        Error::Post(err)
    }
}

impl From<index::Error> for Error {
    /// Converts [`index::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: index::Error) -> Error {
        Error::Index(err)
    }
}

impl From<feed::Error> for Error {
    /// Converts [`feed::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: feed::Error) -> Error {
        Error::Feed(err)
    }
}

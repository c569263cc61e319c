//! Loads the project configuration from `scriptorium.yaml`. Every key is
//! optional, so a project without the file builds with the defaults:
//!
//! ```yaml
//! title: Blog
//! author: Jane Doe
//! site_url: https://blog.example.org/
//! posts_directory: posts
//! templates_directory: templates
//! share_directory: share
//! output_directory: remote
//! templates:
//!   post: [post.html]
//!   feed: [feed.html]
//!   atom: [atom.xml]
//! log_level: info
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE_NAME: &str = "scriptorium.yaml";

const DEFAULT_SITE_URL: &str = "http://localhost/";

/// How chatty the logger is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Critical,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct Templates {
    post: Vec<PathBuf>,
    feed: Vec<PathBuf>,
    atom: Vec<PathBuf>,
}

impl Default for Templates {
    fn default() -> Self {
        Templates {
            post: vec![PathBuf::from("post.html")],
            feed: vec![PathBuf::from("feed.html")],
            atom: vec![PathBuf::from("atom.xml")],
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct Project {
    title: String,
    author: Option<String>,
    site_url: Option<Url>,
    posts_directory: PathBuf,
    templates_directory: PathBuf,
    share_directory: PathBuf,
    output_directory: PathBuf,
    templates: Templates,
    log_level: LogLevel,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            title: String::from("Blog"),
            author: None,
            site_url: None,
            posts_directory: PathBuf::from("posts"),
            templates_directory: PathBuf::from("templates"),
            share_directory: PathBuf::from("share"),
            output_directory: PathBuf::from("remote"),
            templates: Templates::default(),
            log_level: LogLevel::default(),
        }
    }
}

/// What templates get to know about the site as a whole.
#[derive(Clone, Debug, PartialEq)]
pub struct Site {
    pub title: String,

    /// The default author for posts that don't name one.
    pub author: Option<String>,

    /// The public base URL. Post URLs are `{url}/{post_name}/`.
    pub url: Url,
}

/// The resolved configuration for a build.
#[derive(Clone, Debug)]
pub struct Config {
    pub site: Site,

    /// The directory whose subdirectories are the posts.
    pub posts_directory: PathBuf,

    /// Files copied flat into the output root.
    pub share_directory: PathBuf,

    /// Recreated from scratch on every build.
    pub output_directory: PathBuf,

    pub post_template: Vec<PathBuf>,
    pub feed_template: Vec<PathBuf>,
    pub atom_template: Vec<PathBuf>,

    pub log_level: LogLevel,
}

impl Config {
    /// Searches `dir` and then its ancestors for `scriptorium.yaml` and loads
    /// the first one found. Without a project file, `dir` is taken as the
    /// project root and every setting keeps its default.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let dir = dir
            .canonicalize()
            .with_context(|| format!("Resolving project directory `{}`", dir.display()))?;
        let dir = dir.as_path();
        let mut current = Some(dir);
        while let Some(candidate) = current {
            let path = candidate.join(PROJECT_FILE_NAME);
            if path.is_file() {
                return Config::from_project_file(&path)
                    .with_context(|| format!("Loading configuration from `{}`", path.display()));
            }
            current = candidate.parent();
        }
        Config::resolve(dir, Project::default())
    }

    /// Loads the project file at `path`.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path)
            .map_err(|e| anyhow!("Opening project file `{}`: {}", path.display(), e))?;
        let project: Project = serde_yaml::from_reader(file)?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Config::resolve(project_root, project),
        }
    }

    /// Parses a project file's contents, resolving paths against `root`.
    pub fn from_yaml(root: &Path, yaml: &str) -> Result<Config> {
        let project: Project = serde_yaml::from_str(yaml)?;
        Config::resolve(root, project)
    }

    fn resolve(root: &Path, project: Project) -> Result<Config> {
        let url = match project.site_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_SITE_URL)?,
        };
        let templates_directory = root.join(&project.templates_directory);
        let in_templates = |files: &[PathBuf]| -> Vec<PathBuf> {
            files.iter().map(|f| templates_directory.join(f)).collect()
        };
        Ok(Config {
            site: Site {
                title: project.title,
                author: project.author,
                url,
            },
            posts_directory: root.join(&project.posts_directory),
            share_directory: root.join(&project.share_directory),
            output_directory: root.join(&project.output_directory),
            post_template: in_templates(&project.templates.post),
            feed_template: in_templates(&project.templates.feed),
            atom_template: in_templates(&project.templates.atom),
            log_level: project.log_level,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::from_directory(dir.path())?;
        let root = dir.path().canonicalize()?;
        assert_eq!(config.site.title, "Blog");
        assert_eq!(config.site.url.as_str(), "http://localhost/");
        assert_eq!(config.posts_directory, root.join("posts"));
        assert_eq!(config.share_directory, root.join("share"));
        assert_eq!(config.output_directory, root.join("remote"));
        assert_eq!(
            config.post_template,
            vec![root.join("templates").join("post.html")]
        );
        assert_eq!(config.log_level, LogLevel::Info);
        Ok(())
    }

    #[test]
    fn test_from_yaml() -> Result<()> {
        let root = Path::new("/srv/blog");
        let config = Config::from_yaml(
            root,
            "title: Notes\n\
             author: Jane Doe\n\
             site_url: https://example.org/blog/\n\
             output_directory: /tmp/out\n\
             templates:\n  post: [base.html, post.html]\n\
             log_level: debug\n",
        )?;
        assert_eq!(config.site.title, "Notes");
        assert_eq!(config.site.author.as_deref(), Some("Jane Doe"));
        assert_eq!(config.site.url.as_str(), "https://example.org/blog/");
        assert_eq!(config.output_directory, PathBuf::from("/tmp/out"));
        assert_eq!(
            config.post_template,
            vec![
                root.join("templates/base.html"),
                root.join("templates/post.html")
            ]
        );
        assert_eq!(
            config.feed_template,
            vec![root.join("templates/feed.html")]
        );
        assert_eq!(config.log_level, LogLevel::Debug);
        Ok(())
    }

    #[test]
    fn test_searches_parent_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(PROJECT_FILE_NAME), "title: Found\n")?;
        let nested = dir.path().join("posts").join("hello");
        std::fs::create_dir_all(&nested)?;

        let config = Config::from_directory(&nested)?;
        assert_eq!(config.site.title, "Found");
        assert_eq!(config.posts_directory, dir.path().canonicalize()?.join("posts"));
        Ok(())
    }

    #[test]
    fn test_invalid_project_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(PROJECT_FILE_NAME), "site_url: not a url\n")?;
        assert!(Config::from_directory(dir.path()).is_err());
        Ok(())
    }
}

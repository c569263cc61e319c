//! The library code for the `scriptorium` static blog generator. A build is
//! a single pass over a directory of posts:
//!
//! 1. Discover the post directories and parse their metadata
//!    ([`crate::post`], [`crate::metadata`])
//! 2. Order the posts by date, most recent first
//! 3. Recreate the output directory and write every post page, drafts
//!    included, so drafts stay reachable by direct link
//! 4. Render the index page ([`crate::index`]) and the Atom feed
//!    ([`crate::feed`]) over the published posts only
//! 5. Copy the shared static assets
//!
//! [`crate::build::build_site`] drives these steps.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
pub mod htmlrenderer;
pub mod index;
pub mod logger;
pub mod markdown;
pub mod metadata;
pub mod post;
pub mod template;

//! issuemark-core: the annotation engine behind `issuemark`.
//!
//! Turns a repository's open issues into line annotations for one source
//! file. Issues reference code through a blob URL in their body
//! (`https://<host>/<owner>/<repo>/blob/<ref>/<path>#L<N>[-L<M>]`).
//!
//! Data flows fetcher → indexer → presentation:
//!
//! - [`fetch::IssueFetcher`] reads the [`cache::CacheStore`] and falls back to an
//!   [`fetch::IssueSource`] (the GitHub REST API in production).
//! - [`index::build_index`] groups the issues by file and maps lines to issues.
//! - [`reference`] parses and strips the embedded URLs.
//!
//! Storage goes through the [`kv::KvStore`] capability; [`db::SqliteKv`] is the
//! persistent implementation.

pub mod cache;
pub mod db;
pub mod fetch;
pub mod index;
pub mod kv;
pub mod location;
pub mod reference;
pub mod schema;
pub mod settings;
pub mod types;

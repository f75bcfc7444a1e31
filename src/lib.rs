//! kaze: a CMS-backed blog service with anonymous engagement.
//!
//! Content pages come from a headless CMS; reactions, bookmarks, and view
//! counts live in Postgres with a local JSON fallback store that keeps the
//! toggle surface usable when the database is unreachable.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;

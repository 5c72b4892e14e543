//! YTFS — a FUSE filesystem exposing a remote video search service as a
//! two-level directory tree: one directory per live query, one file per
//! result, plus two control files that page the query forward and back.

pub mod cli;
pub mod config;
pub mod error;
pub mod frontend;
pub mod handles;
pub mod mount;
pub mod path;
pub mod resolver;
pub mod resultset;
pub mod store;

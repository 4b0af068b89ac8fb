//! Core library for the ontrack habit & time tracker.
//!
//! Everything stateful lives behind [`db::Database`] (a thin wrapper over a
//! `rusqlite` connection); [`csv_io`] implements the flat-file export/import
//! pipeline on top of it.

pub mod csv_io;
pub mod db;
pub mod error;
pub mod models;

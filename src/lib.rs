//! Quill: a small blog with popularity and freshness rankings.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;

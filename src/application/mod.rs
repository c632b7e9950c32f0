//! Application services layer.

pub mod blog;
pub mod chrome;
pub mod error;
pub mod listing;
pub mod repos;
pub mod site;

//! Yatube - a small blogging platform
//!
//! Authors write posts, file them under groups, comment and follow each
//! other. Pages are rendered on the server.

pub mod cache;
pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod render;
pub mod services;
pub mod web;

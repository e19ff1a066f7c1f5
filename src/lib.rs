//! Vitrine - a content-managed membership and media site backend
//!
//! Media items, galleries, member profiles and page sections whose images
//! live on a remote asset host, edited through server-held media dialogs.

pub mod api;
pub mod assets;
pub mod config;
pub mod db;
pub mod media;
pub mod models;
pub mod services;

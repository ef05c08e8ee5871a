//! Animal Family: a pet-community bulletin board for a Telegram mini-app,
//! backed by a hosted Postgres/storage service.

pub mod backend;
pub mod bridge;
pub mod config;
pub mod geo;
pub mod identity_sync;
pub mod model;
pub mod pages;
pub mod view;

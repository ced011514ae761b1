pub mod clock;
pub mod error;
pub mod liveness;
pub mod program;
pub mod schedule;

pub mod db;
pub mod store;

pub mod service;
pub mod youtube;

pub mod seed;
pub mod watch;

pub mod config;
pub mod reply;
pub mod server;

pub use error::{Error, Result};

pub mod api;
pub mod assets;
pub mod auth;
pub mod cli;
pub mod collection;
pub mod config;
pub mod error;
pub mod geo;
pub mod mock;
pub mod resources;
pub mod view;

pub use error::{ClientError, ClientResult};

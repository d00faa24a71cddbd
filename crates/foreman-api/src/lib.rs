//! Control plane of the foreman agent.
//!
//! [`HttpApi`] mounts the work routes over any [`ApiHandler`]; [`BossAdapter`]
//! is the handler backed by a live [`foreman_core::Boss`].
mod error;
pub use error::ApiError;

mod handler;
pub use handler::ApiHandler;

mod adapter;
pub use adapter::BossAdapter;

mod http;
pub use http::HttpApi;

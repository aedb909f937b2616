//! Avatar URL resolution
//!
//! Most providers encode the avatar in the payload itself. Facebook requires
//! a call to its graph endpoint, performed through a [`JsonFetcher`].

mod fetch;
mod resolver;

pub use fetch::{FetchError, HttpJsonFetcher, JsonFetcher};
pub use resolver::resolve_avatar;

//! Resource API access: request descriptions, the retrying executor, and cursor pagination.

pub mod executor;
pub mod paginate;
pub mod request;
pub mod resources;

pub use executor::*;
pub use paginate::*;
pub use request::*;
pub use resources::*;

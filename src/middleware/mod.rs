pub mod auth;
pub mod rate_limit;

pub use rate_limit::{TRACKING_BURST, auth_rate_limiter, tracking_rate_limiter};

//! Storage-independent rules: order status machine, staff hierarchy,
//! public identifiers and one-time tokens.

pub mod order_status;
pub mod role;
pub mod snapshot;
pub mod token;
pub mod tracking_id;

pub use order_status::{OrderStatus, PaymentStatus, TransitionPolicy};
pub use role::{Role, SessionMode};

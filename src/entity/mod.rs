pub mod announcements;
pub mod audit_logs;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod tracking_events;
pub mod users;
pub mod wishlist_items;

pub use announcements::Entity as Announcements;
pub use audit_logs::Entity as AuditLogs;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use tracking_events::Entity as TrackingEvents;
pub use users::Entity as Users;
pub use wishlist_items::Entity as WishlistItems;

pub mod admin;
pub mod announcements;
pub mod auth;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod wishlist;

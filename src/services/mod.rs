pub mod admin_service;
pub mod announcement_service;
pub mod auth_service;
pub mod checkout_service;
pub mod order_service;
pub mod product_service;
pub mod tracking_service;
pub mod user_service;
pub mod webhook_service;
pub mod wishlist_service;

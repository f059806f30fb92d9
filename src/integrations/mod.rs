pub mod mailer;
pub mod payments;
pub mod webhook;

pub mod admin;
pub mod telegram_user;

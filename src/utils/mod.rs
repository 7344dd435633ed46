pub mod init_data_source;
pub mod telegram_auth;

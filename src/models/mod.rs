pub mod settings;
pub mod user;

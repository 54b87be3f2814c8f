pub mod captcha;
pub mod config;
pub mod dom;
pub mod i18n;
pub mod retry;
pub mod server;
pub mod site;

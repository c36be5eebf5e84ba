pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod mail;
pub mod notify;
pub mod observability;
pub mod poller;
pub mod relocate;

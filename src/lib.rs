pub mod config;
pub mod console;
pub mod fetch;
pub mod observability;
pub mod sanitize;
pub mod store;
pub mod worker;

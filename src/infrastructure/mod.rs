pub mod body_source;
pub mod config;
pub mod connector;
pub mod http_client;
pub mod output;

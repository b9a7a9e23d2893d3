pub mod config;
pub mod consensus;
pub mod datetime_resolve;
pub mod http_client;
pub mod logging;
pub mod match_resolver;
pub mod model;
pub mod news;
pub mod pipeline;
pub mod run_lock;
pub mod sources;
pub mod store;
pub mod team_names;
pub mod tip_recorder;

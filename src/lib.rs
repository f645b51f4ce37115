pub mod approval;
pub mod banner;
pub mod bridge;
pub mod client;
pub mod config;
pub mod consts;
pub mod engine;
pub mod events;
pub mod knowledge;
pub mod matches;
pub mod server;
pub mod thinker;
pub mod tools;

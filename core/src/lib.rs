pub mod agent;
pub mod agents;
pub mod attribute;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod hierarchy;
pub mod model;
pub mod rng;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod value;

pub mod config;
pub mod logging;

pub mod control;
pub mod discovery;
pub mod fetch;
pub mod job;
pub mod naming;
pub mod resolver;
pub mod retry;
pub mod scheduler;

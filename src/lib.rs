// Library exports for the Apache log mailer

pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod telemetry;

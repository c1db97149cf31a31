#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod sink;

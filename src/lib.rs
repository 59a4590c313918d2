#![warn(rust_2018_idioms)]

pub mod adapter;
pub mod app;
pub mod config;
pub mod connection;
pub mod domain;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod port;
pub mod queue;
pub mod test_support;
pub mod worker;

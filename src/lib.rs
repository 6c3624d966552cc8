pub mod catalog;
pub mod cli;
pub mod client;
pub mod config;
pub mod data_types;
pub mod error;
pub mod normalize;
pub mod notify;
pub mod state;
pub mod templates;

#[cfg(test)]
pub(crate) mod testutils;

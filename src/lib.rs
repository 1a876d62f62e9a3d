pub mod agent;
pub mod config;
pub mod errors;
pub mod git;
pub mod host;
pub mod logging;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod process;
pub mod publish;
pub mod sync;
pub mod test_runner;
pub mod tracker;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_support;

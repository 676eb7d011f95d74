pub mod chord;
pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod shell;

#[cfg(test)]
pub(crate) mod test_support;

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod finder;
pub(crate) mod models;
pub(crate) mod ranking;

pub(crate) mod cache;
pub(crate) mod dns;
pub(crate) mod domain;
pub(crate) mod patterns;
pub(crate) mod ports;
pub(crate) mod smtp;

#![deny(warnings)]

pub mod anki;
pub mod batch;
pub mod config;
pub mod lang;
pub mod service;
pub mod translate;

#[cfg(test)]
pub(crate) mod test_support;

//! Shell implementations

pub mod unix;

pub mod config;
pub mod convert;
pub mod mutations;
pub mod retry;
pub mod session;
pub mod source;

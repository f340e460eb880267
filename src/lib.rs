//! Small text and data helpers for the Gosub front end.
//!
//! - [`lang`]: dynamic values, cloning, binding, throttle/debounce
//! - [`url`]: query-string parsing and formatting
//! - [`string`]: escaping, templating, colour and width conversion
//! - [`number`]: padding, rounding, file sizes
//! - [`date`]: parsing, pattern formatting, durations
//! - [`cookie`]: cookie get/set/remove through an [`env::Environment`]

pub mod config;
pub mod cookie;
pub mod date;
pub mod env;
pub mod errors;
pub mod lang;
pub mod number;
pub mod string;
pub mod url;

pub use config::UtilConfig;
pub use env::{Environment, EnvironmentHandle, InMemoryEnvironment};
pub use errors::UtilError;

//! API request handlers

mod meta;
mod sleeper;
mod waker;

pub use meta::*;
pub use sleeper::*;
pub use waker::*;

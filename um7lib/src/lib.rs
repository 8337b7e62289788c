mod broadcast;
pub use broadcast::*;

mod client;
pub use client::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

pub mod protocol;

pub mod registers;
pub use registers::RegisterDirectory;

mod value;
pub use value::*;

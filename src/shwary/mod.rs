pub mod client;

pub use client::{ShwaryClient, ShwaryError};

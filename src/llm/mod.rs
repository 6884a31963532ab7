pub mod client;
pub mod extraction;
pub mod prompts;
pub mod retry;

pub use client::*;
pub use extraction::*;
pub use prompts::*;
pub use retry::*;

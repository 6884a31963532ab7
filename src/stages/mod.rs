pub mod clean;
pub mod extract;
pub mod ingest;
pub mod orchestrate;
pub mod process;

pub use clean::*;
pub use extract::*;
pub use ingest::*;
pub use orchestrate::*;
pub use process::*;

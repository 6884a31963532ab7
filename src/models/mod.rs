pub mod insight;
pub mod quarter;
pub mod transcript;

pub use insight::*;
pub use quarter::*;
pub use transcript::*;

pub mod job;
pub mod page;

pub use job::*;
pub use page::*;

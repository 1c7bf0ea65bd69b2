pub mod repository;
pub mod issue;
pub mod report;

pub use repository::*;
pub use issue::*;
pub use report::*;

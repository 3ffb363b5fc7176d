pub mod conversion;
pub mod definition;
pub mod project;

pub use conversion::*;
pub use definition::*;
pub use project::*;

pub mod condition;
pub mod instruction;
pub mod value;

pub use condition::*;
pub use instruction::*;
pub use value::*;

//! Built-in functional-unit mappers.

pub use alu::*;
pub use constant::*;
pub use memory::*;
pub use nop::*;

pub mod alu;
pub mod constant;
pub mod memory;
pub mod nop;

#![doc = "Function block execution core: interfaces, buffers, and the block kinds built on them."]

pub mod basic;
pub mod block;
pub mod generic;
pub mod interface;
pub mod layout;
pub mod resource;

pub use basic::*;
pub use block::*;
pub use generic::*;
pub use interface::*;
pub use layout::*;
pub use resource::*;

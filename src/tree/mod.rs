//! The syntax tree arena, symbol tables ("ranges"), and tag records shared
//! by every phase from bracket matching onward.

mod arena;
mod range;
mod tag;

pub use arena::{Node, NodeId, NodeStatus, Tree};
pub use range::{RangeArena, RangeId, SymbolTable};
pub use tag::{Heap, Tag, TagArena, TagId, TagKind};

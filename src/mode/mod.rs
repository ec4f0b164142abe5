//! Mode collection and equivalence (components H and I): the arena of
//! mode records, the tree walk that builds them from declarers and
//! denotations, and Koster's co-inductive structural equivalencer that
//! resolves indicants, absorbs/contracts unions, and checks well-formedness.

mod collector;
mod equivalence;
mod table;

pub use collector::{collect, collect_declarer, denotation_mode};
pub use equivalence::{is_equivalent, run as run_equivalence, DEFAULT_DEFLEXING};
pub use table::{Deflexing, Mode, ModeAttribute, ModeId, ModeTable, PackEntry, StandardKind};

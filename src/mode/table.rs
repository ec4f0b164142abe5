//! The mode table: arena-allocated, interned mode records with stable
//! identity, never hashed structurally, since modes can be cyclic (a STRUCT
//! can refer to itself through a REF). Grounded on the same
//! `Vec`-arena-plus-`equivalent`-
//! pointer-to-representative idiom as `tree::tag::TagArena`, generalized
//! here to carry the richer mode-specific fields (`pack`, `sub`, `dim`, …).

use rustc_hash::FxHashMap;

use crate::base::Name;
use crate::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeId(u32);

impl ModeId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The scalar kind carried by a `Standard` mode. `Void`/`Hip`/etc. are their
/// own [`ModeAttribute`] variants, not standard kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardKind {
    Int,
    Real,
    Complex,
    Bool,
    Char,
    Bits,
    Bytes,
    String,
    Format,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeAttribute {
    Standard,
    Indicant,
    Ref,
    Flex,
    Row,
    Struct,
    Union,
    Proc,
    SeriesMode,
    StowedMode,
    Void,
    Hip,
    Undefined,
    Error,
    /// The `ROWS` sentinel a FIRM coercion context grants special
    /// acceptance of any row shape under; a singleton, like `Void`.
    Rows,
}

/// One (mode, optional field name, defining node) entry of a STRUCT/UNION
/// pack, or one (mode, optional parameter name, defining node) entry of a
/// PROC's formal parameter pack.
#[derive(Debug, Clone)]
pub struct PackEntry {
    pub mode: ModeId,
    pub field_name: Option<Name>,
    pub defining_node: Option<NodeId>,
}

/// Controls how aggressively a FLEX modifier is ignored when comparing two
/// modes for coercion purposes (component L). Kept as a first-class enum
/// rather than a boolean, since there's more than one axis of approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deflexing {
    Force,
    Alias,
    Safe,
    Skip,
    No,
}

#[derive(Debug, Clone)]
pub struct Mode {
    pub attribute: ModeAttribute,
    /// Longety (`-1` SHORT .. `0` plain .. `+2` LONG LONG) for `Standard`;
    /// number of dimensions for `Row`. Unused (`0`) otherwise.
    pub dim: i32,
    pub standard: Option<StandardKind>,
    /// The declarer or other syntax node this mode was collected from.
    pub node: Option<NodeId>,
    /// Sub-mode: REF/FLEX/ROW's target, PROC's result.
    pub sub: Option<ModeId>,
    pub pack: Vec<PackEntry>,

    /// Set once this mode is discovered structurally equivalent to an
    /// earlier, surviving registration; every other field is then stale and
    /// callers should resolve through [`ModeTable::resolve`] first.
    pub equivalent: Option<ModeId>,

    /// `REF[1:n] M` sliced down by one dimension, for ROW modes.
    pub slice: Option<ModeId>,
    /// This mode with FLEX stripped, per the active [`Deflexing`] regime.
    pub deflexed: Option<ModeId>,
    /// `REF STRUCT(...)`'s field-selection partner: `name(m) = REF field`.
    pub name: Option<ModeId>,
    /// The "rowed" (row-of-struct) inverse of a STRUCT mode, or this ROW's
    /// `dim + 1` partner.
    pub multiple: Option<ModeId>,
    pub rowed: Option<ModeId>,
    /// Trimmed form (bounds information erased) used when a slice/selection
    /// carrier is a FLEX/ROW.
    pub trim: Option<ModeId>,

    pub has_rows: bool,
    pub size: u32,
    pub used: bool,
    /// True for modes synthesized by the equivalencer (REF/ROW/FLEX/NAME/
    /// MULTIPLE/DEFLEXED/TRIM derivatives) rather than collected directly
    /// from a declarer.
    pub derivate: bool,
    /// Registration sequence number; gives every mode a stable identity.
    pub number: u32,
}

impl Mode {
    fn new(attribute: ModeAttribute, number: u32) -> Self {
        Self {
            attribute,
            dim: 0,
            standard: None,
            node: None,
            sub: None,
            pack: Vec::new(),
            equivalent: None,
            slice: None,
            deflexed: None,
            name: None,
            multiple: None,
            rowed: None,
            trim: None,
            has_rows: false,
            size: 0,
            used: false,
            derivate: false,
            number,
        }
    }
}

/// Arena owning every [`Mode`] in the program; modes are interned once and
/// live for the program's lifetime. Structural dedup happens at
/// registration time for the acyclic constructors (REF/FLEX/ROW/PROC with
/// already-resolved sub-modes); potentially-cyclic STRUCT/UNION/INDICANT
/// equivalence is the mode equivalencer's job (see `mode::equivalence`),
/// since a naive hash-on-construction would loop forever on
/// `STRUCT(REF L n)`-style self-reference.
#[derive(Debug, Default)]
pub struct ModeTable {
    modes: Vec<Mode>,
    standard_cache: FxHashMap<(StandardKind, i32), ModeId>,
    void_id: Option<ModeId>,
    hip_id: Option<ModeId>,
    undefined_id: Option<ModeId>,
    error_id: Option<ModeId>,
    rows_id: Option<ModeId>,
    ref_cache: FxHashMap<ModeId, ModeId>,
    flex_cache: FxHashMap<ModeId, ModeId>,
    row_cache: FxHashMap<(i32, ModeId), ModeId>,
    indicant_cache: FxHashMap<NodeId, ModeId>,
}

impl ModeTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, mode: Mode) -> ModeId {
        let id = ModeId::new(self.modes.len());
        self.modes.push(mode);
        id
    }

    pub fn get(&self, id: ModeId) -> &Mode {
        &self.modes[id.index()]
    }

    pub fn get_mut(&mut self, id: ModeId) -> &mut Mode {
        &mut self.modes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Follows `equivalent` pointers to the surviving representative.
    pub fn resolve(&self, mut id: ModeId) -> ModeId {
        while let Some(next) = self.get(id).equivalent {
            if next == id {
                break;
            }
            id = next;
        }
        id
    }

    pub fn standard(&mut self, kind: StandardKind, longety: i32) -> ModeId {
        if let Some(&id) = self.standard_cache.get(&(kind, longety)) {
            return id;
        }
        let mut mode = Mode::new(ModeAttribute::Standard, self.modes.len() as u32);
        mode.standard = Some(kind);
        mode.dim = longety;
        mode.size = standard_size(kind, longety);
        mode.has_rows = false;
        let id = self.push(mode);
        self.standard_cache.insert((kind, longety), id);
        id
    }

    pub fn void(&mut self) -> ModeId {
        if let Some(id) = self.void_id {
            return id;
        }
        let id = self.push(Mode::new(ModeAttribute::Void, self.modes.len() as u32));
        self.void_id = Some(id);
        id
    }

    pub fn hip(&mut self) -> ModeId {
        if let Some(id) = self.hip_id {
            return id;
        }
        let id = self.push(Mode::new(ModeAttribute::Hip, self.modes.len() as u32));
        self.hip_id = Some(id);
        id
    }

    pub fn undefined(&mut self) -> ModeId {
        if let Some(id) = self.undefined_id {
            return id;
        }
        let id = self.push(Mode::new(ModeAttribute::Undefined, self.modes.len() as u32));
        self.undefined_id = Some(id);
        id
    }

    pub fn error(&mut self) -> ModeId {
        if let Some(id) = self.error_id {
            return id;
        }
        let id = self.push(Mode::new(ModeAttribute::Error, self.modes.len() as u32));
        self.error_id = Some(id);
        id
    }

    /// The `ROWS` sentinel: matches any FLEX/ROW shape under a FIRM
    /// coercion, without committing to an element mode or dimension. A
    /// singleton, same as `void()`/`hip()`.
    pub fn rows(&mut self) -> ModeId {
        if let Some(id) = self.rows_id {
            return id;
        }
        let id = self.push(Mode::new(ModeAttribute::Rows, self.modes.len() as u32));
        self.rows_id = Some(id);
        id
    }

    /// A UNION with no declarer of its own, built by the mode checker for
    /// transput's SIMPLIN/SIMPLOUT/ROW_SIMPLIN/ROW_SIMPLOUT acceptor modes.
    /// Not structurally deduplicated against collected UNIONs — callers
    /// cache the returned id themselves (see `check::stdenv_modes`).
    pub fn synthetic_union(&mut self, pack: Vec<PackEntry>) -> ModeId {
        let mut mode = Mode::new(ModeAttribute::Union, self.modes.len() as u32);
        mode.pack = pack;
        mode.derivate = true;
        self.push(mode)
    }

    /// `Indicant` mode placeholder for the applied or defining occurrence at
    /// `node`, resolved to its declarer's mode by
    /// `mode::equivalence::resolve_indicants` once the tag binder has wired
    /// `sub`. Cached per `node` (not per name) so that re-deriving the mode
    /// of the same tree position — once during collection, again when the
    /// tag binder points it at its definition — returns the same `ModeId`;
    /// two distinct occurrences of the same indicant name are always
    /// distinct nodes and so still get distinct placeholders.
    pub fn fresh_indicant(&mut self, node: NodeId) -> ModeId {
        if let Some(&id) = self.indicant_cache.get(&node) {
            return id;
        }
        let mut mode = Mode::new(ModeAttribute::Indicant, self.modes.len() as u32);
        mode.node = Some(node);
        let id = self.push(mode);
        self.indicant_cache.insert(node, id);
        id
    }

    pub fn reff(&mut self, sub: ModeId) -> ModeId {
        if let Some(&id) = self.ref_cache.get(&sub) {
            return id;
        }
        let mut mode = Mode::new(ModeAttribute::Ref, self.modes.len() as u32);
        mode.sub = Some(sub);
        mode.has_rows = self.get(sub).has_rows || self.get(sub).attribute == ModeAttribute::Row;
        mode.derivate = true;
        mode.size = POINTER_SIZE;
        let id = self.push(mode);
        self.ref_cache.insert(sub, id);
        id
    }

    pub fn flex(&mut self, sub: ModeId) -> ModeId {
        if let Some(&id) = self.flex_cache.get(&sub) {
            return id;
        }
        let mut mode = Mode::new(ModeAttribute::Flex, self.modes.len() as u32);
        mode.sub = Some(sub);
        mode.has_rows = true;
        mode.derivate = true;
        mode.size = ROW_DESCRIPTOR_SIZE;
        let id = self.push(mode);
        self.flex_cache.insert(sub, id);
        id
    }

    pub fn row(&mut self, dim: i32, sub: ModeId) -> ModeId {
        if let Some(&id) = self.row_cache.get(&(dim, sub)) {
            return id;
        }
        let mut mode = Mode::new(ModeAttribute::Row, self.modes.len() as u32);
        mode.dim = dim;
        mode.sub = Some(sub);
        mode.has_rows = true;
        mode.derivate = true;
        mode.size = ROW_DESCRIPTOR_SIZE;
        let id = self.push(mode);
        self.row_cache.insert((dim, sub), id);
        id
    }

    /// STRUCT/UNION/PROC are never cache-deduplicated at registration time —
    /// they may be cyclic through an as-yet-undeclared indicant, so
    /// structural dedup is deferred to the equivalencer's co-inductive pass.
    pub fn struct_mode(&mut self, node: NodeId, pack: Vec<PackEntry>) -> ModeId {
        let mut mode = Mode::new(ModeAttribute::Struct, self.modes.len() as u32);
        mode.node = Some(node);
        mode.has_rows = pack.iter().any(|p| self.get(p.mode).has_rows);
        mode.pack = pack;
        self.push(mode)
    }

    pub fn union_mode(&mut self, node: NodeId, pack: Vec<PackEntry>) -> ModeId {
        let mut mode = Mode::new(ModeAttribute::Union, self.modes.len() as u32);
        mode.node = Some(node);
        mode.pack = pack;
        self.push(mode)
    }

    pub fn proc_mode(&mut self, node: Option<NodeId>, pack: Vec<PackEntry>, result: ModeId) -> ModeId {
        let mut mode = Mode::new(ModeAttribute::Proc, self.modes.len() as u32);
        mode.node = node;
        mode.pack = pack;
        mode.sub = Some(result);
        self.push(mode)
    }

    pub fn series_mode(&mut self, node: NodeId, pack: Vec<PackEntry>) -> ModeId {
        let mut mode = Mode::new(ModeAttribute::SeriesMode, self.modes.len() as u32);
        mode.node = Some(node);
        mode.pack = pack;
        self.push(mode)
    }

    pub fn stowed_mode(&mut self, node: NodeId, pack: Vec<PackEntry>) -> ModeId {
        let mut mode = Mode::new(ModeAttribute::StowedMode, self.modes.len() as u32);
        mode.node = Some(node);
        mode.pack = pack;
        self.push(mode)
    }

    pub fn iter_ids(&self) -> impl Iterator<Item = ModeId> {
        (0..self.modes.len()).map(ModeId::new)
    }
}

const POINTER_SIZE: u32 = 8;
const ROW_DESCRIPTOR_SIZE: u32 = 24; // pointer + dim*(lwb,upb) header, matches a68g's row descriptor shape

fn standard_size(kind: StandardKind, longety: i32) -> u32 {
    let base = match kind {
        StandardKind::Int => 4,
        StandardKind::Real => 8,
        StandardKind::Complex => 16,
        StandardKind::Bool => 1,
        StandardKind::Char => 1,
        StandardKind::Bits => 4,
        StandardKind::Bytes => 32,
        StandardKind::String => ROW_DESCRIPTOR_SIZE,
        StandardKind::Format => POINTER_SIZE,
        StandardKind::File => POINTER_SIZE,
    };
    match longety.max(0) {
        0 => base,
        n => base * (1 << n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_modes_are_interned() {
        let mut table = ModeTable::new();
        let a = table.standard(StandardKind::Int, 0);
        let b = table.standard(StandardKind::Int, 0);
        assert_eq!(a, b);
        let long_int = table.standard(StandardKind::Int, 1);
        assert_ne!(a, long_int);
    }

    #[test]
    fn ref_of_same_sub_is_interned() {
        let mut table = ModeTable::new();
        let int_mode = table.standard(StandardKind::Int, 0);
        let ref_a = table.reff(int_mode);
        let ref_b = table.reff(int_mode);
        assert_eq!(ref_a, ref_b);
    }

    #[test]
    fn void_hip_undefined_error_are_singletons() {
        let mut table = ModeTable::new();
        assert_eq!(table.void(), table.void());
        assert_eq!(table.hip(), table.hip());
        assert_ne!(table.void(), table.hip());
    }

    #[test]
    fn row_mode_has_rows() {
        let mut table = ModeTable::new();
        let int_mode = table.standard(StandardKind::Int, 0);
        let row = table.row(1, int_mode);
        assert!(table.get(row).has_rows);
    }
}

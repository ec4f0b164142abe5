//! Standard-environ prelude: the standard modes, operators, and identifiers
//! that sit as the outermost range in every program's `previous` chain.
//! Grounded on the "load the standard library once, keep its symbol table
//! resident for every later compilation" discipline other loaders in this
//! codebase use, generalized from loading source text to synthesizing tags
//! directly — there is no Algol 68 syntax a standard operator's defining
//! occurrence could point at, so each tag's `node` is a leaf minted from a
//! scratch [`Tree`] that is never attached to a program's own tree and that
//! nothing downstream ever dereferences (`bind`/`check` only ever read a
//! tag's `mode`/`priority`/`scope`, never walk back through `tag.node` for
//! an already-bound occurrence).

use crate::base::{Interner, Name};
use crate::check::{stdenv_modes, TransputModes};
use crate::kind::SyntaxKind;
use crate::mode::{ModeId, ModeTable, PackEntry, StandardKind};
use crate::tree::{RangeArena, RangeId, Tag, TagArena, TagId, TagKind, Tree};
use text_size::TextRange;

/// Longety bounds the standard environ declares variants over: `SHORT` (-1)
/// through `LONG LONG` (+2), the two extra precisions this front end
/// actually carries distinct modes for.
const MIN_LONGETY: i32 = -1;
const MAX_LONGETY: i32 = 2;

pub struct StandardEnviron {
    pub ranges: RangeArena,
    pub tags: TagArena,
    pub range: RangeId,
    pub transput: TransputModes,
}

pub fn build(interner: &mut Interner, modes: &mut ModeTable) -> StandardEnviron {
    let mut ranges = RangeArena::new();
    let range = ranges.push(None, None);
    let mut tags = TagArena::new();
    let mut scratch = Tree::new();

    let transput = stdenv_modes(modes);

    let mut env = Builder {
        interner,
        modes,
        ranges: &mut ranges,
        tags: &mut tags,
        scratch: &mut scratch,
        range,
    };
    env.declare_identifiers(&transput);
    env.declare_monadic_operators();
    env.declare_dyadic_operators();

    StandardEnviron { ranges, tags, range, transput }
}

struct Builder<'a> {
    interner: &'a mut Interner,
    modes: &'a mut ModeTable,
    ranges: &'a mut RangeArena,
    tags: &'a mut TagArena,
    scratch: &'a mut Tree,
    range: RangeId,
}

impl<'a> Builder<'a> {
    fn name(&mut self, spelling: &str) -> Name {
        self.interner.intern(spelling)
    }

    fn leaf(&mut self, kind: SyntaxKind) -> crate::tree::NodeId {
        self.scratch.push_leaf(kind, None, TextRange::empty(0.into()))
    }

    fn declare_identifier(&mut self, spelling: &str, mode: ModeId) -> TagId {
        let name = self.name(spelling);
        let node = self.leaf(SyntaxKind::IDENTIFIER);
        let tag_id = self.tags.push(Tag::new(TagKind::Identifier, name, node, self.range));
        self.tags.get_mut(tag_id).mode = Some(mode.index() as u32);
        self.ranges.get_mut(self.range).identifiers.insert(name, tag_id);
        tag_id
    }

    fn declare_operator(&mut self, spelling: &str, mode: ModeId, priority: Option<u8>) -> TagId {
        let name = self.name(spelling);
        let node = self.leaf(SyntaxKind::OPERATOR);
        let tag_id = self.tags.push(Tag::new(TagKind::Op, name, node, self.range));
        self.tags.get_mut(tag_id).mode = Some(mode.index() as u32);
        self.tags.get_mut(tag_id).priority = priority;
        self.ranges.get_mut(self.range).operators.entry(name).or_default().push(tag_id);
        tag_id
    }

    fn proc1(&mut self, param: ModeId, result: ModeId) -> ModeId {
        let pack = vec![PackEntry { mode: param, field_name: None, defining_node: None }];
        self.modes.proc_mode(None, pack, result)
    }

    fn proc2(&mut self, lhs: ModeId, rhs: ModeId, result: ModeId) -> ModeId {
        let pack = vec![
            PackEntry { mode: lhs, field_name: None, defining_node: None },
            PackEntry { mode: rhs, field_name: None, defining_node: None },
        ];
        self.modes.proc_mode(None, pack, result)
    }

    /// `sin`/`cos`/`ln`/… and friends: one `PROC(REAL)REAL` identifier apiece,
    /// plus `pi`, `read`, and `print`. `longsin`/`shortsin` resolve to the
    /// same tag through `bind`'s lengthety-stripping retry, so only the bare
    /// spelling needs declaring here.
    fn declare_identifiers(&mut self, transput: &TransputModes) {
        let real = self.modes.standard(StandardKind::Real, 0);
        let int = self.modes.standard(StandardKind::Int, 0);
        let void = self.modes.void();

        self.declare_identifier("pi", real);

        for name in ["sin", "cos", "tan", "arcsin", "arccos", "arctan", "exp", "ln", "sqrt"] {
            let mode = self.proc1(real, real);
            self.declare_identifier(name, mode);
        }
        {
            let mode = self.proc1(real, int);
            self.declare_identifier("round", mode);
        }
        {
            let mode = self.proc1(real, int);
            self.declare_identifier("entier", mode);
        }

        let print_mode = self.proc1(transput.row_simplout, void);
        self.declare_identifier("print", print_mode);
        let read_mode = self.proc1(transput.row_simplin, void);
        self.declare_identifier("read", read_mode);
    }

    /// Monadic operators carry no priority (only dyadic operators and
    /// `PRIO` declarations do); each is declared once per standard longety
    /// so `LONG INT`/`LONG REAL` operands resolve without a widening
    /// coercion at the top precision.
    fn declare_monadic_operators(&mut self) {
        let bool_ = self.modes.standard(StandardKind::Bool, 0);
        for longety in MIN_LONGETY..=MAX_LONGETY {
            let int = self.modes.standard(StandardKind::Int, longety);
            let real = self.modes.standard(StandardKind::Real, longety);
            for (name, param, result) in [("-", int, int), ("+", int, int), ("ABS", int, int), ("ODD", int, bool_)] {
                let mode = self.proc1(param, result);
                self.declare_operator(name, mode, None);
            }
            for (name, param, result) in [("-", real, real), ("+", real, real), ("ABS", real, real)] {
                let mode = self.proc1(param, result);
                self.declare_operator(name, mode, None);
            }
        }
        let not_mode = self.proc1(bool_, bool_);
        self.declare_operator("NOT", not_mode, None);
    }

    /// Dyadic operators, with the same priority table
    /// `parser::reduce::standard_priority` falls back to when no tag is
    /// found — declaring it here on the real tag is what lets that fallback
    /// stop being exercised for any program that actually chains through
    /// this environ (see DESIGN.md).
    fn declare_dyadic_operators(&mut self) {
        let bool_ = self.modes.standard(StandardKind::Bool, 0);
        for longety in MIN_LONGETY..=MAX_LONGETY {
            let int = self.modes.standard(StandardKind::Int, longety);
            let real = self.modes.standard(StandardKind::Real, longety);
            for (name, result, priority) in [
                ("+", int, 7),
                ("-", int, 7),
                ("*", int, 8),
                ("OVER", int, 8),
                ("MOD", int, 8),
                ("**", int, 9),
                ("SHL", int, 9),
                ("SHR", int, 9),
            ] {
                let mode = self.proc2(int, int, result);
                self.declare_operator(name, mode, Some(priority));
            }
            for (name, priority) in [("<", 6), ("<=", 6), (">", 6), (">=", 6), ("=", 5), ("/=", 5)] {
                let mode = self.proc2(int, int, bool_);
                self.declare_operator(name, mode, Some(priority));
            }
            for (name, priority) in [
                ("+", 7),
                ("-", 7),
                ("*", 8),
                ("/", 8),
                ("**", 9),
            ] {
                let mode = self.proc2(real, real, real);
                self.declare_operator(name, mode, Some(priority));
            }
            for (name, priority) in [("<", 6), ("<=", 6), (">", 6), (">=", 6), ("=", 5), ("/=", 5)] {
                let mode = self.proc2(real, real, bool_);
                self.declare_operator(name, mode, Some(priority));
            }
        }
        for (name, priority) in [("&", 4), ("AND", 4)] {
            let mode = self.proc2(bool_, bool_, bool_);
            self.declare_operator(name, mode, Some(priority));
        }
        {
            let mode = self.proc2(bool_, bool_, bool_);
            self.declare_operator("OR", mode, Some(3));
        }

        let string = self.modes.standard(StandardKind::String, 0);
        {
            let mode = self.proc2(string, string, string);
            self.declare_operator("+", mode, Some(7));
        }
        for (name, priority) in [("<", 6), ("<=", 6), (">", 6), (">=", 6), ("=", 5), ("/=", 5)] {
            let mode = self.proc2(string, string, bool_);
            self.declare_operator(name, mode, Some(priority));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_pi_as_real() {
        let mut interner = Interner::new();
        let mut modes = ModeTable::new();
        let env = build(&mut interner, &mut modes);
        let name = interner.intern("pi");
        let tag_id = env.ranges.lookup_identifier(env.range, name).expect("pi declared");
        let mode_slot = env.tags.get(tag_id).mode.expect("pi has a mode");
        let mode = ModeId::new(mode_slot as usize);
        assert_eq!(modes.get(mode).standard, Some(StandardKind::Real));
    }

    #[test]
    fn plus_operator_has_standard_priority() {
        let mut interner = Interner::new();
        let mut modes = ModeTable::new();
        let env = build(&mut interner, &mut modes);
        let name = interner.intern("+");
        let candidates = env.ranges.lookup_operators(env.range, name);
        assert!(candidates.iter().any(|&id| env.tags.get(id).priority == Some(7)));
    }

    #[test]
    fn sin_resolves_through_lengthety_prefix_in_bind() {
        let mut interner = Interner::new();
        let mut modes = ModeTable::new();
        let env = build(&mut interner, &mut modes);
        let name = interner.intern("sin");
        assert!(env.ranges.lookup_identifier(env.range, name).is_some());
    }
}

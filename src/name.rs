//! Name generation (spec §4.1).
//!
//! A [`Name`] is a process-unique, kind-tagged identifier. Names are
//! immutable once produced and compare by value; a single [`NameGenerator`]
//! is shared by every [`crate::Scfg`] in a restructuring hierarchy (the
//! top-level graph and every nested region's subregion), so that no two
//! blocks anywhere in the hierarchy ever share a name (spec invariant 6).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

/// The fixed set of block/region/variable kinds a [`Name`] may be tagged
/// with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Basic,
    PythonBytecode,
    PythonAst,
    SynthHead,
    SynthBranch,
    SynthTail,
    SynthExit,
    SynthAssign,
    SynthReturn,
    SynthExitLatch,
    SynthExitBranch,
    SynthFill,
    Region,
}

impl Kind {
    /// The token used when rendering names of this kind, e.g. `basic` or
    /// `synth_head`.
    pub fn token(self) -> &'static str {
        match self {
            Kind::Basic => "basic",
            Kind::PythonBytecode => "python_bytecode",
            Kind::PythonAst => "python_ast",
            Kind::SynthHead => "synth_head",
            Kind::SynthBranch => "synth_branch",
            Kind::SynthTail => "synth_tail",
            Kind::SynthExit => "synth_exit",
            Kind::SynthAssign => "synth_assign",
            Kind::SynthReturn => "synth_return",
            Kind::SynthExitLatch => "synth_exit_latch",
            Kind::SynthExitBranch => "synth_exit_branch",
            Kind::SynthFill => "synth_fill",
            Kind::Region => "region",
        }
    }

    /// Parse a kind back from its token, as used by the dict/YAML format.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "basic" => Kind::Basic,
            "python_bytecode" => Kind::PythonBytecode,
            "python_ast" => Kind::PythonAst,
            "synth_head" => Kind::SynthHead,
            "synth_branch" => Kind::SynthBranch,
            "synth_tail" => Kind::SynthTail,
            "synth_exit" => Kind::SynthExit,
            "synth_assign" => Kind::SynthAssign,
            "synth_return" => Kind::SynthReturn,
            "synth_exit_latch" => Kind::SynthExitLatch,
            "synth_exit_branch" => Kind::SynthExitBranch,
            "synth_fill" => Kind::SynthFill,
            "region" => Kind::Region,
            _ => return None,
        })
    }
}

/// A process-unique, kind-tagged block or region identifier.
///
/// Two names are equal iff their `(kind, index)` pairs are equal; the
/// `index` is assigned by a [`NameGenerator`] and never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    kind: Kind,
    index: u32,
}

impl Name {
    /// Build a name directly from its parts, e.g. when reconstructing one
    /// from a serialized form. Does not register the index with any
    /// generator; callers that mix generated and reconstructed names are
    /// responsible for keeping a generator's counters past any manually
    /// constructed index (see [`NameGenerator::observe`]).
    pub fn new(kind: Kind, index: u32) -> Self {
        Self { kind, index }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// True if this name is a [`Kind::Region`] name.
    pub fn is_region(&self) -> bool {
        matches!(self.kind, Kind::Region)
    }

    /// Parses a name back from its rendered form (`<kind>_block_<n>` or
    /// `region_region_<n>`), the inverse of [`Name`]'s `Display` impl. Used
    /// by the dict/YAML deserializer.
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(idx) = s.rfind("_region_") {
            let kind = Kind::from_token(&s[..idx])?;
            let index: u32 = s[idx + "_region_".len()..].parse().ok()?;
            return Some(Self { kind, index });
        }
        let idx = s.rfind("_block_")?;
        let kind = Kind::from_token(&s[..idx])?;
        let index: u32 = s[idx + "_block_".len()..].parse().ok()?;
        Some(Self { kind, index })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_region() {
            write!(f, "{}_region_{}", self.kind.token(), self.index)
        } else {
            write!(f, "{}_block_{}", self.kind.token(), self.index)
        }
    }
}

/// A variable name, distinct from a [`Name`]: rendered
/// `__scfg_<kind>_var_<n>__` and used only as the `variable` field of
/// synthetic branches and the keys of `variable_assignment` maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarName(String);

impl VarName {
    /// Reconstructs a [`VarName`] from its rendered text, e.g. when
    /// deserializing. Does not validate the `__scfg_<kind>_var_<n>__` shape
    /// a generator-produced name would have, since a frontend-supplied
    /// graph is never expected to mint its own variable names.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VarName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-kind monotonically increasing counters for block/region names, and a
/// separate set of counters for variable names.
///
/// One generator is created per restructuring hierarchy and shared (via
/// [`NameGenerator::handle`]) by every nested [`crate::Scfg`]. Generation is
/// single-threaded; there is no synchronization (spec §5).
#[derive(Debug, Default)]
pub struct NameGenerator {
    block_counters: FxHashMap<Kind, u32>,
    region_counters: FxHashMap<Kind, u32>,
    var_counters: FxHashMap<Kind, u32>,
}

/// A cheaply-cloneable shared handle to a [`NameGenerator`].
pub type NameGeneratorHandle = Rc<RefCell<NameGenerator>>;

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh generator in a shared handle, for use as the root of a
    /// new restructuring hierarchy.
    pub fn new_handle() -> NameGeneratorHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Produce a fresh block name of the given kind.
    pub fn new_block_name(&mut self, kind: Kind) -> Name {
        let counter = self.block_counters.entry(kind).or_insert(0);
        let index = *counter;
        *counter += 1;
        Name::new(kind, index)
    }

    /// Produce a fresh region name of the given kind. Region names share
    /// the `Kind::Region` counter regardless of the region's semantic kind
    /// (`loop`, `head`, `tail`, `branch`, `meta`), since `Name` only tags
    /// by the fixed [`Kind`] set and region *semantic* kind is tracked
    /// separately on the [`crate::block::RegionBlock`].
    pub fn new_region_name(&mut self) -> Name {
        let counter = self.region_counters.entry(Kind::Region).or_insert(0);
        let index = *counter;
        *counter += 1;
        Name::new(Kind::Region, index)
    }

    /// Produce a fresh control-variable name of the given kind.
    pub fn new_var_name(&mut self, kind: Kind) -> VarName {
        let counter = self.var_counters.entry(kind).or_insert(0);
        let index = *counter;
        *counter += 1;
        VarName(format!("__scfg_{}_var_{}__", kind.token(), index))
    }

    /// Ensure this generator's counter for `name`'s kind is past
    /// `name.index()`, so subsequently generated names never collide with
    /// one that was reconstructed from a serialized form rather than
    /// generated fresh.
    pub fn observe(&mut self, name: Name) {
        let table = if name.is_region() {
            &mut self.region_counters
        } else {
            &mut self.block_counters
        };
        let counter = table.entry(name.kind()).or_insert(0);
        if *counter <= name.index() {
            *counter = name.index() + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parse_round_trips_block_names() {
        let name = Name::new(Kind::SynthExitLatch, 7);
        assert_eq!(Name::parse(&name.to_string()), Some(name));
    }

    #[test]
    fn display_parse_round_trips_region_names() {
        let name = Name::new(Kind::Region, 3);
        assert_eq!(name.to_string(), "region_region_3");
        assert_eq!(Name::parse(&name.to_string()), Some(name));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert_eq!(Name::parse("not_a_name"), None);
        assert_eq!(Name::parse("basic_block_abc"), None);
    }

    #[test]
    fn block_name_counters_are_per_kind_and_monotonic() {
        let mut gen = NameGenerator::new();
        let a0 = gen.new_block_name(Kind::Basic);
        let a1 = gen.new_block_name(Kind::Basic);
        let b0 = gen.new_block_name(Kind::SynthTail);
        assert_eq!(a0.index(), 0);
        assert_eq!(a1.index(), 1);
        assert_eq!(b0.index(), 0);
    }

    #[test]
    fn observe_advances_counter_past_reconstructed_index() {
        let mut gen = NameGenerator::new();
        gen.observe(Name::new(Kind::Basic, 5));
        let next = gen.new_block_name(Kind::Basic);
        assert_eq!(next.index(), 6);
    }
}

use compact_str::CompactString;
use facet::Facet;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    ZeroHandle,
    EmptyAliasPattern,
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroHandle => write!(f, "element handle must be non-zero"),
            Self::EmptyAliasPattern => write!(f, "alias pattern must be non-empty"),
        }
    }
}

impl Error for InvariantError {}

/// Opaque host-assigned identifier for a UI element, stable for the
/// element's lifetime. Zero is the host's null handle and never names an
/// element.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[facet(transparent)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub fn new(raw: u64) -> Result<Self, InvariantError> {
        if raw == 0 {
            return Err(InvariantError::ZeroHandle);
        }
        Ok(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::LowerHex for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Element description attached to an add mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDescriptor {
    pub handle: ElementHandle,
    /// Fully-qualified type name as reported by the host.
    pub type_name: CompactString,
    /// Instance name; empty when the element is unnamed.
    pub instance_name: CompactString,
    /// Number of children the parent relation reported at mutation time.
    pub child_count: u32,
}

impl ElementDescriptor {
    /// Display token for path segments: `"{name} ({ShortType})"` when the
    /// element carries an instance name, bare `{ShortType}` otherwise.
    /// `ShortType` is the last dot-delimited segment of the type name.
    pub fn display_token(&self) -> CompactString {
        let short_type = match self.type_name.rfind('.') {
            Some(index) => &self.type_name[index + 1..],
            None => self.type_name.as_str(),
        };

        if self.instance_name.is_empty() {
            CompactString::from(short_type)
        } else {
            CompactString::from(format!("{} ({short_type})", self.instance_name))
        }
    }
}

/// Parent/child relationship reported alongside a mutation.
/// `parent` is `None` for root elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentChildRelation {
    pub parent: Option<ElementHandle>,
    pub child: ElementHandle,
    pub child_index: u32,
}

/// Kind of a tree mutation notification.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MutationKind {
    Add,
    Remove,
}

/// One mirrored element: everything path resolution needs, nothing more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRecord {
    /// Immediate parent, if any. May name a handle the mirror has never
    /// seen (or has already dropped); resolution tolerates that.
    pub parent: Option<ElementHandle>,
    /// Display token derived from the descriptor at add time.
    pub display: CompactString,
    /// Sibling count the parent relation reported at the element's last add.
    pub child_count: u32,
    /// Position among siblings at the element's last add.
    pub child_index: u32,
}

/// The size an element had before a size-change notification fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviousSize {
    pub width: f32,
    pub height: f32,
}

impl PreviousSize {
    /// True for the first layout pass, when the element grows out of an
    /// empty rect. Those notifications are noise, not resizes.
    pub fn is_initial_layout(self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// Host fault classification code, as delivered by the host's unhandled
/// fault hook.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[facet(transparent)]
pub struct FaultCode(u32);

impl FaultCode {
    /// The host runtime's layout cycle fault, raised when layout re-enters
    /// itself past the runtime's iteration limit.
    pub const LAYOUT_CYCLE: FaultCode = FaultCode(0x802B_0014);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::LowerHex for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// One recorded resize observation.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub handle: ElementHandle,
    /// Raw resolved path at observation time; alias compression is applied
    /// at dump time, not here.
    pub path: String,
}

/// One row of a fault dump snapshot.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct DumpRow {
    pub path: String,
    pub handle: ElementHandle,
}

impl DumpRow {
    /// The line format guaranteed to dump writers.
    pub fn format_line(&self) -> String {
        format!("{} 0x{:x}", self.path, self.handle)
    }
}

/// One alias substitution: a long literal subtree prefix and the short
/// human-readable stand-in that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRule {
    pattern: String,
    replacement: String,
}

impl AliasRule {
    pub fn new(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<Self, InvariantError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(InvariantError::EmptyAliasPattern);
        }
        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }
}

/// Ordered alias table. Rules apply in table order; each rule replaces at
/// most the first occurrence of its pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    rules: Vec<AliasRule>,
}

impl AliasTable {
    pub fn new(rules: Vec<AliasRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies every rule to `path`, in order, one replacement each.
    pub fn apply(&self, path: &str) -> String {
        let mut path = path.to_string();
        for rule in &self.rules {
            if let Some(at) = path.find(rule.pattern.as_str()) {
                path.replace_range(at..at + rule.pattern.len(), &rule.replacement);
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(type_name: &str, instance_name: &str) -> ElementDescriptor {
        ElementDescriptor {
            handle: ElementHandle::new(1).expect("non-zero"),
            type_name: CompactString::from(type_name),
            instance_name: CompactString::from(instance_name),
            child_count: 0,
        }
    }

    #[test]
    fn handle_rejects_zero() {
        assert_eq!(ElementHandle::new(0), Err(InvariantError::ZeroHandle));
    }

    #[test]
    fn display_token_unnamed_uses_short_type() {
        let d = descriptor("Windows.UI.Xaml.Controls.Grid", "");
        assert_eq!(d.display_token(), "Grid");
    }

    #[test]
    fn display_token_named_wraps_short_type() {
        let d = descriptor("Windows.UI.Xaml.Controls.Grid", "LayoutRoot");
        assert_eq!(d.display_token(), "LayoutRoot (Grid)");
    }

    #[test]
    fn display_token_undotted_type_is_kept_whole() {
        let d = descriptor("Border", "");
        assert_eq!(d.display_token(), "Border");
    }

    #[test]
    fn initial_layout_requires_both_dimensions_zero() {
        assert!(PreviousSize { width: 0.0, height: 0.0 }.is_initial_layout());
        assert!(!PreviousSize { width: 50.0, height: 0.0 }.is_initial_layout());
        assert!(!PreviousSize { width: 0.0, height: 12.5 }.is_initial_layout());
    }

    #[test]
    fn dump_row_line_format() {
        let row = DumpRow {
            path: "MainPage/.../Frame".to_string(),
            handle: ElementHandle::new(0xdead_beef).expect("non-zero"),
        };
        assert_eq!(row.format_line(), "MainPage/.../Frame 0xdeadbeef");
    }

    #[test]
    fn alias_rule_rejects_empty_pattern() {
        assert_eq!(
            AliasRule::new("", "x").unwrap_err(),
            InvariantError::EmptyAliasPattern
        );
    }

    #[test]
    fn alias_table_replaces_first_occurrence_once() {
        let table = AliasTable::new(vec![
            AliasRule::new("A/B/C/", "A/.../").expect("valid rule"),
        ]);
        assert_eq!(table.apply("A/B/C/D"), "A/.../D");
        assert_eq!(table.apply("A/B/C/A/B/C/D"), "A/.../A/B/C/D");
        assert_eq!(table.apply("unrelated"), "unrelated");
    }

    #[test]
    fn alias_table_applies_rules_in_order() {
        let table = AliasTable::new(vec![
            AliasRule::new("RootPage/Navigation/", "RootPage/.../").expect("valid rule"),
            AliasRule::new("MainPage/Detail/", "MainPage/.../").expect("valid rule"),
        ]);
        assert_eq!(
            table.apply("RootPage/Navigation/Frame"),
            "RootPage/.../Frame"
        );
        assert_eq!(table.apply("MainPage/Detail/Frame"), "MainPage/.../Frame");
    }
}

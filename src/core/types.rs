//! # Type System
//!
//! `DataType` and `NamedDataType`: the qualified-name-identified type model
//! that every port, connection, and NodeType signature is built from.

use inkwell::types::BasicTypeEnum;

/// A type as seen by the graph model: identified by a qualified name
/// (`module:name`), carrying the backend's concrete representation.
///
/// Equality and hashing are by qualified name only: two `DataType`s with the
/// same `(module, name)` are the same type even if constructed
/// independently, as long as they share a backend context.
#[derive(Clone)]
pub struct DataType {
    module: String,
    name: String,
    backend: BasicTypeEnum<'static>,
}

impl DataType {
    /// Build a `DataType` from a backend type borrowed from the owning
    /// `Context`'s LLVM context. The lifetime is erased here rather than
    /// threaded through the whole graph/node model; callers recover it with
    /// [`DataType::backend`] while the owning `Context` is alive. This
    /// mirrors the lifetime-free ergonomics of the original `Pin`/`DataType`
    /// shapes this type replaces.
    pub fn new<'ctx>(module: impl Into<String>, name: impl Into<String>, backend: BasicTypeEnum<'ctx>) -> Self {
        let backend: BasicTypeEnum<'static> = unsafe { std::mem::transmute(backend) };
        DataType {
            module: module.into(),
            name: name.into(),
            backend,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical `module:name` identifier.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.module, self.name)
    }

    /// Recover the backend type at the lifetime of the caller's context
    /// borrow. Callers must only call this while the owning `Context` is
    /// alive.
    pub fn backend<'ctx>(&self) -> BasicTypeEnum<'ctx> {
        unsafe { std::mem::transmute(self.backend) }
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module && self.name == other.name
    }
}

impl Eq for DataType {}

impl std::hash::Hash for DataType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.module.hash(state);
        self.name.hash(state);
    }
}

impl std::fmt::Debug for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DataType({})", self.qualified_name())
    }
}

/// A labeled type on a port list. Labels are display-only and may repeat
/// within one `dataInputs`/`dataOutputs` list.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedDataType {
    pub label: String,
    pub ty: DataType,
}

impl NamedDataType {
    pub fn new(label: impl Into<String>, ty: DataType) -> Self {
        NamedDataType {
            label: label.into(),
            ty,
        }
    }
}

/// Splits a qualified name on its first `:`, the one separator the wire
/// format and in-memory identifiers agree on (module full-names may
/// themselves contain `/`, but not `:`).
pub fn parse_qualified_name(qualified: &str) -> crate::error::Result<(&str, &str)> {
    qualified
        .split_once(':')
        .ok_or_else(|| crate::error::GraphyError::Parse(format!("not a qualified name: {qualified}")))
}

/// 2D position in visual editor space, carried opaquely by the core.
/// Coordinates are in arbitrary editor units.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl Default for Position {
    #[inline]
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_round_trips() {
        let inner = inkwell::context::Context::create();
        let ty = DataType::new("lang", "i32", inner.i32_type().into());
        assert_eq!(ty.qualified_name(), "lang:i32");
    }

    #[test]
    fn equality_ignores_backend_identity() {
        let inner = inkwell::context::Context::create();
        let a = DataType::new("lang", "i32", inner.i32_type().into());
        let b = DataType::new("lang", "i32", inner.i64_type().into());
        assert_eq!(a, b, "equality is by qualified name only");
    }

    #[test]
    fn parse_qualified_name_splits_on_first_colon() {
        let (module, name) = parse_qualified_name("lang:i32").unwrap();
        assert_eq!(module, "lang");
        assert_eq!(name, "i32");
    }

    #[test]
    fn position_default_is_origin() {
        assert_eq!(Position::default(), Position::new(0.0, 0.0));
    }
}

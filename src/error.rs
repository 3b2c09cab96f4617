//! # Error Handling
//!
//! The error taxonomy used throughout the core, plus the accumulating
//! [`LoadResult`] used by the graph/module loader where one malformed node
//! shouldn't hide the diagnostics for the rest of the graph.

use serde_json::Value;

/// Result type used throughout the core for single-fallible operations.
pub type Result<T> = std::result::Result<T, GraphyError>;

/// Error taxonomy for the core. Each variant is a distinct error kind that
/// can be carried as a diagnostic on the loader's accumulating [`LoadResult`]
/// or returned directly from a fallible operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphyError {
    #[error("failed to parse module JSON: {0}")]
    Parse(String),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("unknown type: {module}:{name}")]
    UnknownType { module: String, name: String },

    #[error("unknown node type: {module}:{name}")]
    UnknownNodeType { module: String, name: String },

    #[error("type mismatch on data edge: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("duplicate node id: {0}")]
    DuplicateId(String),

    #[error("unconnected input: {node}.{input}")]
    UnconnectedInput { node: String, input: String },

    #[error("cyclic pure dependency detected at node {0}")]
    CyclicPureDependency(String),

    #[error("invalid function signature: {0}")]
    InvalidSignature(String),

    #[error("backend rejected module during verification: {0}")]
    BackendError(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("module dependency cycle involving: {0}")]
    DependencyCycle(String),

    #[error("{0}")]
    Custom(String),
}

/// One diagnostic entry on a [`LoadResult`], mirroring the boundary error
/// shape from the persistence dialect: an `E`/`W` coded error or warning
/// with a stable overview and free-form JSON metadata.
#[derive(Debug, Clone)]
pub struct ResultEntry {
    /// `E*` for errors (flip success to false), `W*` for warnings.
    pub code: &'static str,
    /// A short, stable description of the problem class.
    pub overview: String,
    /// Instance-specific metadata (node id, requested name, etc).
    pub data: Value,
}

impl ResultEntry {
    pub fn is_error(&self) -> bool {
        self.code.starts_with('E')
    }
}

/// An accumulating result: like [`Result`], but composes by concatenation so
/// that one malformed node in a graph doesn't prevent reporting errors on the
/// rest of the graph. Warnings never flip `success` to false.
#[derive(Debug, Clone, Default)]
pub struct LoadResult {
    pub entries: Vec<ResultEntry>,
    pub success: bool,
}

impl LoadResult {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            success: true,
        }
    }

    /// Record an error or warning. `code` must start with `E` or `W`.
    pub fn add_entry(&mut self, code: &'static str, overview: impl Into<String>, data: Value) {
        debug_assert!(code.starts_with('E') || code.starts_with('W'));
        if code.starts_with('E') {
            self.success = false;
        }
        self.entries.push(ResultEntry {
            code,
            overview: overview.into(),
            data,
        });
    }

    pub fn is_ok(&self) -> bool {
        self.success
    }

    /// The first error entry, if any — the primary diagnostic, per §7's
    /// "preserving the earliest error as the primary diagnostic" rule.
    pub fn primary_error(&self) -> Option<&ResultEntry> {
        self.entries.iter().find(|e| e.is_error())
    }

    /// Fold a fallible step's [`Result`] into this accumulating result,
    /// recording it as an `EUKN` entry if it failed.
    pub fn absorb<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.add_entry("EUKN", e.to_string(), Value::Null);
                None
            }
        }
    }
}

impl std::ops::Add for LoadResult {
    type Output = LoadResult;
    fn add(mut self, rhs: LoadResult) -> LoadResult {
        self += rhs;
        self
    }
}

impl std::ops::AddAssign for LoadResult {
    fn add_assign(&mut self, rhs: LoadResult) {
        self.success = self.success && rhs.success;
        self.entries.extend(rhs.entries);
    }
}

impl std::fmt::Display for LoadResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            writeln!(f, "[{}] {}: {}", entry.code, entry.overview, entry.data)?;
        }
        Ok(())
    }
}

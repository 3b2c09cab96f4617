//! The abstract Module capability set, generalizing the teacher's
//! `NodeMetadataProvider` trait-object pattern to the full component
//! contract: node-type/type lookup, enumeration, artifact generation, and
//! dependency tracking.

use std::collections::HashSet;

use crate::error::Result;

use super::node_type::NodeType;
use super::types::DataType;

/// Polymorphic over the capabilities: `node_type_from_name`,
/// `type_from_name`, `node_type_names`, `type_names`, `generate_module`,
/// `dependencies`. `LangModule` and `GraphModule` both implement it; no
/// cross-casting is required once the interface is captured, per the
/// capability-set design note.
pub trait Module: std::fmt::Debug {
    /// Path-like full name, e.g. `"examples/math"` or `"lang"`.
    fn full_name(&self) -> &str;

    /// The last path segment of `full_name`.
    fn short_name(&self) -> &str {
        self.full_name().rsplit('/').next().unwrap_or(self.full_name())
    }

    /// Construct a fresh NodeType from this module's factory.
    fn node_type_from_name(&self, name: &str, json: &serde_json::Value) -> Result<NodeType>;

    /// Returns an invalid-marker via `Err` if not found; callers that need
    /// the spec's "invalid DataType if not found" semantics should prefer
    /// `Context::type_from_module`, which wraps this with `UnknownType`.
    fn type_from_name(&self, name: &str) -> Option<DataType>;

    fn node_type_names(&self) -> Vec<String>;

    fn type_names(&self) -> Vec<String>;

    /// Fill the supplied backend module with this module's definitions.
    /// Empty for `LangModule`; compiles every GraphFunction for `GraphModule`.
    fn generate_module<'ctx>(
        &self,
        llvm: &'ctx inkwell::context::Context,
        backend_module: &inkwell::module::Module<'ctx>,
    ) -> Result<()>;

    fn dependencies(&self) -> &HashSet<String>;

    fn add_dependency(&mut self, name: String);

    /// Lets `Context` downcast a `dyn Module` back to a concrete module type
    /// (e.g. to walk a `GraphModule`'s functions for `find_instances_of_type`)
    /// without every capability needing its own trait method.
    fn as_any(&self) -> &dyn std::any::Any;
}

//! On-disk module JSON (de)serialization — §6's exact shape, implemented
//! the way `original_source/libchig/src/Graph.cpp`'s `Graph::Graph(json)` /
//! `Graph::toJson` pair is structured: an error-accumulating parse loop
//! over nodes/connections, and a `parseColonPair`-equivalent for
//! `module:type` / `module:name` qualified names.
//!
//! The `input`/`output` naming convention on connections is preserved
//! verbatim: **`input` is the source**, **`output` is the sink** (an edge
//! enters the sink's `input` from the editor's perspective).

use serde_json::Value as Json;

use crate::core::{parse_qualified_name, DataType, Module, NamedDataType, NodeType, Position};
use crate::error::{GraphyError, LoadResult, Result};

use super::graph_function::GraphFunction;
use super::struct_type::GraphStruct;
use super::GraphModule;

/// A node-type resolver: given a qualified `module:name` and the node's
/// JSON data payload, produce a NodeType. `Context::load_module` supplies
/// one that dispatches to `LangModule`, to already-loaded dependency
/// modules, or to the in-progress module itself (struct make/break,
/// sibling function re-export).
pub trait NodeTypeResolver {
    fn resolve(&self, qualified_name: &str, data: &Json) -> Result<NodeType>;
}

/// A type resolver for `module:type` strings appearing in signatures and
/// struct field declarations.
pub trait TypeResolver {
    fn resolve(&self, qualified_name: &str) -> Result<DataType>;
}

/// Reads the `"dependencies"` array alone, without needing a type resolver —
/// `Context::load_module` calls this first to know which modules to load
/// before it can build a `TypeResolver` for the rest of the shell.
pub fn read_dependencies(json: &Json) -> Result<Vec<String>> {
    let obj = json
        .as_object()
        .ok_or_else(|| GraphyError::Parse("module JSON root must be an object".into()))?;
    match obj.get("dependencies") {
        Some(Json::Array(deps)) => deps
            .iter()
            .map(|d| {
                d.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| GraphyError::Parse("dependency entry must be a string".into()))
            })
            .collect(),
        Some(_) => Err(GraphyError::Parse("\"dependencies\" must be an array".into())),
        None => Ok(Vec::new()),
    }
}

/// Parses the on-disk shape into dependencies, structs, and function
/// signatures (without bodies) — the information needed before node types
/// can be resolved (a self-referencing struct field or a call to a sibling
/// function needs the signature, not the body).
pub fn parse_module_shell<'ctx>(
    llvm: &'ctx inkwell::context::Context,
    full_name: &str,
    json: &Json,
    types: &dyn TypeResolver,
) -> Result<(Vec<String>, GraphModule)> {
    let obj = json
        .as_object()
        .ok_or_else(|| GraphyError::Parse("module JSON root must be an object".into()))?;

    let dependencies = read_dependencies(json)?;

    let mut module = GraphModule::new(llvm, full_name);
    for dep in &dependencies {
        module.add_dependency(dep.clone());
    }

    if let Some(Json::Object(types_obj)) = obj.get("types") {
        for (struct_name, fields_json) in types_obj {
            let fields_arr = fields_json
                .as_array()
                .ok_or_else(|| GraphyError::Parse(format!("struct {struct_name} fields must be an array")))?;
            let mut fields = Vec::with_capacity(fields_arr.len());
            for field in fields_arr {
                let field_obj = field
                    .as_object()
                    .ok_or_else(|| GraphyError::Parse(format!("struct {struct_name} field entry must be an object")))?;
                let (label, ty_json) = field_obj
                    .iter()
                    .next()
                    .ok_or_else(|| GraphyError::Parse(format!("struct {struct_name} field entry is empty")))?;
                let ty_str = ty_json
                    .as_str()
                    .ok_or_else(|| GraphyError::Parse(format!("struct {struct_name} field type must be a string")))?;
                let ty = types.resolve(ty_str)?;
                fields.push(NamedDataType::new(label.clone(), ty));
            }
            module.structs.push(GraphStruct::new(struct_name.clone(), fields));
        }
    }

    if let Some(Json::Array(graphs)) = obj.get("graphs") {
        for graph_json in graphs {
            let name = graph_json
                .get("name")
                .and_then(Json::as_str)
                .ok_or_else(|| GraphyError::Parse("graph entry missing \"name\"".into()))?;
            let mut func = GraphFunction::new(name);
            func.description = graph_json
                .get("description")
                .and_then(Json::as_str)
                .unwrap_or_default()
                .to_string();
            func.data_inputs = parse_named_list(graph_json.get("data_inputs"), types)?;
            func.data_outputs = parse_named_list(graph_json.get("data_outputs"), types)?;
            func.exec_inputs = parse_string_list(graph_json.get("exec_inputs"))?;
            func.exec_outputs = parse_string_list(graph_json.get("exec_outputs"))?;
            module.functions.push(func);
        }
    }

    Ok((dependencies, module))
}

fn parse_named_list(json: Option<&Json>, types: &dyn TypeResolver) -> Result<Vec<NamedDataType>> {
    let Some(Json::Array(arr)) = json else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(arr.len());
    for entry in arr {
        let obj = entry
            .as_object()
            .ok_or_else(|| GraphyError::Parse("data port entry must be an object".into()))?;
        let (label, ty_json) = obj
            .iter()
            .next()
            .ok_or_else(|| GraphyError::Parse("data port entry is empty".into()))?;
        let ty_str = ty_json
            .as_str()
            .ok_or_else(|| GraphyError::Parse("data port type must be a string".into()))?;
        out.push(NamedDataType::new(label.clone(), types.resolve(ty_str)?));
    }
    Ok(out)
}

fn parse_string_list(json: Option<&Json>) -> Result<Vec<String>> {
    let Some(Json::Array(arr)) = json else {
        return Ok(Vec::new());
    };
    arr.iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(|| GraphyError::Parse("exec label must be a string".into())))
        .collect()
}

/// Fills in bodies (nodes + connections) for every function already present
/// in `module` (from `parse_module_shell`), using `resolver` to construct
/// each node's NodeType. Accumulates errors across nodes/edges within one
/// graph rather than aborting on the first malformed node, per the
/// error-accumulation requirement on the graph loader.
pub fn parse_module_bodies(module: &mut GraphModule, json: &Json, resolver: &dyn NodeTypeResolver) -> LoadResult {
    let mut result = LoadResult::new();
    let Some(Json::Array(graphs)) = json.get("graphs") else {
        return result;
    };

    for (func, graph_json) in module.functions.iter_mut().zip(graphs.iter()) {
        let Some(Json::Object(nodes)) = graph_json.get("nodes") else {
            result.add_entry("E5", "graph missing \"nodes\" object", Json::String(func.name.clone()));
            continue;
        };

        for (node_id, node_json) in nodes {
            let parsed = (|| -> Result<()> {
                let obj = node_json
                    .as_object()
                    .ok_or_else(|| GraphyError::Parse(format!("node {node_id} must be an object")))?;
                let type_name = obj
                    .get("type")
                    .and_then(Json::as_str)
                    .ok_or_else(|| GraphyError::Parse(format!("node {node_id} missing \"type\"")))?;
                let data = obj.get("data").cloned().unwrap_or(Json::Null);
                let node_type = resolver.resolve(type_name, &data)?;
                let location = obj.get("location").and_then(Json::as_array);
                let (x, y) = match location {
                    Some(arr) if arr.len() == 2 => (arr[0].as_f64().unwrap_or(0.0), arr[1].as_f64().unwrap_or(0.0)),
                    _ => (0.0, 0.0),
                };
                func.insert_node(
                    node_id.clone(),
                    type_name.to_string(),
                    Position::new(x, y),
                    node_type.data_inputs.len(),
                    node_type.exec_inputs.len(),
                    node_type.exec_outputs.len(),
                    data,
                )?;
                func.set_node_type(node_id.clone(), node_type);
                Ok(())
            })();
            if let Err(e) = parsed {
                result.add_entry("E6", format!("failed to construct node {node_id}: {e}"), Json::String(node_id.clone()));
            }
        }

        let Some(Json::Array(connections)) = graph_json.get("connections") else {
            continue;
        };
        for (i, conn) in connections.iter().enumerate() {
            let parsed = (|| -> Result<()> {
                let kind = conn
                    .get("type")
                    .and_then(Json::as_str)
                    .ok_or_else(|| GraphyError::Parse(format!("connection {i} missing \"type\"")))?;
                let input = conn
                    .get("input")
                    .and_then(Json::as_array)
                    .ok_or_else(|| GraphyError::Parse(format!("connection {i} missing \"input\"")))?;
                let output = conn
                    .get("output")
                    .and_then(Json::as_array)
                    .ok_or_else(|| GraphyError::Parse(format!("connection {i} missing \"output\"")))?;
                let (src_id, src_port) = node_ref(input)?;
                let (dst_id, dst_port) = node_ref(output)?;
                // "input" is the source, "output" is the sink.
                match kind {
                    "data" => func.connect_data(&src_id, src_port, &dst_id, dst_port)?,
                    "exec" => func.connect_exec(&src_id, src_port, &dst_id, dst_port)?,
                    other => return Err(GraphyError::Parse(format!("unknown connection type {other}"))),
                }
                Ok(())
            })();
            if let Err(e) = parsed {
                result.add_entry("E7", format!("failed to apply connection {i}: {e}"), Json::Number(i.into()));
            }
        }
    }

    result
}

fn node_ref(arr: &[Json]) -> Result<(String, usize)> {
    if arr.len() != 2 {
        return Err(GraphyError::Parse("connection endpoint must be [node-id, port-index]".into()));
    }
    let id = arr[0].as_str().ok_or_else(|| GraphyError::Parse("connection endpoint node-id must be a string".into()))?;
    let port = arr[1]
        .as_u64()
        .ok_or_else(|| GraphyError::Parse("connection endpoint port-index must be an integer".into()))? as usize;
    Ok((id.to_string(), port))
}

/// Serializes a GraphModule back to the on-disk shape.
pub fn graph_module_to_json(module: &GraphModule) -> Json {
    let mut root = serde_json::Map::new();
    root.insert(
        "dependencies".to_string(),
        Json::Array(module.dependencies().iter().cloned().map(Json::String).collect()),
    );

    let mut types = serde_json::Map::new();
    for gs in &module.structs {
        types.insert(gs.name.clone(), gs.to_json());
    }
    root.insert("types".to_string(), Json::Object(types));

    let graphs: Vec<Json> = module.functions.iter().map(graph_function_to_json).collect();
    root.insert("graphs".to_string(), Json::Array(graphs));

    Json::Object(root)
}

fn named_list_to_json(list: &[NamedDataType]) -> Json {
    Json::Array(
        list.iter()
            .map(|n| {
                let mut obj = serde_json::Map::new();
                obj.insert(n.label.clone(), Json::String(n.ty.qualified_name()));
                Json::Object(obj)
            })
            .collect(),
    )
}

fn graph_function_to_json(func: &GraphFunction) -> Json {
    let mut obj = serde_json::Map::new();
    obj.insert("name".to_string(), Json::String(func.name.clone()));
    obj.insert("description".to_string(), Json::String(func.description.clone()));
    obj.insert("data_inputs".to_string(), named_list_to_json(&func.data_inputs));
    obj.insert("data_outputs".to_string(), named_list_to_json(&func.data_outputs));
    obj.insert(
        "exec_inputs".to_string(),
        Json::Array(func.exec_inputs.iter().cloned().map(Json::String).collect()),
    );
    obj.insert(
        "exec_outputs".to_string(),
        Json::Array(func.exec_outputs.iter().cloned().map(Json::String).collect()),
    );

    let mut nodes = serde_json::Map::new();
    for (id, node) in &func.graph.nodes {
        let mut node_obj = serde_json::Map::new();
        node_obj.insert("type".to_string(), Json::String(node.node_type.clone()));
        node_obj.insert(
            "location".to_string(),
            Json::Array(vec![Json::from(node.position.x), Json::from(node.position.y)]),
        );
        node_obj.insert("data".to_string(), node.data.clone());
        nodes.insert(id.clone(), Json::Object(node_obj));
    }
    obj.insert("nodes".to_string(), Json::Object(nodes));

    let connections: Vec<Json> = func
        .graph
        .connections()
        .into_iter()
        .map(|c| {
            let mut conn_obj = serde_json::Map::new();
            conn_obj.insert(
                "type".to_string(),
                Json::String(
                    match c.kind {
                        crate::core::ConnectionKind::Data => "data",
                        crate::core::ConnectionKind::Exec => "exec",
                    }
                    .to_string(),
                ),
            );
            conn_obj.insert(
                "input".to_string(),
                Json::Array(vec![Json::String(c.source_node.clone()), Json::from(c.source_port)]),
            );
            conn_obj.insert(
                "output".to_string(),
                Json::Array(vec![Json::String(c.target_node.clone()), Json::from(c.target_port)]),
            );
            Json::Object(conn_obj)
        })
        .collect();
    obj.insert("connections".to_string(), Json::Array(connections));

    Json::Object(obj)
}

pub fn parse_qualified_or_err(s: &str) -> Result<(String, String)> {
    let (m, n) = parse_qualified_name(s)?;
    Ok((m.to_string(), n.to_string()))
}

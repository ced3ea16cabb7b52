//! Instance graphs as JSON trees
//!
//! Primitives and strings map to JSON scalars, arrays to JSON arrays and enum
//! constants to their ordinal. An object becomes
//!
//! ```json
//! {"!k": "Derived", "!i": 0, "Derived": {"own": 1}, "Base": {"inherited": 2}}
//! ```
//!
//! with one section per class of its base chain holding that class's own
//! non-static, non-transient attributes. An object met a second time is
//! written as `{"!i": n}`, which makes cyclic graphs representable.

mod decode;

pub use decode::deserialize;

use crate::types::Type;
use crate::vm::{ClassId, ClassKind, ObjectRef, Process, Value, VmError, VmResult};
use rustc_hash::FxHashMap;
use serde_json::{Map, Number, Value as Json};

/// Class name key of an object node
pub const CLASS_KEY: &str = "!k";
/// Visit index key of an object or reference node
pub const INDEX_KEY: &str = "!i";

/// Errors while rebuilding an instance graph
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    /// Input is not JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON that is not a serialized graph
    #[error("malformed tree: {0}")]
    Malformed(String),

    /// `!k` names no class of the process
    #[error("unknown class {0}")]
    UnknownClass(String),

    /// Node does not fit the expected type
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// JSON found instead
        found: String,
    },

    /// `{"!i": n}` with no object `n` in the tree
    #[error("unresolved reference to object {0}")]
    UnresolvedReference(usize),

    /// Heap or layout failure while materializing
    #[error(transparent)]
    Vm(#[from] VmError),
}

/// Serialize `value` of static type `ty`
pub fn serialize(value: &Value, ty: &Type, process: &Process) -> VmResult<Json> {
    Serializer {
        process,
        visited: FxHashMap::default(),
        next_index: 0,
    }
    .value(value, ty)
}

/// [`serialize`] rendered as a JSON string
pub fn to_json_string(value: &Value, ty: &Type, process: &Process) -> VmResult<String> {
    let tree = serialize(value, ty, process)?;
    serde_json::to_string(&tree).map_err(|e| VmError::Internal(e.to_string()))
}

/// Parse and [`deserialize`] a JSON string
pub fn from_json_str(text: &str, expected: &Type, process: &mut Process) -> Result<Value, DeserializeError> {
    let tree: Json = serde_json::from_str(text)?;
    deserialize(&tree, expected, process)
}

struct Serializer<'p> {
    process: &'p Process,
    visited: FxHashMap<ObjectRef, usize>,
    next_index: usize,
}

impl Serializer<'_> {
    fn value(&mut self, value: &Value, ty: &Type) -> VmResult<Json> {
        let process = self.process;
        Ok(match value {
            Value::Null => Json::Null,
            Value::Int(v) => Json::from(*v),
            Value::Float(v) => Number::from_f64(f64::from(*v)).map(Json::Number).unwrap_or(Json::Null),
            Value::Double(v) => Number::from_f64(*v).map(Json::Number).unwrap_or(Json::Null),
            Value::Bool(v) => Json::Bool(*v),
            Value::Char(c) => Json::String(c.to_string()),
            Value::Str(s) => Json::String(s.to_string()),
            Value::Array(r) => {
                let array = process.heap.array(*r)?;
                let element_ty = ty.element_type().unwrap_or(&array.element_type).clone();
                let elements = array.elements.clone();
                let mut items = Vec::with_capacity(elements.len());
                for element in &elements {
                    items.push(self.value(element, &element_ty)?);
                }
                Json::Array(items)
            }
            Value::Object(r) => self.object(*r)?,
        })
    }

    fn object(&mut self, r: ObjectRef) -> VmResult<Json> {
        let process = self.process;
        let object = process.heap.object(r)?;
        let class = process.classes.class(object.class_id)?;
        if class.kind == ClassKind::Enum {
            return Ok(object.ordinal.map(Json::from).unwrap_or(Json::Null));
        }
        // every reference to a non-serializable system object is null
        if class.is_system && !class.serializable {
            return Ok(Json::Null);
        }
        if let Some(&index) = self.visited.get(&r) {
            let mut node = Map::new();
            node.insert(INDEX_KEY.to_string(), Json::from(index));
            return Ok(Json::Object(node));
        }
        let index = self.next_index;
        self.next_index += 1;
        self.visited.insert(r, index);

        let mut node = Map::new();
        node.insert(CLASS_KEY.to_string(), Json::String(class.name.clone()));
        node.insert(INDEX_KEY.to_string(), Json::from(index));
        for owner in process.classes.ancestors(object.class_id) {
            let section = self.section(r, owner)?;
            if let Some((name, attributes)) = section {
                node.insert(name, Json::Object(attributes));
            }
        }
        Ok(Json::Object(node))
    }

    /// Own persistent attributes of `owner` stored in `r`
    fn section(&mut self, r: ObjectRef, owner: ClassId) -> VmResult<Option<(String, Map<String, Json>)>> {
        let process = self.process;
        let class = process.classes.class(owner)?;
        let attributes: Vec<_> = class
            .attributes
            .iter()
            .filter(|a| !a.is_static && !a.is_transient)
            .filter_map(|a| a.index.map(|index| (a.identifier.clone(), a.ty.clone(), index)))
            .collect();
        if attributes.is_empty() {
            return Ok(None);
        }
        let name = class.name.clone();
        let mut section = Map::new();
        for (identifier, ty, index) in attributes {
            let value = process.heap.object(r)?.get(index)?.clone();
            section.insert(identifier, self.value(&value, &ty)?);
        }
        Ok(Some((name, section)))
    }
}

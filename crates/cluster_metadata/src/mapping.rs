use std::{
    fmt,
    sync::{
        Arc,
        LazyLock,
    },
};

use errors::ErrorMetadata;
use serde_json::{
    Map,
    Value,
};
use sha2::{
    Digest,
    Sha256,
};

/// Type name every mapping is stored under.
pub const SINGLE_MAPPING_NAME: &str = "_doc";

static EMPTY_MAPPING: LazyLock<Arc<MappingMetadata>> = LazyLock::new(|| {
    Arc::new(MappingMetadata::from_parts(
        SINGLE_MAPPING_NAME.to_owned(),
        Map::new(),
    ))
});

/// A document mapping together with the hash of its canonical form. Two
/// mappings are equal iff their type and hash are.
#[derive(Clone)]
pub struct MappingMetadata {
    type_name: String,
    source: Map<String, Value>,
    sha256: String,
    routing_required: bool,
}

impl MappingMetadata {
    /// `source` may either be the mapping body or the body wrapped in a single
    /// key named after `type_name`.
    pub fn new(type_name: impl Into<String>, source: Value) -> anyhow::Result<Self> {
        let type_name = type_name.into();
        let Value::Object(source) = source else {
            anyhow::bail!(ErrorMetadata::bad_request(
                "InvalidMapping",
                format!("mapping source for type [{type_name}] must be a JSON object"),
            ));
        };
        Ok(Self::from_parts(type_name, source))
    }

    pub fn from_json(source: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(source).map_err(|e| {
            ErrorMetadata::bad_request("InvalidMapping", format!("failed to parse mapping: {e}"))
        })?;
        Self::new(SINGLE_MAPPING_NAME, value)
    }

    fn from_parts(type_name: String, source: Map<String, Value>) -> Self {
        let sha256 = content_hash(&source);
        let routing_required = unwrap_type(&type_name, &source)
            .get("_routing")
            .and_then(|r| r.get("required"))
            .map(|required| match required {
                Value::Bool(b) => *b,
                Value::String(s) => s == "true",
                _ => false,
            })
            .unwrap_or(false);
        Self {
            type_name,
            source,
            sha256,
            routing_required,
        }
    }

    /// The shared mapping handed out for indices without one.
    pub fn empty() -> Arc<Self> {
        EMPTY_MAPPING.clone()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Source exactly as provided, including any type wrapper.
    pub fn source(&self) -> &Map<String, Value> {
        &self.source
    }

    /// Source with the type wrapper removed.
    pub fn source_as_map(&self) -> &Map<String, Value> {
        unwrap_type(&self.type_name, &self.source)
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn routing_required(&self) -> bool {
        self.routing_required
    }

    /// Prune every field under `properties` that `keep` rejects. Returns `None`
    /// when nothing could be pruned so callers can keep the shared instance.
    pub(crate) fn filter_fields(
        &self,
        keep: &(dyn Fn(&str) -> bool + Send + Sync),
    ) -> anyhow::Result<Option<MappingMetadata>> {
        let mut source = self.source.clone();
        let wrapped = is_wrapped(&self.type_name, &source);
        let body = if wrapped {
            match source.get_mut(&self.type_name) {
                Some(Value::Object(body)) => body,
                _ => return Ok(None),
            }
        } else {
            &mut source
        };
        match body.get_mut("properties") {
            Some(Value::Object(properties)) if !properties.is_empty() => {
                filter_properties("", properties, keep)?;
            },
            _ => return Ok(None),
        }
        Ok(Some(Self::from_parts(self.type_name.clone(), source)))
    }
}

impl PartialEq for MappingMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.sha256 == other.sha256
    }
}

impl Eq for MappingMetadata {}

impl fmt::Debug for MappingMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingMetadata")
            .field("type_name", &self.type_name)
            .field("sha256", &self.sha256)
            .finish()
    }
}

fn is_wrapped(type_name: &str, source: &Map<String, Value>) -> bool {
    source.len() == 1 && matches!(source.get(type_name), Some(Value::Object(_)))
}

fn unwrap_type<'a>(type_name: &str, source: &'a Map<String, Value>) -> &'a Map<String, Value> {
    match source.get(type_name) {
        Some(Value::Object(body)) if source.len() == 1 => body,
        _ => source,
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        },
        Value::Array(values) => Value::Array(values.iter().map(canonicalize).collect()),
        v => v.clone(),
    }
}

/// Hex SHA-256 over the mapping serialized with recursively sorted keys, so
/// the hash doesn't depend on the order fields were declared in.
fn content_hash(source: &Map<String, Value>) -> String {
    let canonical = canonicalize(&Value::Object(source.clone()));
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn merge_paths(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_owned()
    } else {
        format!("{path}.{field}")
    }
}

/// Returns true if every field under `fields` was removed, meaning the parent
/// object may be removed too.
fn filter_properties(
    path: &str,
    fields: &mut Map<String, Value>,
    keep: &(dyn Fn(&str) -> bool + Send + Sync),
) -> anyhow::Result<bool> {
    let names: Vec<String> = fields.keys().cloned().collect();
    for name in names {
        let field_path = merge_paths(path, &name);
        let Some(Value::Object(field)) = fields.get_mut(&name) else {
            anyhow::bail!(
                "cannot filter mappings, found unknown element at [{field_path}] that isn't an \
                 object"
            );
        };
        let mut may_remove = true;
        let mut is_multi_field = false;
        if let Some(properties) = field.get_mut("properties") {
            let Value::Object(properties) = properties else {
                anyhow::bail!("properties of [{field_path}] must be an object");
            };
            may_remove = filter_properties(&field_path, properties, keep)?;
        } else if let Some(sub_fields) = field.get_mut("fields") {
            let Value::Object(sub_fields) = sub_fields else {
                anyhow::bail!("fields of [{field_path}] must be an object");
            };
            is_multi_field = true;
            may_remove = filter_properties(&field_path, sub_fields, keep)?;
            if may_remove {
                field.remove("fields");
            }
        }
        if !keep(&field_path) {
            if may_remove {
                fields.remove(&name);
            } else if is_multi_field {
                // An excluded multi-field with surviving sub-fields becomes an
                // object holding them.
                if let Some(sub_fields) = field.remove("fields") {
                    field.insert("properties".to_owned(), sub_fields);
                }
                field.remove("type");
            }
        }
    }
    Ok(fields.is_empty())
}

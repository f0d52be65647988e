use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::content::ContentPart;
use crate::core::error::ToolError;

/// Arguments as carried in-process: a JSON object keyed by field name.
pub type Arguments = Map<String, Value>;

/// Minimal metadata every page tool exposes.
pub trait ToolSpec {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
}

/// Executable half of a tool. Handlers may suspend on I/O.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: &Arguments) -> Result<Value, ToolError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Object schema describing a tool's parameters.
///
/// The declared JSON is kept as registered and is what goes over the wire.
/// The typed view covers only what validation and argument checks need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSchema {
    kind: String,
    properties: BTreeMap<String, PropertySchema>,
    required: Vec<String>,
    declared: Map<String, Value>,
}

#[derive(Deserialize)]
struct SchemaView {
    #[serde(rename = "type", default = "object_kind")]
    kind: String,
    #[serde(default)]
    properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    required: Vec<String>,
}

fn object_kind() -> String {
    "object".into()
}

impl InputSchema {
    /// Parse declarative schema JSON, rejecting anything that is not an object schema.
    pub fn parse(value: Value) -> Result<Self, ToolError> {
        let Value::Object(mut declared) = value else {
            return Err(ToolError::InvalidDescriptor("input schema must be a JSON object".into()));
        };
        let view: SchemaView = serde_json::from_value(Value::Object(declared.clone()))
            .map_err(|e| ToolError::InvalidDescriptor(format!("malformed input schema: {e}")))?;
        declared.entry("type").or_insert_with(|| Value::String(object_kind()));
        declared.entry("properties").or_insert_with(|| Value::Object(Map::new()));
        declared.entry("required").or_insert_with(|| Value::Array(Vec::new()));
        let schema = Self {
            kind: view.kind,
            properties: view.properties,
            required: view.required,
            declared,
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertySchema> {
        &self.properties
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// The schema as registered, with `type`, `properties` and `required` filled in.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.declared
    }

    pub fn validate(&self) -> Result<(), ToolError> {
        if self.kind != "object" {
            return Err(ToolError::InvalidDescriptor(format!(
                "input schema type must be \"object\", got \"{}\"",
                self.kind
            )));
        }
        if let Some(missing) = self.required.iter().find(|f| !self.properties.contains_key(*f)) {
            return Err(ToolError::InvalidDescriptor(format!(
                "required field \"{missing}\" is not declared in properties"
            )));
        }
        Ok(())
    }

    /// Required-field presence plus a shallow JSON type check for declared fields.
    pub fn check(&self, arguments: &Arguments) -> Result<(), ToolError> {
        for field in &self.required {
            match arguments.get(field) {
                None | Some(Value::Null) => return Err(ToolError::missing_field(field)),
                Some(_) => {}
            }
        }
        for (field, value) in arguments {
            let Some(kind) = self.properties.get(field).and_then(|p| p.kind.as_deref()) else {
                continue;
            };
            if !value.is_null() && !matches_kind(kind, value) {
                return Err(ToolError::ValidationFailure {
                    field: field.clone(),
                    reason: format!("expected {kind} for field"),
                });
            }
        }
        Ok(())
    }
}

impl Serialize for InputSchema {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.declared.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InputSchema {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        InputSchema::parse(value).map_err(serde::de::Error::custom)
    }
}

fn matches_kind(kind: &str, value: &Value) -> bool {
    match kind {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

/// Declarative description of a tool, as seen by a discovering agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
    ) -> Result<Self, ToolError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ToolError::InvalidDescriptor("tool name cannot be empty".into()));
        }
        Ok(Self {
            name,
            description: description.into(),
            input_schema: InputSchema::parse(schema)?,
        })
    }

    pub fn from_spec<T: ToolSpec + ?Sized>(tool: &T) -> Result<Self, ToolError> {
        Self::new(tool.name(), tool.description(), tool.input_schema())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A single request to execute a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    #[serde(rename = "tool")]
    pub tool_name: String,
    #[serde(rename = "parameters", default)]
    pub arguments: Arguments,
}

impl InvocationRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Arguments) -> Self {
        Self { tool_name: tool_name.into(), arguments }
    }
}

/// Outcome of one invocation: exactly one of success or failure.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success { content: Vec<ContentPart> },
    Failure { error: ToolError },
}

impl InvocationResult {
    pub fn failure(error: ToolError) -> Self {
        InvocationResult::Failure { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success { .. })
    }

    /// Human-readable text: the first content part, or the failure message.
    pub fn message(&self) -> String {
        match self {
            InvocationResult::Success { content } => {
                content.first().map(|p| p.payload.clone()).unwrap_or_default()
            }
            InvocationResult::Failure { error } => error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    impl ToolSpec for Echo {
        fn name(&self) -> &'static str {
            "test_echo"
        }
        fn description(&self) -> &'static str {
            "echo tool"
        }
        fn input_schema(&self) -> Value {
            json!({"type":"object","properties":{"x":{"type":"integer"}},"required":["x"]})
        }
    }

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, args: &Arguments) -> Result<Value, ToolError> {
            Ok(Value::Object(args.clone()))
        }
    }

    fn args(v: Value) -> Arguments {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn it_runs_echo() {
        let out = Echo.call(&args(json!({"x":1}))).await.unwrap();
        assert_eq!(out["x"], 1);
    }

    #[test]
    fn descriptor_from_spec_serializes_wire_shape() {
        let d = ToolDescriptor::from_spec(&Echo).unwrap();
        let v = d.to_json();
        assert_eq!(v["name"], "test_echo");
        assert_eq!(v["inputSchema"]["type"], "object");
        assert_eq!(v["inputSchema"]["required"][0], "x");
    }

    #[test]
    fn schema_without_properties_is_an_empty_object_schema() {
        let s = InputSchema::parse(json!({"type":"object","properties":{}})).unwrap();
        assert!(s.properties().is_empty());
        assert!(s.required().is_empty());
        assert_eq!(s.as_map()["required"], json!([]));
    }

    #[test]
    fn listed_schema_keeps_everything_registered() {
        let schema = json!({
            "type": "object",
            "properties": {
                "priority": {"type": "string", "enum": ["low", "high"], "description": "p"},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["priority"],
            "additionalProperties": false
        });
        let d = ToolDescriptor::new("set_priority", "d", schema.clone()).unwrap();
        assert_eq!(d.to_json()["inputSchema"], schema);

        let back: ToolDescriptor = serde_json::from_value(d.to_json()).unwrap();
        assert_eq!(back, d);
        assert_eq!(back.input_schema.required(), ["priority".to_string()]);
    }

    #[test]
    fn wire_descriptors_with_bad_schemas_are_rejected() {
        let bad = json!({"name": "x", "description": "d", "inputSchema": {"type": "array"}});
        assert!(serde_json::from_value::<ToolDescriptor>(bad).is_err());
    }

    #[test]
    fn rejects_malformed_schemas() {
        assert!(InputSchema::parse(json!("object")).is_err());
        assert!(InputSchema::parse(json!({"type":"array"})).is_err());
        assert!(InputSchema::parse(json!({"type":"object","properties":[]})).is_err());
        assert!(InputSchema::parse(json!({"type":"object","required":[1]})).is_err());
        let err = InputSchema::parse(json!({"type":"object","required":["ghost"]})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidDescriptor(m) if m.contains("ghost")));
    }

    #[test]
    fn rejects_blank_names() {
        let err = ToolDescriptor::new("  ", "d", json!({"type":"object"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidDescriptor(_)));
    }

    #[test]
    fn check_reports_missing_and_mistyped_fields() {
        let schema = ToolDescriptor::from_spec(&Echo).unwrap().input_schema;
        let err = schema.check(&args(json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "missing required field: x");

        let err = schema.check(&args(json!({"x":"one"}))).unwrap_err();
        assert_eq!(err.to_string(), "expected integer for field: x");

        assert!(schema.check(&args(json!({"x":1,"extra":true}))).is_ok());
    }

    #[test]
    fn request_decodes_tool_and_defaults_parameters() {
        let r: InvocationRequest = serde_json::from_value(json!({"tool":"list_todos"})).unwrap();
        assert_eq!(r.tool_name, "list_todos");
        assert!(r.arguments.is_empty());
    }
}

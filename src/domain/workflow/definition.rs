//! Structured workflow definitions: step graph plus input/output schemas

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::validation::ValidationError;

/// Step types accepted in a definition document
pub const ALLOWED_STEP_TYPES: [&str; 6] = ["http", "script", "condition", "loop", "parallel", "custom"];

/// Field types accepted in input/output schemas
pub const ALLOWED_FIELD_TYPES: [&str; 6] =
    ["string", "number", "integer", "boolean", "array", "object"];

/// Schema map keyed by field name (ordered, so comparisons are deterministic)
pub type Schema = BTreeMap<String, SchemaField>;

/// Declared type of a schema field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of an input or output schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaField {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaField {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// HTTP call step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HttpStep {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub method: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// Inline script step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScriptStep {
    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Conditional branch step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConditionStep {
    #[serde(default)]
    pub expression: String,
}

/// Iteration step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LoopStep {
    /// Expression yielding the collection to iterate
    #[serde(default)]
    pub items: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
}

/// Fan-out step running named branches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ParallelStep {
    #[serde(default)]
    pub branches: Vec<String>,
}

/// Extension step with free-form configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CustomStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,

    #[serde(default)]
    pub config: Value,
}

/// Type-specific step configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Http(HttpStep),
    Script(ScriptStep),
    Condition(ConditionStep),
    Loop(LoopStep),
    Parallel(ParallelStep),
    Custom(CustomStep),
}

impl StepKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Script(_) => "script",
            Self::Condition(_) => "condition",
            Self::Loop(_) => "loop",
            Self::Parallel(_) => "parallel",
            Self::Custom(_) => "custom",
        }
    }
}

/// A named step in a workflow definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDefinition {
    pub name: String,

    #[serde(flatten)]
    pub kind: StepKind,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn http(name: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(
            name,
            StepKind::Http(HttpStep {
                url: url.into(),
                method: method.into(),
                headers: BTreeMap::new(),
            }),
        )
    }

    pub fn script(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(
            name,
            StepKind::Script(ScriptStep {
                source: source.into(),
                language: None,
            }),
        )
    }

    pub fn condition(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(
            name,
            StepKind::Condition(ConditionStep {
                expression: expression.into(),
            }),
        )
    }
}

/// Executable definition of a workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub steps: Vec<StepDefinition>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_schema: Schema,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub output_schema: Schema,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
            input_schema: Schema::new(),
            output_schema: Schema::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_input_field(mut self, name: impl Into<String>, field: SchemaField) -> Self {
        self.input_schema.insert(name.into(), field);
        self
    }

    pub fn with_output_field(mut self, name: impl Into<String>, field: SchemaField) -> Self {
        self.output_schema.insert(name.into(), field);
        self
    }

    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

/// Parse a raw definition document, reporting the first structural problem found.
///
/// Checks run in validator order: top-level `name`/`steps`, then each step's
/// `type`, then every schema entry's `type`. Typed deserialization happens last.
pub fn parse_definition(document: &Value) -> Result<WorkflowDefinition, ValidationError> {
    let object = document.as_object().ok_or_else(|| ValidationError::Malformed {
        field: "$".to_string(),
        message: "definition must be a JSON object".to_string(),
    })?;

    match object.get("name") {
        Some(Value::String(_)) => {}
        Some(_) => {
            return Err(ValidationError::Malformed {
                field: "name".to_string(),
                message: "must be a string".to_string(),
            });
        }
        None => return Err(ValidationError::MissingField("name".to_string())),
    }

    let steps = match object.get("steps") {
        Some(Value::Array(steps)) => steps,
        Some(_) => {
            return Err(ValidationError::Malformed {
                field: "steps".to_string(),
                message: "must be an array".to_string(),
            });
        }
        None => return Err(ValidationError::MissingField("steps".to_string())),
    };

    for (index, step) in steps.iter().enumerate() {
        let field = format!("steps[{}].type", index);
        let step_type = step.get("type").and_then(Value::as_str);

        match step_type {
            Some(t) if ALLOWED_STEP_TYPES.contains(&t) => {}
            Some(t) => {
                return Err(ValidationError::UnknownStepType {
                    field,
                    step_type: t.to_string(),
                });
            }
            None => return Err(ValidationError::MissingField(field)),
        }
    }

    for schema_key in ["input_schema", "output_schema"] {
        let Some(schema) = object.get(schema_key) else {
            continue;
        };

        let entries = schema.as_object().ok_or_else(|| ValidationError::Malformed {
            field: schema_key.to_string(),
            message: "must be an object".to_string(),
        })?;

        for (name, entry) in entries {
            let field = format!("{}.{}", schema_key, name);

            match entry.get("type").and_then(Value::as_str) {
                Some(t) if ALLOWED_FIELD_TYPES.contains(&t) => {}
                Some(t) => {
                    return Err(ValidationError::InvalidSchemaField {
                        field,
                        reason: format!("unsupported type '{}'", t),
                    });
                }
                None => {
                    return Err(ValidationError::InvalidSchemaField {
                        field,
                        reason: "missing 'type'".to_string(),
                    });
                }
            }
        }
    }

    serde_json::from_value(document.clone()).map_err(|e| ValidationError::Malformed {
        field: "$".to_string(),
        message: e.to_string(),
    })
}

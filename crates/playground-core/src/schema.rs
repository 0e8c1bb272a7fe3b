// Task schemas and the schema registry
//
// Decision: a validator is a tagged variant {Empty, Structured}. The structured
// variant captures a monomorphized validate function when the registry is built,
// so nothing inspects types at runtime.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

type ValidateFn = fn(Value) -> Result<Value, serde_json::Error>;

fn validate_as<T: Serialize + DeserializeOwned>(value: Value) -> Result<Value, serde_json::Error> {
    let typed: T = serde_json::from_value(value)?;
    serde_json::to_value(typed)
}

/// A serde-backed schema for one concrete Rust type
#[derive(Clone, Copy)]
pub struct StructuredSchema {
    type_name: &'static str,
    validate: ValidateFn,
}

impl StructuredSchema {
    /// Build a schema for `T`, named after the type
    pub fn of<T: Serialize + DeserializeOwned>() -> Self {
        let full = std::any::type_name::<T>();
        let type_name = full.rsplit("::").next().unwrap_or(full);
        Self::named::<T>(type_name)
    }

    /// Build a schema for `T` with an explicit name
    pub fn named<T: Serialize + DeserializeOwned>(type_name: &'static str) -> Self {
        Self {
            type_name,
            validate: validate_as::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Decode `value` into the schema type and re-encode its normalized form
    ///
    /// Missing required fields and wrong field types are rejected; declared
    /// defaults are filled in.
    pub fn validate(&self, value: Value) -> Result<Value, serde_json::Error> {
        (self.validate)(value)
    }
}

impl fmt::Debug for StructuredSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredSchema")
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl PartialEq for StructuredSchema {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl Eq for StructuredSchema {}

/// Input or output validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validator {
    /// No input: any payload is ignored
    #[default]
    Empty,
    /// Payload must match a structured schema
    Structured(StructuredSchema),
}

impl Validator {
    pub const EMPTY_NAME: &'static str = "EmptyModel";

    pub fn structured<T: Serialize + DeserializeOwned>() -> Self {
        Validator::Structured(StructuredSchema::of::<T>())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Validator::Empty => Self::EMPTY_NAME,
            Validator::Structured(schema) => schema.type_name(),
        }
    }

    /// Canonical value produced by the Empty validator
    pub fn empty_value() -> Value {
        Value::Object(Map::new())
    }

    /// Shape `payload` according to this validator
    pub fn apply(&self, payload: &Map<String, Value>) -> Result<Value, serde_json::Error> {
        match self {
            Validator::Empty => Ok(Self::empty_value()),
            Validator::Structured(schema) => schema.validate(Value::Object(payload.clone())),
        }
    }
}

/// Input validator plus optional output validator for one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskSchema {
    pub input: Validator,
    pub output: Option<Validator>,
}

impl TaskSchema {
    pub fn new(input: Validator) -> Self {
        Self {
            input,
            output: None,
        }
    }

    pub fn with_output(mut self, output: Validator) -> Self {
        self.output = Some(output);
        self
    }
}

/// Static mapping from task name to schema
///
/// Advisory for client-side payload shaping: unknown names resolve to the
/// default (no-input) schema rather than failing.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, TaskSchema>,
    fallback: TaskSchema,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    pub fn resolve(&self, task_name: &str) -> &TaskSchema {
        self.schemas.get(task_name).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, task_name: &str) -> bool {
        self.schemas.contains_key(task_name)
    }

    /// Registered task names, sorted
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Builder for SchemaRegistry
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    schemas: HashMap<String, TaskSchema>,
}

impl SchemaRegistryBuilder {
    pub fn register(mut self, task_name: impl Into<String>, schema: TaskSchema) -> Self {
        let task_name = task_name.into();
        if self.schemas.insert(task_name.clone(), schema).is_some() {
            tracing::warn!(task_name = %task_name, "Task schema registered twice, keeping the last one");
        }
        self
    }

    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            schemas: self.schemas,
            fallback: TaskSchema::default(),
        }
    }
}

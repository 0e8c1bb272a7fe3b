// Schema catalog and the default task registry
//
// Registry entries refer to validators by schema name. The catalog turns a
// name into a Validator; a name it does not know is a configuration bug and
// fails registry construction with UnsupportedSchema.

use playground_core::{Result, RunnerError, SchemaRegistry, TaskSchema, Validator};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

use crate::tasks::*;

/// One registry entry: task name plus the schema names of its input/output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSchemaEntry {
    pub task_name: &'static str,
    pub input: &'static str,
    pub output: Option<&'static str>,
}

/// Schemas declared for the tasks the playground workers host
pub const TASK_SCHEMAS: &[TaskSchemaEntry] = &[
    TaskSchemaEntry {
        task_name: "externally-triggered-task",
        input: "ExternallyTriggeredTaskInput",
        output: Some("ExternallyTriggeredTaskOutput"),
    },
    TaskSchemaEntry {
        task_name: "first-workflow",
        input: Validator::EMPTY_NAME,
        output: None,
    },
    TaskSchemaEntry {
        task_name: "say_hello",
        input: "SayHelloInput",
        output: Some("SayHelloOutput"),
    },
    TaskSchemaEntry {
        task_name: "sync-sleep-task",
        input: Validator::EMPTY_NAME,
        output: None,
    },
    TaskSchemaEntry {
        task_name: "cpu-heavy-with-process-pool",
        input: Validator::EMPTY_NAME,
        output: None,
    },
    TaskSchemaEntry {
        task_name: "chat-otel",
        input: "ChatOtelInput",
        output: Some("ChatOtelOutput"),
    },
];

/// Name -> validator lookup
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    validators: HashMap<&'static str, Validator>,
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl SchemaCatalog {
    /// Catalog with only the empty validator
    pub fn new() -> Self {
        let mut validators = HashMap::new();
        validators.insert(Validator::EMPTY_NAME, Validator::Empty);
        Self { validators }
    }

    /// Catalog of every schema type in this crate
    pub fn standard() -> Self {
        Self::new()
            .with::<ExternallyTriggeredTaskInput>()
            .with::<ExternallyTriggeredTaskOutput>()
            .with::<SayHelloInput>()
            .with::<SayHelloOutput>()
            .with::<ChatOtelInput>()
            .with::<ChatOtelOutput>()
    }

    /// Add a structured schema, keyed by its type name
    pub fn with<T: Serialize + DeserializeOwned>(mut self) -> Self {
        let validator = Validator::structured::<T>();
        self.validators.insert(validator.name(), validator);
        self
    }

    pub fn validator(&self, name: &str) -> Result<Validator> {
        self.validators
            .get(name)
            .copied()
            .ok_or_else(|| RunnerError::UnsupportedSchema(name.to_string()))
    }

    pub fn build_registry(&self, entries: &[TaskSchemaEntry]) -> Result<SchemaRegistry> {
        let mut builder = SchemaRegistry::builder();
        for entry in entries {
            let mut schema = TaskSchema::new(self.validator(entry.input)?);
            if let Some(output) = entry.output {
                schema = schema.with_output(self.validator(output)?);
            }
            builder = builder.register(entry.task_name, schema);
        }

        let registry = builder.build();
        tracing::debug!(tasks = ?registry.task_names(), "Built task schema registry");
        Ok(registry)
    }
}

/// Registry for all tasks the playground workers host
pub fn default_registry() -> Result<SchemaRegistry> {
    SchemaCatalog::standard().build_registry(TASK_SCHEMAS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_declares_all_tasks() {
        let registry = default_registry().unwrap();
        assert_eq!(
            registry.task_names(),
            vec![
                "chat-otel",
                "cpu-heavy-with-process-pool",
                "externally-triggered-task",
                "first-workflow",
                "say_hello",
                "sync-sleep-task",
            ]
        );
    }

    #[test]
    fn test_resolve_declared_pairs() {
        let registry = default_registry().unwrap();

        let say_hello = registry.resolve("say_hello");
        assert_eq!(say_hello.input.name(), "SayHelloInput");
        assert_eq!(say_hello.output.map(|v| v.name()), Some("SayHelloOutput"));

        let sleep = registry.resolve("sync-sleep-task");
        assert_eq!(sleep.input, Validator::Empty);
        assert!(sleep.output.is_none());

        let chat = registry.resolve("chat-otel");
        assert_eq!(chat.input.name(), "ChatOtelInput");

        assert_eq!(registry.resolve("no-such-task"), &TaskSchema::default());
    }

    #[test]
    fn test_unknown_schema_name_is_unsupported() {
        let err = SchemaCatalog::standard()
            .validator("PydanticThing")
            .unwrap_err();
        assert!(matches!(err, RunnerError::UnsupportedSchema(ref name) if name == "PydanticThing"));
        assert_eq!(
            err.to_string(),
            "Unsupported input validator type: PydanticThing"
        );
    }

    #[test]
    fn test_build_registry_fails_on_unknown_schema() {
        let entries = [TaskSchemaEntry {
            task_name: "broken",
            input: "Missing",
            output: None,
        }];
        let result = SchemaCatalog::standard().build_registry(&entries);
        assert!(matches!(result, Err(RunnerError::UnsupportedSchema(_))));
    }
}

// Output formatting for the CLI

use anyhow::Result;
use clap::ValueEnum;
use playground_core::Outcome;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

#[derive(Serialize)]
struct TaskList<'a> {
    tasks: &'a [String],
}

impl OutputFormat {
    pub fn render_value<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(match self {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            _ => serde_json::to_string_pretty(value)?,
        })
    }

    /// Task names: one per line as text, `{"tasks": [...]}` otherwise
    pub fn render_task_list(&self, names: &[String]) -> Result<String> {
        match self {
            OutputFormat::Text => Ok(names.join("\n")),
            _ => self.render_value(&TaskList { tasks: names }),
        }
    }

    pub fn render_outcome(&self, outcome: &Outcome) -> Result<String> {
        match self {
            OutputFormat::Text => {
                let mut lines = vec![
                    field("workflow_run_id", &outcome.workflow_run_id),
                    field("status", outcome.status.as_str()),
                ];
                if let Some(result) = &outcome.result {
                    lines.push(field("result", &serde_json::to_string(result)?));
                }
                Ok(lines.join("\n"))
            }
            _ => self.render_value(outcome),
        }
    }
}

fn field(label: &str, value: &str) -> String {
    format!("{:<16} {}", format!("{}:", label), value)
}

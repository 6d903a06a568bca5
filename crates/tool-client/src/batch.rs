//! Run every registered tool once with canonical arguments.

use crate::defaults::DefaultTable;
use serde_json::Value;
use toolhub_tool_registry::{InvocationError, ToolArgs, ToolRegistry};

#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub tool: String,
    pub arguments: ToolArgs,
    pub outcome: Result<Value, InvocationError>,
}

impl BatchEntry {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of a batch run, in registration order.
#[derive(Debug, Clone, Default)]
pub struct BatchRunReport {
    entries: Vec<BatchEntry>,
}

impl BatchRunReport {
    #[must_use]
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, tool: &str) -> Option<&BatchEntry> {
        self.entries.iter().find(|e| e.tool == tool)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.succeeded()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}

/// Invoke each tool sequentially; `on_entry(index, total, entry)` sees each outcome as it lands.
///
/// Failures are recorded and the run continues.
pub async fn run_all<F>(
    registry: &ToolRegistry,
    defaults: &DefaultTable,
    mut on_entry: F,
) -> BatchRunReport
where
    F: FnMut(usize, usize, &BatchEntry),
{
    let total = registry.len();
    let mut report = BatchRunReport::default();
    for (i, descriptor) in registry.list().enumerate() {
        let arguments = defaults.arguments_for(descriptor);
        let outcome = registry.invoke(&descriptor.name, &arguments).await;
        if let Err(e) = &outcome {
            tracing::debug!(tool = %descriptor.name, error = %e, "batch call failed");
        }
        let entry = BatchEntry {
            tool: descriptor.name.clone(),
            arguments,
            outcome,
        };
        on_entry(i + 1, total, &entry);
        report.entries.push(entry);
    }
    report
}

//! Menu-driven tool execution over a [`Console`].
//!
//! Ctrl-C or EOF at any prompt abandons the current step and goes back to the tool menu. A call
//! that has already been sent runs to completion.

use crate::batch::{BatchRunReport, run_all};
use crate::console::{Console, ConsoleInput};
use crate::defaults::DefaultTable;
use crate::ui::{Ui, render_result};
use serde_json::Value;
use toolhub_tool_registry::{ParamSpec, ParamType, ToolArgs, ToolDescriptor, ToolRegistry};

/// Drives guided and batch runs against one registry.
pub struct InteractiveExecutor<'a, C: Console + ?Sized> {
    registry: &'a ToolRegistry,
    defaults: &'a DefaultTable,
    console: &'a mut C,
    ui: Ui,
}

/// Result of a numbered-menu prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MenuChoice {
    Back,
    /// Zero-based index of the chosen option.
    Item(usize),
}

/// Read a menu choice in `1..=options`; `0`, Ctrl-C and EOF mean back.
pub(crate) async fn choose<C: Console + ?Sized>(
    console: &mut C,
    ui: Ui,
    options: usize,
) -> anyhow::Result<MenuChoice> {
    loop {
        let line = match console.read_line("\nEnter choice: ").await? {
            ConsoleInput::Line(l) => l,
            ConsoleInput::Interrupted | ConsoleInput::Eof => return Ok(MenuChoice::Back),
        };
        match line.trim().parse::<usize>() {
            Ok(0) => return Ok(MenuChoice::Back),
            Ok(n) if n <= options => return Ok(MenuChoice::Item(n - 1)),
            Ok(_) => console.write_line(
                &ui.error(&format!("Please enter a number between 1 and {options}")),
            ),
            Err(_) => console.write_line(&ui.error("Please enter a valid number")),
        }
    }
}

impl<'a, C: Console + ?Sized> InteractiveExecutor<'a, C> {
    pub fn new(
        registry: &'a ToolRegistry,
        defaults: &'a DefaultTable,
        console: &'a mut C,
        ui: Ui,
    ) -> Self {
        Self {
            registry,
            defaults,
            console,
            ui,
        }
    }

    fn say(&mut self, text: &str) {
        self.console.write_line(text);
    }

    /// `None` when the user interrupted or input ended.
    async fn prompt(&mut self, text: &str) -> anyhow::Result<Option<String>> {
        match self.console.read_line(text).await? {
            ConsoleInput::Line(l) => Ok(Some(l)),
            ConsoleInput::Interrupted => {
                let msg = self.ui.warning("Cancelled");
                self.say(&msg);
                Ok(None)
            }
            ConsoleInput::Eof => Ok(None),
        }
    }

    async fn confirm(&mut self, question: &str) -> anyhow::Result<Option<bool>> {
        Ok(self.prompt(&format!("\n{question} (y/n): ")).await?.map(|a| {
            let a = a.trim();
            a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes")
        }))
    }

    async fn pause(&mut self, text: &str) -> anyhow::Result<bool> {
        Ok(self.prompt(&format!("\n{text}")).await?.is_some())
    }

    /// Tool menu loop; returns when the user goes back.
    pub async fn tool_menu(&mut self, server: &str) -> anyhow::Result<()> {
        loop {
            let header = self.ui.header(&format!("{server} tools"));
            self.say(&header);
            let names: Vec<(String, String)> = self
                .registry
                .list()
                .map(|d| (d.name.clone(), d.description.clone()))
                .collect();
            for (i, (name, description)) in names.iter().enumerate() {
                let line = format!("  {}. {}", i + 1, self.ui.emphasis(name));
                self.say(&line);
                if !description.is_empty() {
                    self.say(&format!("     {description}"));
                }
            }
            let run_all_line = format!(
                "  {}. {}",
                names.len() + 1,
                self.ui.emphasis("RUN ALL TOOLS (with default values)")
            );
            self.say(&run_all_line);
            self.say("  0. Back");

            match choose(&mut *self.console, self.ui, names.len() + 1).await? {
                MenuChoice::Back => return Ok(()),
                MenuChoice::Item(i) if i == names.len() => {
                    self.batch_run(server).await?;
                }
                MenuChoice::Item(i) => {
                    self.guided_run(&names[i].0).await?;
                }
            }
        }
    }

    /// Prompt for one value per declared parameter. `None` when aborted.
    pub async fn collect_arguments(
        &mut self,
        descriptor: &ToolDescriptor,
    ) -> anyhow::Result<Option<ToolArgs>> {
        let mut args = ToolArgs::new();
        if descriptor.parameters.is_empty() {
            let msg = self.ui.info("This tool takes no parameters");
            self.say(&msg);
            return Ok(Some(args));
        }

        let section = self.ui.section("Parameters (* = required)");
        self.say(&section);
        for spec in &descriptor.parameters {
            loop {
                self.say(&parameter_banner(spec));
                let Some(input) = self.prompt("  Value: ").await? else {
                    return Ok(None);
                };
                let input = input.trim();
                if input.is_empty() {
                    if spec.required {
                        let msg = self.ui.error("This parameter is required!");
                        self.say(&msg);
                        continue;
                    }
                    break;
                }
                match parse_input(spec, input) {
                    Ok(value) => {
                        args.insert(spec.name.clone(), value);
                        break;
                    }
                    Err(reason) => {
                        let msg = self.ui.error(&format!(
                            "Invalid value for type {}: {reason}",
                            spec.param_type
                        ));
                        self.say(&msg);
                    }
                }
            }
        }
        Ok(Some(args))
    }

    /// Prompt, confirm, invoke and print one tool. Parameter errors offer re-entry.
    pub async fn guided_run(&mut self, name: &str) -> anyhow::Result<()> {
        let Some(descriptor) = self.registry.describe(name).cloned() else {
            let msg = self.ui.error(&format!("Unknown tool '{name}'"));
            self.say(&msg);
            return Ok(());
        };
        let section = self.ui.section(&format!("Tool: {name}"));
        self.say(&section);
        if !descriptor.description.is_empty() {
            self.say(&descriptor.description);
        }

        loop {
            let Some(args) = self.collect_arguments(&descriptor).await? else {
                return Ok(());
            };

            let section = self.ui.section("Execution Summary");
            self.say(&section);
            self.say(&format!("Tool: {name}"));
            if args.is_empty() {
                self.say("No arguments");
            } else {
                self.say(&format!(
                    "Arguments:\n{}",
                    render_result(&Value::Object(args.clone()))
                ));
            }
            match self.confirm("Execute?").await? {
                Some(true) => {}
                Some(false) => {
                    let msg = self.ui.warning("Execution cancelled");
                    self.say(&msg);
                    return Ok(());
                }
                None => return Ok(()),
            }

            let msg = self.ui.info("Executing...");
            self.say(&msg);
            match self.registry.invoke(name, &args).await {
                Ok(result) => {
                    let header = self.ui.header(&format!("Tool Result: {name}"));
                    self.say(&header);
                    self.say(&render_result(&result));
                }
                Err(e) => {
                    let msg = self.ui.error(&format!("{name} failed: {e}"));
                    self.say(&msg);
                    if e.is_parameter_error()
                        && self.confirm("Re-enter parameters?").await? == Some(true)
                    {
                        continue;
                    }
                }
            }
            self.pause("Press Enter to continue...").await?;
            return Ok(());
        }
    }

    /// Confirm, then run every tool with canonical values and offer a per-tool drill-down.
    /// `None` when the user declined.
    pub async fn batch_run(&mut self, server: &str) -> anyhow::Result<Option<BatchRunReport>> {
        let header = self.ui.header(&format!("Running All Tools on {server}"));
        self.say(&header);
        let msg = self.ui.warning(&format!(
            "This will execute all {} tools with default test values",
            self.registry.len()
        ));
        self.say(&msg);
        if self.confirm("Continue?").await? != Some(true) {
            return Ok(None);
        }

        let ui = self.ui;
        let console = &mut *self.console;
        let report = run_all(self.registry, self.defaults, |i, total, entry| {
            console.write_line(&ui.section(&format!("[{i}/{total}] Testing: {}", entry.tool)));
            for (k, v) in &entry.arguments {
                console.write_line(&format!("  {k}: {v}"));
            }
            match &entry.outcome {
                Ok(_) => console.write_line(&ui.success(&format!("{} succeeded", entry.tool))),
                Err(e) => console.write_line(&ui.error(&format!("{} failed: {e}", entry.tool))),
            }
        })
        .await;

        let header = self.ui.header("Execution Summary");
        self.say(&header);
        let ok = self.ui.success(&format!("Successful: {}", report.succeeded()));
        let failed = self.ui.error(&format!("Failed: {}", report.failed()));
        self.say(&ok);
        self.say(&failed);

        if !report.is_empty() && self.confirm("Show detailed results?").await? == Some(true) {
            self.browse_results(&report).await?;
        }
        Ok(Some(report))
    }

    /// Pick single batch results by number, or walk through all of them.
    async fn browse_results(&mut self, report: &BatchRunReport) -> anyhow::Result<()> {
        let total = report.len();
        loop {
            let section = self.ui.section("Detailed Results");
            self.say(&section);
            for (i, entry) in report.entries().iter().enumerate() {
                let line = if entry.succeeded() {
                    self.ui.success(&entry.tool)
                } else {
                    self.ui.error(&entry.tool)
                };
                self.say(&format!("  {}. {line}", i + 1));
            }
            self.say(&format!("  {}. Show all (one by one)", total + 1));
            self.say("  0. Back");

            match choose(&mut *self.console, self.ui, total + 1).await? {
                MenuChoice::Back => return Ok(()),
                MenuChoice::Item(i) if i < total => self.show_entry(report, i),
                MenuChoice::Item(_) => {
                    for i in 0..total {
                        self.show_entry(report, i);
                        if i + 1 < total && !self.pause("Press Enter for next...").await? {
                            break;
                        }
                    }
                }
            }
        }
    }

    fn show_entry(&mut self, report: &BatchRunReport, index: usize) {
        let Some(entry) = report.entries().get(index) else {
            return;
        };
        let section = self
            .ui
            .section(&format!("[{}/{}] {}", index + 1, report.len(), entry.tool));
        self.say(&section);
        match &entry.outcome {
            Ok(v) => self.say(&render_result(v)),
            Err(e) => {
                let msg = self.ui.error(&e.to_string());
                self.say(&msg);
            }
        }
    }
}

fn parameter_banner(spec: &ParamSpec) -> String {
    let marker = if spec.required { "*" } else { " " };
    let mut out = format!("\n{marker} {} ({})", spec.name, spec.param_type);
    if !spec.description.is_empty() {
        out.push_str(&format!("\n  {}", spec.description));
    }
    if let Some(d) = &spec.default {
        out.push_str(&format!("\n  Default: {d}"));
    }
    out
}

/// Coerce console text; arrays also accept a JSON array literal.
fn parse_input(spec: &ParamSpec, input: &str) -> Result<Value, String> {
    if spec.param_type == ParamType::Array
        && input.starts_with('[')
        && let Ok(v @ Value::Array(_)) = serde_json::from_str::<Value>(input)
    {
        return spec.coerce(&v);
    }
    spec.coerce(&Value::String(input.to_string()))
}

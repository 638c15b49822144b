//! Offline scaffolding agent
//!
//! Writes a minimal static web project (page, stylesheet, script) that embeds
//! the prompt. Used when no external agent is configured, and as a
//! deterministic agent in tests.

use async_trait::async_trait;
use forge_core::Result;
use forge_sandbox::Toolbox;
use tracing::info;

use crate::agent::{Agent, AgentTask, StepBudget};

/// Deterministic agent producing `index.html`, `style.css` and `script.js`
#[derive(Debug, Clone, Default)]
pub struct ScaffoldAgent;

impl ScaffoldAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for ScaffoldAgent {
    fn name(&self) -> &str {
        "scaffold"
    }

    async fn run(&self, task: AgentTask, tools: Toolbox) -> Result<()> {
        let mut budget = StepBudget::new(task.recursion_limit);
        let title = escape_html(&task.user_prompt);

        let files = [
            ("index.html", render_index(&title)),
            ("style.css", STYLE.to_string()),
            ("script.js", render_script(&task.project_id)),
        ];

        for (path, content) in files {
            budget.take()?;
            tools.write_file(path, &content).await?;
        }

        budget.take()?;
        let written = tools.list_files(".").await?;
        info!(
            "Scaffolded project {} with {} files",
            task.project_id,
            written.len()
        );

        Ok(())
    }
}

const STYLE: &str = "body {
    font-family: system-ui, sans-serif;
    margin: 0 auto;
    max-width: 48rem;
    padding: 2rem;
}

h1 {
    font-size: 1.5rem;
}
";

fn render_index(title: &str) -> String {
    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
    <meta charset=\"utf-8\">
    <title>{title}</title>
    <link rel=\"stylesheet\" href=\"style.css\">
</head>
<body>
    <h1>{title}</h1>
    <p id=\"status\"></p>
    <script src=\"script.js\"></script>
</body>
</html>
"
    )
}

fn render_script(project_id: &str) -> String {
    format!(
        "document.getElementById('status').textContent = 'Project {project_id} is ready.';\n"
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

//! System prompt rendering for built agents.
//!
//! Every agent gets the same base prompt with four slots filled from its
//! spec: persona, guidelines, expected output, and context. The reserved
//! `__system__` context key carries runtime information injected at
//! build time (currently the build timestamp).

use crate::workflow::schema::AgentSpec;

/// Context key reserved for runtime-injected values. User-supplied
/// context under this key is overwritten at build time.
pub const SYSTEM_CONTEXT_KEY: &str = "__system__";

const BASE_PROMPT: &str = "\
You are {persona}.

Follow these guidelines when executing your task:
{guidelines}

Your output must match this description:
{output}

Additional context:
{context}
";

/// Render the full system instructions for one agent spec.
pub fn render(spec: &AgentSpec) -> String {
    let guidelines = if spec.guidelines.is_empty() {
        "- None".to_string()
    } else {
        spec.guidelines
            .iter()
            .map(|g| format!("- {}", g))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let output = if spec.expected_output.trim().is_empty() {
        "A clear, complete answer to the task.".to_string()
    } else {
        spec.expected_output.clone()
    };

    let mut context = format!(
        "- The time is: {}\n",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );
    if let Some(system) = spec.context.get(SYSTEM_CONTEXT_KEY).and_then(|v| v.as_str()) {
        context.push_str(&format!("- {}\n", system));
    }
    for (key, value) in &spec.context {
        if key == SYSTEM_CONTEXT_KEY {
            continue;
        }
        let rendered = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        context.push_str(&format!("- {}: {}\n", key, rendered));
    }

    BASE_PROMPT
        .replace("{persona}", &spec.persona)
        .replace("{guidelines}", &guidelines)
        .replace("{output}", &output)
        .replace("{context}", &context)
}

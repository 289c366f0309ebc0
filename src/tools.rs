use crate::protocol::Variant;
use serde_json::Value;

struct ToolPhrasing {
    name: &'static str,
    field: &'static str,
    stream: &'static str,
    console: &'static str,
    stream_limit: Option<usize>,
}

const BASH_PREVIEW_CHARS: usize = 50;

static KNOWN_TOOLS: [ToolPhrasing; 6] = [
    ToolPhrasing {
        name: "Read",
        field: "file_path",
        stream: "Reading",
        console: "Reading file",
        stream_limit: None,
    },
    ToolPhrasing {
        name: "Edit",
        field: "file_path",
        stream: "Editing",
        console: "Editing file",
        stream_limit: None,
    },
    ToolPhrasing {
        name: "Write",
        field: "file_path",
        stream: "Creating",
        console: "Creating file",
        stream_limit: None,
    },
    ToolPhrasing {
        name: "Glob",
        field: "pattern",
        stream: "Finding files",
        console: "Searching for files",
        stream_limit: None,
    },
    ToolPhrasing {
        name: "Grep",
        field: "pattern",
        stream: "Searching for",
        console: "Searching code for",
        stream_limit: None,
    },
    ToolPhrasing {
        name: "Bash",
        field: "command",
        stream: "Running",
        console: "Running command",
        stream_limit: Some(BASH_PREVIEW_CHARS),
    },
];

/// Human-readable line describing a tool invocation.
///
/// Missing input fields render as `undefined`.
pub fn summarize(tool: &str, input: &Value, variant: Variant) -> String {
    let Some(phrasing) = KNOWN_TOOLS.iter().find(|known| known.name == tool) else {
        return match variant {
            Variant::Stream => format!("Using: {tool}"),
            Variant::Console => format!("Using tool: {tool}"),
        };
    };

    let value = input.get(phrasing.field);
    let mut arg = render_field(value);
    let (label, limit) = match variant {
        Variant::Stream => (phrasing.stream, phrasing.stream_limit),
        Variant::Console => (phrasing.console, None),
    };
    // an absent value is never sliced
    if let (Some(limit), Some(_)) = (limit, value) {
        arg = arg.chars().take(limit).collect();
    }
    format!("{label}: {arg}")
}

fn render_field(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stream(tool: &str, input: Value) -> String {
        summarize(tool, &input, Variant::Stream)
    }

    #[test]
    fn known_tools_use_their_templates() {
        assert_eq!(stream("Read", json!({"file_path": "a.py"})), "Reading: a.py");
        assert_eq!(stream("Edit", json!({"file_path": "a.py"})), "Editing: a.py");
        assert_eq!(stream("Write", json!({"file_path": "b.py"})), "Creating: b.py");
        assert_eq!(stream("Glob", json!({"pattern": "**/*.rs"})), "Finding files: **/*.rs");
        assert_eq!(stream("Grep", json!({"pattern": "TODO"})), "Searching for: TODO");
        assert_eq!(stream("Bash", json!({"command": "ls -la"})), "Running: ls -la");
    }

    #[test]
    fn bash_command_is_cut_to_fifty_chars() {
        let command = "echo ".repeat(20);
        let summary = stream("Bash", json!({ "command": command }));
        assert_eq!(summary, format!("Running: {}", &command[..50]));
    }

    #[test]
    fn unknown_tool_falls_back_to_name() {
        assert_eq!(stream("WebFetch", json!({"url": "x"})), "Using: WebFetch");
        assert_eq!(
            summarize("WebFetch", &json!({}), Variant::Console),
            "Using tool: WebFetch"
        );
    }

    #[test]
    fn missing_fields_render_as_undefined() {
        assert_eq!(stream("Read", json!({})), "Reading: undefined");
        assert_eq!(stream("Bash", Value::Null), "Running: undefined");
        assert_eq!(stream("Grep", json!({"pattern": null})), "Searching for: null");
    }

    #[test]
    fn console_phrasing_keeps_full_command() {
        let command = "x".repeat(80);
        let input = json!({ "command": command });
        assert_eq!(
            summarize("Bash", &input, Variant::Console),
            format!("Running command: {command}")
        );
        assert_eq!(
            summarize("Read", &json!({"file_path": "a.py"}), Variant::Console),
            "Reading file: a.py"
        );
    }
}

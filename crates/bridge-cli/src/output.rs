//! Output formatting for the CLI.

use clap::ValueEnum;
use serde::Serialize;
use serde_json::json;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to encode output: {}", e),
    }
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    println!("{}", success_line(message, format));
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    eprintln!("{}", error_line(message, format));
}

fn success_line(message: &str, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Text => message.to_string(),
        OutputFormat::Json => json!({ "status": "success", "message": message }).to_string(),
    }
}

fn error_line(message: &str, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("Error: {}", message),
        OutputFormat::Json => json!({ "status": "error", "message": message }).to_string(),
    }
}

/// Print a table row.
pub fn print_row(label: &str, value: &str) {
    println!("{}", row(label, value));
}

fn row(label: &str, value: &str) -> String {
    format!("  {:<16} {}", format!("{}:", label), value)
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "-".repeat(50));
}

/// Print a heading.
pub fn print_heading(text: &str) {
    println!("\n{}", text);
    print_divider();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_lines_escape_messages() {
        let line = success_line(r#"said "hi""#, &OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], r#"said "hi""#);

        let line = error_line("boom", &OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["status"], "error");
    }

    #[test]
    fn test_text_lines() {
        assert_eq!(success_line("done", &OutputFormat::Text), "done");
        assert_eq!(error_line("boom", &OutputFormat::Text), "Error: boom");
        assert_eq!(row("Email", "a@b.c"), "  Email:           a@b.c");
    }
}

//! Output formatting for diagnostics and rendered templates.
//!
//! Rendered output and generated source go to stdout; in human format,
//! diagnostics and the summary go to stderr so the output can be piped.

use crate::cli::OutputFormat;
use crate::orchestrator::{Failure, RunResult};
use camino::Utf8Path;
use tmpl_runtime::RenderError;

/// Formatter for diagnostic output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a template file that failed to load or compile.
    pub fn print_failure(&self, file: &Utf8Path, failure: &Failure) {
        let (code, message, directive) = match failure {
            Failure::Load(message) => ("load", message.clone(), None),
            Failure::Compile(err) => (
                err.code.as_str(),
                err.message.clone(),
                Some(err.directive.as_str()),
            ),
        };

        match self.format {
            OutputFormat::Human => {
                let location = directive
                    .map(|d| format!(" in `{}`", d))
                    .unwrap_or_default();
                eprintln!(
                    "{}: \x1b[31merror\x1b[0m[{}]: {}{}",
                    file, code, message, location
                );
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "compile",
                    "file": file.as_str(),
                    "code": code,
                    "message": message,
                    "directive": directive
                });
                println!("{}", json);
            }
            OutputFormat::Machine => {
                println!(
                    "{}:error:{}:{}",
                    file,
                    code,
                    message.replace(':', "\\:")
                );
            }
        }
    }

    /// Print an error raised while rendering the entry template.
    pub fn print_render_error(&self, entry: &str, error: &RenderError) {
        match self.format {
            OutputFormat::Human => {
                eprintln!("{}: \x1b[31merror\x1b[0m[render]: {}", entry, error);
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "render",
                    "template": entry,
                    "message": error.to_string()
                });
                println!("{}", json);
            }
            OutputFormat::Machine => {
                println!(
                    "{}:error:render:{}",
                    entry,
                    error.to_string().replace(':', "\\:")
                );
            }
        }
    }

    /// Print the rendered output of the entry template.
    pub fn print_output(&self, entry: &str, output: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", output),
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "output",
                    "template": entry,
                    "output": output
                });
                println!("{}", json);
            }
            // exact bytes
            OutputFormat::Machine => print!("{}", output),
        }
    }

    /// Print the generated source of a template.
    pub fn print_source(&self, name: &str, source: &str) {
        match self.format {
            OutputFormat::Human => {
                println!("\x1b[2m// {}\x1b[0m", name);
                println!("{}", source);
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "source",
                    "template": name,
                    "source": source
                });
                println!("{}", json);
            }
            OutputFormat::Machine => print!("{}", source),
        }
    }

    /// Print the summary.
    pub fn print_summary(&self, result: &RunResult) {
        match self.format {
            OutputFormat::Human => self.print_summary_human(result),
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "summary",
                    "templates": result.template_count,
                    "errors": result.error_count,
                    "duration_ms": result.duration_ms
                });
                println!("{}", json);
            }
            OutputFormat::Machine => {
                // No summary for machine format
            }
        }
    }

    fn print_summary_human(&self, result: &RunResult) {
        eprintln!();
        if result.error_count == 0 {
            eprintln!(
                "\x1b[32m✓\x1b[0m Compiled {} template{} ({}ms)",
                result.template_count,
                plural(result.template_count),
                result.duration_ms
            );
        } else {
            eprintln!(
                "\x1b[31m✗\x1b[0m Found {} error{} in {} template{}",
                result.error_count,
                plural(result.error_count),
                result.template_count,
                plural(result.template_count)
            );
            eprintln!("Time: {}ms", result.duration_ms);
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// tmpl compiler - compile parse trees and render templates
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tmplc")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Template to render, named by its path relative to the template directory
    pub entry: Option<String>,

    /// Directory containing the parse tree files
    #[arg(short, long)]
    pub templates: Option<PathBuf>,

    /// JSON file with the data object passed to the entry template
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// JSON file with the options object passed to the entry template
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Only compile, never render
    #[arg(long)]
    pub check: bool,

    /// Print the generated source of every compiled template
    #[arg(long)]
    pub emit_source: bool,

    /// Run in watch mode
    #[arg(short, long)]
    pub watch: bool,

    /// Output format
    #[arg(long, default_value = "human")]
    pub output: OutputFormat,

    /// Show timing information
    #[arg(long)]
    pub timings: bool,

    /// Ignore patterns (glob)
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Preserve watch output (don't clear screen)
    #[arg(long)]
    pub preserve_watch_output: bool,
}

/// Output format for diagnostics and results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON lines
    Json,
    /// Machine-readable output
    Machine,
}

impl Args {
    /// The template to render, unless only checking.
    pub fn render_entry(&self) -> Option<&str> {
        if self.check {
            None
        } else {
            self.entry.as_deref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_render_args() {
        let args = Args::parse_from([
            "tmplc",
            "pages/index",
            "--templates",
            "views",
            "--data",
            "data.json",
            "--output",
            "json",
            "--ignore",
            "**/drafts/**",
        ]);
        assert_eq!(args.entry.as_deref(), Some("pages/index"));
        assert_eq!(args.templates, Some(PathBuf::from("views")));
        assert_eq!(args.data, Some(PathBuf::from("data.json")));
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.ignore, vec!["**/drafts/**".to_string()]);
        assert_eq!(args.render_entry(), Some("pages/index"));
    }

    #[test]
    fn test_check_never_renders() {
        let args = Args::parse_from(["tmplc", "index", "--check"]);
        assert_eq!(args.render_entry(), None);
        assert_eq!(Args::parse_from(["tmplc"]).render_entry(), None);
    }
}

//! Orchestrator for compiling and rendering templates.

use crate::cli::Args;
use crate::config::Config;
use crate::output::OutputFormatter;
use camino::{Utf8Path, Utf8PathBuf};
use miette::{IntoDiagnostic, Result, WrapErr};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tmpl_codegen::CodegenOptions;
use tmpl_compiler::{CompileError, CompiledTemplate, Compiler, ParseTree};
use tmpl_runtime::{Collaborators, TemplateMap, TemplateRegistry, Value};

/// Result of a run.
#[derive(Debug, Default)]
pub struct RunResult {
    /// Number of template files found.
    pub template_count: usize,
    /// Number of errors.
    pub error_count: usize,
    /// Time taken.
    pub duration_ms: u64,
}

/// Why a template file produced no template.
#[derive(Debug)]
pub enum Failure {
    /// The file could not be read or is not a parse tree.
    Load(String),
    /// The parse tree did not compile.
    Compile(CompileError),
}

/// Templates compiled in one run, registered under their names.
pub struct Build {
    pub registry: Arc<TemplateMap>,
    /// Compiled templates, sorted by name.
    pub templates: Vec<(String, CompiledTemplate)>,
    pub failures: Vec<(Utf8PathBuf, Failure)>,
}

impl Drop for Build {
    fn drop(&mut self) {
        // registered templates hold the registry through their collaborators
        self.registry.clear();
    }
}

/// Orchestrator for running tmplc.
pub struct Orchestrator {
    /// Configuration.
    config: Config,
    /// CLI arguments.
    args: Args,
    /// Output formatter.
    formatter: OutputFormatter,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(root: PathBuf, args: Args) -> Result<Self> {
        let config = Config::load(&root, &args)?;
        let formatter = OutputFormatter::new(args.output);

        Ok(Self {
            config,
            args,
            formatter,
        })
    }

    /// Compile every template, then render the entry if one was given.
    pub fn run_once(&self) -> Result<RunResult> {
        let start = Instant::now();

        let build = self.build();
        let template_count = build.templates.len() + build.failures.len();

        if self.args.verbose {
            eprintln!("Ignoring {}", self.config.ignore_patterns.join(", "));
            eprintln!(
                "Compiled {} of {} templates",
                build.templates.len(),
                template_count
            );
        }

        let mut error_count = 0;
        for (path, failure) in &build.failures {
            self.formatter.print_failure(path, failure);
            error_count += 1;
        }

        if self.args.emit_source {
            for (name, template) in &build.templates {
                let options = CodegenOptions {
                    name: Some(function_name(name)),
                    ..CodegenOptions::default()
                };
                let source = tmpl_codegen::generate(template.program(), &options);
                self.formatter.print_source(name, &source);
            }
        }

        if let Some(entry) = self.args.render_entry() {
            if !self.render(&build.registry, entry)? {
                error_count += 1;
            }
        }

        let result = RunResult {
            template_count,
            error_count,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if self.args.timings {
            eprintln!("\nTiming: {}ms", result.duration_ms);
        }

        self.formatter.print_summary(&result);

        Ok(result)
    }

    /// Run in watch mode.
    pub fn run_watch_mode(&mut self) -> Result<()> {
        use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
        use std::sync::mpsc::channel;
        use std::time::Duration;

        eprintln!("Starting watch mode...\n");

        if let Err(e) = self.run_once() {
            eprintln!("{:?}", e);
        }

        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default().with_poll_interval(Duration::from_millis(500)),
        )
        .into_diagnostic()?;

        watcher
            .watch(self.config.root.as_std_path(), RecursiveMode::Recursive)
            .into_diagnostic()?;
        for input in self.inputs() {
            watcher
                .watch(&input, RecursiveMode::NonRecursive)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to watch {}", input.display()))?;
        }

        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    let config_changed = event
                        .paths
                        .iter()
                        .any(|p| p.as_path() == self.config.config_path().as_std_path());
                    let should_rerun = config_changed
                        || event.paths.iter().any(|p| self.is_relevant(p));

                    if !should_rerun {
                        continue;
                    }

                    if !self.args.preserve_watch_output {
                        // Clear screen
                        print!("\x1B[2J\x1B[1;1H");
                    }

                    if config_changed {
                        match Config::load(self.config.root.as_std_path(), &self.args) {
                            Ok(config) => self.config = config,
                            Err(e) => {
                                eprintln!("{:?}", e);
                                continue;
                            }
                        }
                    }

                    eprintln!("File change detected. Rerunning...\n");
                    if let Err(e) = self.run_once() {
                        eprintln!("{:?}", e);
                    }
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Compile all templates into a fresh registry.
    pub fn build(&self) -> Build {
        let files = self.find_templates();
        tracing::debug!(root = %self.config.root, files = files.len(), "discovered templates");

        let registry = Arc::new(TemplateMap::new());
        let shared: Arc<dyn TemplateRegistry> = registry.clone();
        let compiler = Compiler::new(Collaborators::default().with_registry(shared))
            .with_options(self.config.compiler.clone());

        let outcomes: Vec<_> = files
            .into_par_iter()
            .map(|(name, path)| {
                let outcome = compile_file(&compiler, &path);
                (name, path, outcome)
            })
            .collect();

        let mut templates = Vec::new();
        let mut failures = Vec::new();
        for (name, path, outcome) in outcomes {
            match outcome {
                Ok(template) => {
                    registry.insert(name.as_str(), Arc::new(template.clone()));
                    templates.push((name, template));
                }
                Err(failure) => failures.push((path, failure)),
            }
        }

        Build {
            registry,
            templates,
            failures,
        }
    }

    /// Render `entry` and print the output. Returns false on a render error.
    fn render(&self, registry: &TemplateMap, entry: &str) -> Result<bool> {
        let data = load_json(self.args.data.as_deref())?;
        let options = load_json(self.args.options.as_deref())?;

        let rendered = registry
            .resolve(&Value::from(entry))
            .and_then(|template| template.apply(&data, &options));

        match rendered {
            Ok(output) => {
                self.formatter.print_output(entry, &output);
                Ok(true)
            }
            Err(err) => {
                self.formatter.print_render_error(entry, &err);
                Ok(false)
            }
        }
    }

    /// Find all template files, sorted by name.
    fn find_templates(&self) -> Vec<(String, Utf8PathBuf)> {
        let mut files = Vec::new();

        for entry in walkdir::WalkDir::new(&self.config.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() {
                continue;
            }

            let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
                continue;
            };

            if !self.config.should_process(&path) {
                continue;
            }

            if let Some(name) = self.config.template_name(&path) {
                files.push((name, path));
            }
        }

        files.sort();
        files
    }

    /// Data and options files given on the command line.
    fn inputs(&self) -> Vec<PathBuf> {
        [&self.args.data, &self.args.options]
            .into_iter()
            .flatten()
            .map(|path| std::fs::canonicalize(path).unwrap_or_else(|_| path.clone()))
            .collect()
    }

    /// Check if a changed path affects the output.
    fn is_relevant(&self, path: &Path) -> bool {
        if self.inputs().iter().any(|input| input == path) {
            return true;
        }
        Utf8Path::from_path(path).is_some_and(|p| self.config.should_process(p))
    }
}

/// Read and compile a single parse tree file.
fn compile_file(
    compiler: &Compiler,
    path: &Utf8Path,
) -> std::result::Result<CompiledTemplate, Failure> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Failure::Load(format!("Failed to read file: {}", e)))?;
    let tree: ParseTree = serde_json::from_str(&content)
        .map_err(|e| Failure::Load(format!("Invalid parse tree: {}", e)))?;
    compiler.compile(&tree).map_err(Failure::Compile)
}

/// Load a JSON file as a template argument. A missing path is `undefined`.
fn load_json(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Undefined);
    };
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(Value::from(json))
}

/// Function name for generated source: `partials/row` becomes `partials_row`.
fn function_name(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '$' { c } else { '_' })
        .collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn orchestrator(dir: &Path, args: Args) -> Orchestrator {
        Orchestrator::new(dir.to_path_buf(), args).unwrap()
    }

    #[test]
    fn test_build_registers_by_relative_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.tmpl.json", r#"["<ul>", ["tmpl", "rows"], "</ul>"]"#);
        write(
            dir.path(),
            "partials/row.tmpl.json",
            r#"[["each", "(i, row) rows", "<li>", ["=", "row"], "</li>"]]"#,
        );
        write(dir.path(), "notes.txt", "ignored");

        let build = orchestrator(dir.path(), Args::default()).build();
        let names: Vec<&str> = build.templates.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["index", "partials/row"]);
        assert!(build.failures.is_empty());
        assert!(build.registry.contains("partials/row"));
    }

    #[test]
    fn test_build_collects_failures() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.tmpl.json", r#"["ok"]"#);
        write(dir.path(), "bad.tmpl.json", r#"[["if", " ", "A"]]"#);
        write(dir.path(), "broken.tmpl.json", "{");

        let build = orchestrator(dir.path(), Args::default()).build();
        assert_eq!(build.templates.len(), 1);
        assert_eq!(build.failures.len(), 2);

        let codes: Vec<&str> = build
            .failures
            .iter()
            .map(|(_, failure)| match failure {
                Failure::Load(_) => "load",
                Failure::Compile(err) => err.code.as_str(),
            })
            .collect();
        assert!(codes.contains(&"load"));
        assert!(codes.contains(&"missing-condition"));
    }

    #[test]
    fn test_sub_templates_resolve_through_registry() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "page.tmpl.json",
            r#"[["each", "(i, n) names", ["tmpl", "('#item')"]]]"#,
        );
        write(dir.path(), "item.tmpl.json", r#"["[", ["=", "i"], ":", ["=", "n"], "]"]"#);

        let build = orchestrator(dir.path(), Args::default()).build();
        let page = build.registry.get("page").unwrap();
        let data = Value::from(serde_json::json!({ "names": ["a", "b"] }));
        assert_eq!(page.apply(&data, &Value::Undefined).unwrap(), "[0:a][1:b]");
    }

    #[test]
    fn test_run_once_counts_errors() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.tmpl.json", r#"["A"]"#);
        write(dir.path(), "b.tmpl.json", r#"[["nope", "x"]]"#);

        let args = Args {
            check: true,
            ..Args::default()
        };
        let result = orchestrator(dir.path(), args).run_once().unwrap();
        assert_eq!(result.template_count, 2);
        assert_eq!(result.error_count, 1);
    }

    #[test]
    fn test_render_unknown_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.tmpl.json", r#"["A"]"#);

        let args = Args {
            entry: Some("missing".to_string()),
            ..Args::default()
        };
        let result = orchestrator(dir.path(), args).run_once().unwrap();
        assert_eq!(result.error_count, 1);
    }

    #[test]
    fn test_render_with_data_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "hello.tmpl.json", r#"["Hello ", ["=", "name"]]"#);
        let data = write(dir.path(), "data.json", r#"{ "name": "World" }"#);

        let args = Args {
            entry: Some("hello".to_string()),
            data: Some(data),
            ..Args::default()
        };
        let result = orchestrator(dir.path(), args).run_once().unwrap();
        assert_eq!(result.error_count, 0);
    }

    #[test]
    fn test_invalid_data_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "hello.tmpl.json", r#"["Hello"]"#);
        let data = write(dir.path(), "data.json", "{ name");

        let args = Args {
            entry: Some("hello".to_string()),
            data: Some(data),
            ..Args::default()
        };
        assert!(orchestrator(dir.path(), args).run_once().is_err());
    }

    #[test]
    fn test_function_name() {
        assert_eq!(function_name("partials/row"), "partials_row");
        assert_eq!(function_name("404"), "_404");
        assert_eq!(function_name("a-b.c"), "a_b_c");
    }
}

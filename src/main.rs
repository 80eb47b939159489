use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use vb_lint::LintEngine;
use vb_lint::cli::{Args, Command, LintArgs, OutputFormat};
use vb_lint::config;
use vb_lint::diagnostics::Diagnostic;
use vb_lint::fix;
use vb_lint::level::LintLevel;
use vb_lint::lint::{LintRegistry, LintSettings};
use walkdir::WalkDir;

fn main() -> ExitCode {
    vb_lint::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Some(Command::ListRules) => {
            list_rules();
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Explain { rule }) => {
            explain_rule(&rule)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Lint(lint)) => lint_command(lint),
        None => lint_command(args.lint),
    }
}

fn list_rules() {
    let registry = LintRegistry::default_rules();
    let mut rules: Vec<_> = registry.descriptors().collect();
    rules.sort_by_key(|d| d.name);

    for d in rules {
        let fix_status = d
            .fix
            .map(|fix| format!(" [fix: {}]", fix.safety.as_str()))
            .unwrap_or_default();
        println!(
            "{}\t{}\t{}{}",
            d.name,
            d.category.as_str(),
            d.description,
            fix_status
        );
    }
}

fn explain_rule(rule: &str) -> anyhow::Result<()> {
    let Some(d) = LintRegistry::default_rules().find_descriptor(rule) else {
        anyhow::bail!("unknown lint: {rule}");
    };

    println!("name: {}", d.name);
    println!("category: {}", d.category.as_str());
    println!("description: {}", d.description);
    match d.fix {
        Some(fix) => {
            println!("fix: available ({})", fix.safety.as_str());
            println!("fix description: {}", fix.description);
        }
        None => println!("fix: not available"),
    }
    Ok(())
}

/// Registry and settings from CLI filters plus the discovered config file.
fn build_engine(args: &LintArgs) -> anyhow::Result<LintEngine> {
    let start_dir = infer_start_dir(args)?;
    let loaded_cfg = config::load_config(args.config.as_deref(), &start_dir)?;

    let (disabled, settings) = match loaded_cfg {
        Some((path, cfg)) => {
            tracing_config_loaded(&path);
            (
                cfg.lints.disabled.clone(),
                LintSettings::default()
                    .with_config_levels(cfg.lints.levels)
                    .disable(cfg.lints.disabled),
            )
        }
        None => (Vec::new(), LintSettings::default()),
    };

    let registry = LintRegistry::default_rules_filtered(&args.only, &args.skip, &disabled)?;
    Ok(LintEngine::new_with_settings(registry, settings))
}

#[cfg(feature = "telemetry")]
fn tracing_config_loaded(path: &Path) {
    tracing::debug!(path = %path.display(), "loaded config");
}

#[cfg(not(feature = "telemetry"))]
fn tracing_config_loaded(_path: &Path) {}

fn lint_command(args: LintArgs) -> anyhow::Result<ExitCode> {
    if args.fix {
        return fix_command(args);
    }

    let engine = build_engine(&args)?;
    let inputs = read_inputs(&args.paths)?;

    let mut total_diags = 0usize;
    let mut has_error = false;

    match args.format {
        OutputFormat::Json => {
            let mut out: Vec<JsonDiagnostic> = Vec::new();
            for (label, source) in &inputs {
                let diagnostics = lint_labeled(&engine, label, source)?;
                total_diags += diagnostics.len();
                has_error |= diagnostics.iter().any(|d| d.level == LintLevel::Error);
                out.extend(diagnostics.iter().map(JsonDiagnostic::from));
            }

            out.sort_by(|a, b| {
                (a.file.as_str(), a.row, a.column, a.lint.as_str())
                    .cmp(&(b.file.as_str(), b.row, b.column, b.lint.as_str()))
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Pretty | OutputFormat::Github => {
            for (label, source) in &inputs {
                let diagnostics = lint_labeled(&engine, label, source)?;
                total_diags += diagnostics.len();
                let github = args.format == OutputFormat::Github;
                has_error |= print_text(&diagnostics, label, github, args.deny_warnings);
            }
        }
    }

    if has_error || (args.deny_warnings && total_diags > 0) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Debug, Serialize)]
struct JsonDiagnostic {
    file: String,
    row: usize,
    column: usize,
    end_row: usize,
    end_column: usize,
    level: String,
    lint: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replacement: Option<String>,
}

impl From<&Diagnostic> for JsonDiagnostic {
    fn from(d: &Diagnostic) -> Self {
        Self {
            file: d.file.clone().unwrap_or_else(|| "<unknown>".to_string()),
            row: d.span.start.row,
            column: d.span.start.column,
            end_row: d.span.end.row,
            end_column: d.span.end.column,
            level: d.level.as_str().to_string(),
            lint: d.lint.name.to_string(),
            message: d.message.clone(),
            help: d.help.clone(),
            replacement: d.suggestion.as_ref().map(|s| s.replacement.clone()),
        }
    }
}

/// Handle --fix mode: apply auto-fixes to files.
fn fix_command(args: LintArgs) -> anyhow::Result<ExitCode> {
    if args.paths.is_empty() {
        anyhow::bail!("--fix requires file paths (stdin not supported)");
    }

    let engine = build_engine(&args)?;
    let files = collect_vb_files(&args.paths)?;
    let mut total_fixed = 0usize;
    let mut total_skipped = 0usize;
    let mut files_modified = 0usize;

    const MAX_ITERATIONS: usize = 10;

    for path in &files {
        let original_source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut current_source = original_source.clone();
        let mut file_fixes = 0usize;

        // Re-lint after each pass: overlapping suggestions are deferred to the next one.
        for iteration in 1..=MAX_ITERATIONS {
            let diagnostics = engine.lint_source(&current_source)?;
            let fixable: Vec<_> = diagnostics
                .into_iter()
                .filter(|d| d.suggestion.is_some())
                .collect();
            if fixable.is_empty() {
                break;
            }

            let result = fix::apply_suggestions(&current_source, &fixable, args.unsafe_fixes)
                .with_context(|| format!("failed to apply fixes to {}", path.display()))?;
            if result.fixes_applied == 0 {
                total_skipped += result.fixes_skipped;
                break;
            }

            file_fixes += result.fixes_applied;
            current_source = result.fixed_source;

            if args.fix_dry_run {
                total_skipped += result.fixes_skipped;
                break;
            }
            if iteration == MAX_ITERATIONS {
                eprintln!(
                    "Warning: Max fix iterations ({MAX_ITERATIONS}) reached for {}",
                    path.display()
                );
            }
        }

        if file_fixes == 0 {
            continue;
        }
        if args.fix_dry_run {
            let diff = fix::format_diff(&original_source, &current_source, path);
            if !diff.is_empty() {
                println!("{diff}");
            }
        } else {
            if !args.no_backup {
                let backup_path = path.with_extension(format!(
                    "{}.bak",
                    path.extension().unwrap_or_default().to_string_lossy()
                ));
                std::fs::write(&backup_path, &original_source)
                    .with_context(|| format!("failed to write {}", backup_path.display()))?;
            }
            std::fs::write(path, &current_source)
                .with_context(|| format!("failed to write {}", path.display()))?;
            files_modified += 1;
        }
        total_fixed += file_fixes;
    }

    if args.fix_dry_run {
        println!(
            "\n{total_fixed} fix(es) would be applied to {} file(s)",
            files.len()
        );
    } else {
        println!("Applied {total_fixed} fix(es) to {files_modified} file(s)");
    }
    if total_skipped > 0 {
        println!("{total_skipped} fix(es) skipped (use --unsafe-fixes to apply)");
    }

    Ok(ExitCode::SUCCESS)
}

/// `(label, source)` for every input: the given files, or stdin when there are none.
fn read_inputs(paths: &[PathBuf]) -> anyhow::Result<Vec<(String, String)>> {
    if paths.is_empty() {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read stdin")?;
        return Ok(vec![("stdin".to_string(), source)]);
    }

    collect_vb_files(paths)?
        .into_iter()
        .map(|path| {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok((path.display().to_string(), source))
        })
        .collect()
}

fn lint_labeled(
    engine: &LintEngine,
    label: &str,
    source: &str,
) -> anyhow::Result<Vec<Diagnostic>> {
    let mut diagnostics = engine.lint_source(source)?;
    for diag in &mut diagnostics {
        diag.file = Some(label.to_string());
    }
    Ok(diagnostics)
}

/// Print diagnostics for one input; returns whether any counts as an error.
fn print_text(
    diagnostics: &[Diagnostic],
    label: &str,
    github: bool,
    deny_warnings: bool,
) -> bool {
    let mut has_error = false;

    for diag in diagnostics {
        let file = diag.file.as_deref().unwrap_or(label);
        if github {
            let kind = if diag.level == LintLevel::Error
                || (deny_warnings && diag.level == LintLevel::Warn)
            {
                "error"
            } else {
                "warning"
            };
            println!(
                "::{} file={},line={},col={},endLine={},endColumn={},title={}::{}",
                kind,
                github_escape(file),
                diag.span.start.row,
                diag.span.start.column,
                diag.span.end.row,
                diag.span.end.column,
                diag.lint.name,
                github_escape(&diag.message)
            );
            has_error |= kind == "error";
        } else {
            println!(
                "{}:{}:{}: {}: {}: {}",
                file,
                diag.span.start.row,
                diag.span.start.column,
                diag.level.as_str(),
                diag.lint.name,
                diag.message
            );
            if let Some(help) = &diag.help {
                println!("  help: {help}");
            }
            has_error |= diag.level == LintLevel::Error;
        }
    }

    if !github {
        println!("{} diagnostics for {}", diagnostics.len(), label);
    }
    has_error
}

fn github_escape(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn collect_vb_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("failed to access {}", path.display()))?;
        if !meta.is_dir() {
            out.push(path.clone());
            continue;
        }

        let walker = WalkDir::new(path).into_iter().filter_entry(|e| {
            e.depth() == 0 || !(e.file_type().is_dir() && should_skip_dir(e.path()))
        });
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && is_vb_file(entry.path()) {
                out.push(entry.into_path());
            }
        }
    }

    out.sort();
    out.dedup();
    Ok(out)
}

fn is_vb_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("vb"))
}

fn should_skip_dir(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };

    matches!(name, ".git" | ".vs" | "bin" | "obj")
}

fn infer_start_dir(args: &LintArgs) -> anyhow::Result<PathBuf> {
    let base = match args.paths.first() {
        Some(p) => p.clone(),
        None => std::env::current_dir()?,
    };

    let base = if base.is_file() {
        base.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        base
    };

    Ok(base)
}

//! Core vb-lint engine and lint registry.
//!
//! `LintEngine` parses Visual Basic source, binds it into a semantic model and
//! runs the registered rules over the result.

pub mod analysis;
pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fix;
pub mod level;
pub mod lexer;
pub mod lint;
pub mod parser;
pub mod rules;
pub mod semantic;
pub mod suppression;
pub mod telemetry;
pub mod visitor;

use anyhow::Result;

use crate::ast::CompilationUnit;
use crate::diagnostics::Diagnostic;
use crate::error::ClippyResult;
use crate::lint::{LintContext, LintRegistry, LintSettings};
use crate::parser::{parse_source, parse_source_lossy};

/// Engine orchestrates linting by parsing source and running registered rules.
///
/// The engine is immutable once built, so one instance can lint many files
/// from several threads at once.
pub struct LintEngine {
    registry: LintRegistry,
    settings: LintSettings,
}

impl LintEngine {
    /// Create a new engine with default lint settings.
    pub fn new(registry: LintRegistry) -> Self {
        Self {
            registry,
            settings: LintSettings::default(),
        }
    }

    /// Create a new engine with explicit lint settings (e.g. from config).
    pub fn new_with_settings(registry: LintRegistry, settings: LintSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &LintRegistry {
        &self.registry
    }

    /// Lint a single in-memory source string and return diagnostics sorted by position.
    ///
    /// Statements and members that fail to parse are skipped; the rest of the
    /// file is still checked.
    pub fn lint_source(&self, source: &str) -> Result<Vec<Diagnostic>> {
        let (unit, errors) = instrument_block!("parse", { parse_source_lossy(source) });
        for error in &errors {
            #[cfg(feature = "telemetry")]
            tracing::debug!(
                start = error.range.start,
                end = error.range.end,
                "skipped unparsable code: {}",
                error.message
            );
            #[cfg(not(feature = "telemetry"))]
            let _ = error;
        }
        self.run_rules(source, &unit)
    }

    /// Like [`lint_source`](Self::lint_source) but fails on the first syntax error.
    pub fn lint_source_strict(&self, source: &str) -> ClippyResult<Vec<Diagnostic>> {
        let unit = parse_source(source)?;
        Ok(self.run_rules(source, &unit)?)
    }

    fn run_rules(&self, source: &str, unit: &CompilationUnit) -> Result<Vec<Diagnostic>> {
        let model = instrument_block!("bind", { semantic::bind(unit) });
        #[cfg(feature = "telemetry")]
        tracing::debug!(
            calls = model.resolved_calls(),
            storage_refs = model.resolved_storage_refs(),
            "bound compilation unit"
        );

        let mut ctx = LintContext::new(source, self.settings.clone());
        instrument_block!("rules", {
            for rule in self.registry.rules() {
                rule.check(unit, &model, &mut ctx);
            }
        });

        let mut diagnostics = ctx.into_diagnostics();
        diagnostics.sort_by_key(|d| (d.span, d.lint.name));
        Ok(diagnostics)
    }
}

/// Construct a `LintEngine` with all built-in lints enabled.
pub fn create_default_engine() -> LintEngine {
    LintEngine::new(LintRegistry::default_rules())
}

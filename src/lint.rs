use crate::ast::{CompilationUnit, TextRange};
use crate::diagnostics::{Diagnostic, LineIndex, Span, Suggestion};
use crate::level::LintLevel;
use crate::semantic::SemanticModel;
use crate::suppression::SuppressionMap;
use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};

/// How far an automated fix can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixSafety {
    /// Behavior-preserving; applied by `--fix`.
    Safe,
    /// May change what the program does; needs `--unsafe-fixes`.
    Unsafe,
}

impl FixSafety {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixSafety::Safe => "safe",
            FixSafety::Unsafe => "unsafe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixDescriptor {
    pub safety: FixSafety,
    pub description: &'static str,
}

/// Grouping used by `list-rules` and accepted by `#Disable Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LintCategory {
    /// Code that compiles but very likely does not do what its author meant.
    Suspicious,
}

impl LintCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintCategory::Suspicious => "suspicious",
        }
    }
}

/// Static metadata describing a lint rule.
#[derive(Debug)]
pub struct LintDescriptor {
    pub name: &'static str,
    pub category: LintCategory,
    pub description: &'static str,
    /// `None` when the lint never offers a fix.
    pub fix: Option<FixDescriptor>,
}

impl LintDescriptor {
    pub const fn new(
        name: &'static str,
        category: LintCategory,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            category,
            description,
            fix: None,
        }
    }

    #[must_use]
    pub const fn with_fix(self, safety: FixSafety, description: &'static str) -> Self {
        Self {
            fix: Some(FixDescriptor {
                safety,
                description,
            }),
            ..self
        }
    }
}

/// A single lint rule that inspects a bound compilation unit.
pub trait LintRule: Send + Sync {
    fn descriptor(&self) -> &'static LintDescriptor;
    fn check(
        &self,
        unit: &CompilationUnit,
        model: &dyn SemanticModel,
        ctx: &mut LintContext<'_>,
    );
}

/// Per-lint configuration derived from `vb-lint.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintSettings {
    levels: HashMap<String, LintLevel>,
}

impl LintSettings {
    #[must_use]
    pub fn with_config_levels(mut self, levels: HashMap<String, LintLevel>) -> Self {
        self.levels.extend(levels);
        self
    }

    #[must_use]
    pub fn disable(mut self, disabled: impl IntoIterator<Item = String>) -> Self {
        for name in disabled {
            self.levels.insert(name, LintLevel::Allow);
        }
        self
    }

    pub fn level_for(&self, lint_name: &str) -> LintLevel {
        self.levels.get(lint_name).copied().unwrap_or_default()
    }
}

/// Mutable context passed to lint rules while checking a file.
pub struct LintContext<'src> {
    source: &'src str,
    settings: LintSettings,
    diagnostics: Vec<Diagnostic>,
    suppressions: SuppressionMap,
    lines: LineIndex<'src>,
}

impl<'src> LintContext<'src> {
    pub fn new(source: &'src str, settings: LintSettings) -> Self {
        Self {
            source,
            settings,
            diagnostics: Vec::new(),
            suppressions: SuppressionMap::from_source(source),
            lines: LineIndex::new(source),
        }
    }

    /// Level `lint` fires at on `row`, after config and `#Disable Warning` regions.
    fn effective_level(&self, lint: &'static LintDescriptor, row: usize) -> LintLevel {
        let level = self.settings.level_for(lint.name);
        if self
            .suppressions
            .is_suppressed(row, lint.name, lint.category.as_str())
        {
            return LintLevel::Allow;
        }
        level
    }

    pub fn report(
        &mut self,
        lint: &'static LintDescriptor,
        range: TextRange,
        message: impl Into<String>,
    ) {
        self.report_with(lint, range, message, None, None);
    }

    pub fn report_with(
        &mut self,
        lint: &'static LintDescriptor,
        range: TextRange,
        message: impl Into<String>,
        help: Option<String>,
        suggestion: Option<Suggestion>,
    ) {
        let span = Span::from_range(range, &self.lines);
        let level = self.effective_level(lint, span.start.row);
        if level == LintLevel::Allow {
            return;
        }

        self.diagnostics.push(Diagnostic {
            lint,
            level,
            file: None,
            span,
            message: message.into(),
            help,
            suggestion,
        });
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

pub fn all_known_lints() -> HashSet<&'static str> {
    LintRegistry::default_rules()
        .descriptors()
        .map(|d| d.name)
        .collect()
}

/// Registry of lint rules run by the engine.
pub struct LintRegistry {
    rules: Vec<Box<dyn LintRule>>,
}

impl Default for LintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LintRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl LintRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn LintRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static LintDescriptor> + '_ {
        self.rules.iter().map(|r| r.descriptor())
    }

    pub fn find_descriptor(&self, name: &str) -> Option<&'static LintDescriptor> {
        self.descriptors().find(|d| d.name == name)
    }

    #[must_use = "registry should be used to create an engine"]
    pub fn default_rules() -> Self {
        Self::new().with_rule(crate::rules::ReadOnlyByRefLint)
    }

    /// Built-in rules narrowed by `--only`, `--skip` and config `disabled`.
    ///
    /// # Errors
    ///
    /// Returns error if any lint name in `only`, `skip`, or `disabled` is unknown.
    pub fn default_rules_filtered(
        only: &[String],
        skip: &[String],
        disabled: &[String],
    ) -> Result<Self> {
        let known = all_known_lints();

        for n in only.iter().chain(skip.iter()).chain(disabled.iter()) {
            if !known.contains(n.as_str()) {
                return Err(anyhow!("unknown lint: {n}"));
            }
        }

        let only_set: Option<HashSet<&str>> = if only.is_empty() {
            None
        } else {
            Some(only.iter().map(String::as_str).collect())
        };
        let excluded: HashSet<&str> = skip
            .iter()
            .chain(disabled.iter())
            .map(String::as_str)
            .collect();

        let mut reg = Self::new();
        for rule in Self::default_rules().rules {
            let name = rule.descriptor().name;
            if let Some(ref only) = only_set
                && !only.contains(name)
            {
                continue;
            }
            if excluded.contains(name) {
                continue;
            }
            reg.rules.push(rule);
        }

        Ok(reg)
    }
}

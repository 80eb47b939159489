use std::fs;
use std::path::Path;
use vb_lint::LintEngine;
use vb_lint::config::{self, DEFAULT_CONFIG_FILE_NAME};
use vb_lint::error::VbLintError;
use vb_lint::level::LintLevel;
use vb_lint::lint::{LintRegistry, LintSettings};

fn engine_from(cfg: config::VbLintConfig) -> LintEngine {
    let empty: Vec<String> = Vec::new();
    let registry = LintRegistry::default_rules_filtered(&empty, &empty, &cfg.lints.disabled)
        .expect("registry");
    let settings = LintSettings::default()
        .with_config_levels(cfg.lints.levels)
        .disable(cfg.lints.disabled);
    LintEngine::new_with_settings(registry, settings)
}

#[test]
fn config_can_promote_lint_to_error() {
    let cfg_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/config/error_level/vb-lint.toml");
    let cfg = config::load_config_file(&cfg_path).expect("config should load");
    let engine = engine_from(cfg);

    let src = include_str!("fixtures/read_only_by_ref/positive.vb");
    let diags = engine.lint_source(src).expect("linting should succeed");

    assert!(!diags.is_empty());
    assert!(
        diags
            .iter()
            .all(|d| d.lint.name == "read_only_by_ref" && d.level == LintLevel::Error)
    );
}

#[test]
fn config_can_disable_lint() {
    let cfg_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/config/disabled/vb-lint.toml");
    let cfg = config::load_config_file(&cfg_path).expect("config should load");
    let engine = engine_from(cfg);

    let src = include_str!("fixtures/read_only_by_ref/positive.vb");
    let diags = engine.lint_source(src).expect("linting should succeed");

    assert!(!diags.iter().any(|d| d.lint.name == "read_only_by_ref"));
}

#[test]
fn level_aliases_are_accepted() {
    let cfg: config::VbLintConfig =
        toml::from_str("[lints]\nread_only_by_ref = \"warning\"\n").expect("parse");
    assert_eq!(cfg.lints.levels["read_only_by_ref"], LintLevel::Warn);

    let cfg: config::VbLintConfig =
        toml::from_str("[lints]\nread_only_by_ref = \"allow\"\n").expect("parse");
    let engine = engine_from(cfg);
    let src = include_str!("fixtures/read_only_by_ref/positive.vb");
    assert!(engine.lint_source(src).expect("lint").is_empty());
}

#[test]
fn config_is_found_in_an_ancestor_directory() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let nested = tmp.path().join("src").join("forms");
    fs::create_dir_all(&nested).expect("mkdir");
    let cfg_path = tmp.path().join(DEFAULT_CONFIG_FILE_NAME);
    fs::write(&cfg_path, "[lints]\nread_only_by_ref = \"error\"\n").expect("write config");

    assert_eq!(config::find_config_file(&nested), Some(cfg_path.clone()));

    let (found, cfg) = config::load_config(None, &nested)
        .expect("load")
        .expect("config present");
    assert_eq!(found, cfg_path);
    assert_eq!(cfg.lints.levels["read_only_by_ref"], LintLevel::Error);
}

#[test]
fn missing_config_is_not_an_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let loaded = config::load_config(None, tmp.path()).expect("load");
    // A config further up the real filesystem would be found too; only assert
    // that nothing was read from the empty temp dir itself.
    if let Some((path, _)) = loaded {
        assert!(!path.starts_with(tmp.path()));
    }
}

#[test]
fn unknown_lint_names_are_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg_path = tmp.path().join(DEFAULT_CONFIG_FILE_NAME);
    fs::write(
        &cfg_path,
        "[lints]\ndisabled = [\"no_such_lint\"]\nalso_missing = \"error\"\n",
    )
    .expect("write config");

    let err = config::load_config(Some(&cfg_path), tmp.path()).expect_err("must fail");
    let chain = format!("{err:#}");
    assert!(chain.contains("invalid config file"), "{chain}");
    assert!(chain.contains("also_missing, no_such_lint"), "{chain}");
    assert!(
        matches!(err.downcast_ref::<VbLintError>(), Some(VbLintError::Config(_))),
        "{chain}"
    );
}

#[test]
fn malformed_config_reports_the_path() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg_path = tmp.path().join(DEFAULT_CONFIG_FILE_NAME);
    fs::write(&cfg_path, "[lints\n").expect("write config");

    let err = config::load_config(Some(&cfg_path), tmp.path()).expect_err("must fail");
    assert!(format!("{err:#}").contains("failed to parse config file"));
}

#[test]
fn unknown_cli_lint_names_are_rejected() {
    let only = vec!["nope".to_string()];
    let err = LintRegistry::default_rules_filtered(&only, &[], &[])
        .err()
        .expect("unknown lint");
    assert_eq!(err.to_string(), "unknown lint: nope");
}

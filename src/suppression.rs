//! Helpers for honoring `#Disable Warning` / `#Enable Warning` regions in VB source.
//!
//! A directive takes effect from the line after it until a matching directive
//! reverses it. `#Disable Warning` with no names silences every lint. Names may
//! be lint names or category names and are compared case-insensitively.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Toggle {
    Disable,
    Enable,
}

#[derive(Debug, Clone)]
struct Directive {
    row: usize,
    toggle: Toggle,
    /// Lowercased names; empty means every lint.
    names: Vec<String>,
}

/// Pragma directives of one file, in source order.
#[derive(Debug, Clone, Default)]
pub struct SuppressionMap {
    directives: Vec<Directive>,
}

impl SuppressionMap {
    pub fn from_source(source: &str) -> Self {
        let directives = source
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let (toggle, names) = parse_directive(line)?;
                Some(Directive {
                    row: i + 1,
                    toggle,
                    names,
                })
            })
            .collect();
        Self { directives }
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Whether a diagnostic for `lint_name` (in `category`) starting on `row` is silenced.
    pub fn is_suppressed(&self, row: usize, lint_name: &str, category: &str) -> bool {
        let mut all_disabled = false;
        let mut disabled: HashSet<&str> = HashSet::new();
        let mut re_enabled: HashSet<&str> = HashSet::new();

        for directive in self.directives.iter().take_while(|d| d.row < row) {
            match (&directive.toggle, directive.names.is_empty()) {
                (Toggle::Disable, true) => {
                    all_disabled = true;
                    re_enabled.clear();
                }
                (Toggle::Enable, true) => {
                    all_disabled = false;
                    disabled.clear();
                    re_enabled.clear();
                }
                (Toggle::Disable, false) => {
                    for name in &directive.names {
                        disabled.insert(name.as_str());
                        re_enabled.remove(name.as_str());
                    }
                }
                (Toggle::Enable, false) => {
                    for name in &directive.names {
                        disabled.remove(name.as_str());
                        if all_disabled {
                            re_enabled.insert(name.as_str());
                        }
                    }
                }
            }
        }

        let lint = lint_name.to_ascii_lowercase();
        let category = category.to_ascii_lowercase();
        let named =
            |set: &HashSet<&str>| set.contains(lint.as_str()) || set.contains(category.as_str());

        if all_disabled {
            !named(&re_enabled)
        } else {
            named(&disabled)
        }
    }
}

/// Parse `#Disable Warning a, b` or `#Enable Warning a`.
fn parse_directive(line: &str) -> Option<(Toggle, Vec<String>)> {
    let rest = line.trim_start().strip_prefix('#')?;
    let rest = rest.split('\'').next().unwrap_or_default();
    let mut words = rest.split_whitespace();

    let toggle = match words.next()?.to_ascii_lowercase().as_str() {
        "disable" => Toggle::Disable,
        "enable" => Toggle::Enable,
        _ => return None,
    };
    if !words.next()?.eq_ignore_ascii_case("warning") {
        return None;
    }

    let names = words
        .collect::<Vec<_>>()
        .join(" ")
        .split(',')
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    Some((toggle, names))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINT: &str = "read_only_by_ref";
    const CATEGORY: &str = "suspicious";

    #[test]
    fn named_region_silences_until_enabled() {
        let source = "\
Sub A()
#Disable Warning read_only_by_ref
    Touch(p.X)
#Enable Warning read_only_by_ref
    Touch(p.X)
End Sub";
        let map = SuppressionMap::from_source(source);
        assert!(!map.is_suppressed(1, LINT, CATEGORY));
        assert!(map.is_suppressed(3, LINT, CATEGORY));
        assert!(!map.is_suppressed(5, LINT, CATEGORY));
    }

    #[test]
    fn bare_disable_silences_everything_except_re_enabled_names() {
        let source = "\
#Disable Warning
x
#Enable Warning Read_Only_By_Ref
y
#Enable Warning
z";
        let map = SuppressionMap::from_source(source);
        assert!(map.is_suppressed(2, LINT, CATEGORY));
        assert!(map.is_suppressed(2, "other_lint", "style"));
        assert!(!map.is_suppressed(4, LINT, CATEGORY));
        assert!(map.is_suppressed(4, "other_lint", "style"));
        assert!(!map.is_suppressed(6, "other_lint", "style"));
    }

    #[test]
    fn categories_lists_and_comments() {
        let source = "\
  #disable warning BC42024, Suspicious ' noisy in generated code
x";
        let map = SuppressionMap::from_source(source);
        assert!(map.is_suppressed(2, LINT, CATEGORY));
        assert!(!map.is_suppressed(2, "naming_lint", "style"));
    }

    #[test]
    fn other_directives_are_ignored() {
        let map = SuppressionMap::from_source("#If DEBUG Then\n#Region \"x\"\n#Disable Foo\n");
        assert!(map.is_empty());
    }
}

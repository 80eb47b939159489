use crate::analysis::{StorageVerdict, resolve_modality, resolve_storage};
use crate::ast::{ArgumentList, CompilationUnit};
use crate::diagnostics::{Applicability, Suggestion};
use crate::lint::{FixSafety, LintCategory, LintContext, LintDescriptor, LintRule};
use crate::semantic::{ParameterModality, SemanticModel};
use crate::visitor::{SyntaxVisitor, walk_unit};

// ============================================================================
// ReadOnlyByRefLint
// ============================================================================

/// Flags a `ReadOnly` field or a property without a setter passed to a
/// `ByRef` parameter. VB hands the callee a temporary copy, so whatever the
/// callee writes back is lost.
///
/// ```vb
/// Structure Point
///     Public ReadOnly Property X As Integer
/// End Structure
///
/// Sub IncreaseByOne(ByRef x As Integer)
///     x += 1
/// End Sub
///
/// IncreaseByOne(point.X) ' point.X is unchanged afterwards
/// ```
pub struct ReadOnlyByRefLint;

pub static READ_ONLY_BY_REF: LintDescriptor = LintDescriptor::new(
    "read_only_by_ref",
    LintCategory::Suspicious,
    "Read-only field or property passed to a ByRef parameter",
)
.with_fix(
    FixSafety::Unsafe,
    "Wrap the read-only expression in parentheses to pass an explicit copy",
);

impl LintRule for ReadOnlyByRefLint {
    fn descriptor(&self) -> &'static LintDescriptor {
        &READ_ONLY_BY_REF
    }

    fn check(
        &self,
        unit: &CompilationUnit,
        model: &dyn SemanticModel,
        ctx: &mut LintContext<'_>,
    ) {
        walk_unit(unit, &mut CallSites { model }, ctx);
    }
}

struct CallSites<'m> {
    model: &'m dyn SemanticModel,
}

impl SyntaxVisitor for CallSites<'_> {
    fn visit_argument_list(&mut self, args: &ArgumentList, ctx: &mut LintContext<'_>) {
        for (index, argument) in args.arguments.iter().enumerate() {
            let Some(value) = &argument.value else {
                continue;
            };
            if resolve_modality(args, index, self.model)
                != Some(ParameterModality::ByReferenceMutable)
            {
                continue;
            }
            let StorageVerdict::ReadOnly { kind, expr } = resolve_storage(value, self.model) else {
                continue;
            };

            let text = expr.range.slice(ctx.source()).to_string();
            ctx.report_with(
                &READ_ONLY_BY_REF,
                expr.range,
                format!(
                    "Read-only {kind} `{text}` is passed to a ByRef parameter; \
                     the callee's writes are silently discarded"
                ),
                Some(format!(
                    "Pass an explicit copy such as `({text})`, or copy it into a local \
                     and write the local back if the update is intended"
                )),
                Some(Suggestion {
                    message: format!("Wrap `{text}` in parentheses"),
                    replacement: format!("({text})"),
                    applicability: Applicability::MaybeIncorrect,
                }),
            );
        }
    }
}

//! Argument-to-parameter binding at a call site.

use crate::ast::ArgumentList;
use crate::semantic::{Parameter, ParameterModality, SemanticModel};

/// Formal parameter that argument `index` of `args` binds to.
///
/// Named arguments bind by name (case-insensitively, as VB does) wherever
/// they appear. Positional arguments bind by their index in the argument
/// list, omitted arguments included. Returns `None` when the call target is
/// unknown, the name matches no parameter, or the index is past the last
/// parameter (e.g. extra `ParamArray` values).
pub fn bind_argument<'m>(
    args: &ArgumentList,
    index: usize,
    model: &'m dyn SemanticModel,
) -> Option<&'m Parameter> {
    let signature = model.call_target(args)?;
    let argument = args.arguments.get(index)?;
    match &argument.name {
        Some(name) => signature.parameter_named(&name.text),
        None => signature.parameters.get(index),
    }
}

/// Passing modality of the parameter argument `index` binds to, `None` if unresolvable.
pub fn resolve_modality(
    args: &ArgumentList,
    index: usize,
    model: &dyn SemanticModel,
) -> Option<ParameterModality> {
    bind_argument(args, index, model).map(|p| p.modality)
}

//! Semantic model consumed by lint rules.
//!
//! Rules never look at declarations directly. They ask a [`SemanticModel`]
//! what a call site resolves to and what storage a member access names. The
//! model is built once per file by [`bind`] and is read-only afterwards, so one
//! model can be shared by every rule (and every thread) that looks at the file.

mod binder;
mod symbols;

pub use binder::{BoundModel, bind};
pub use symbols::{SymbolTable, TypeId, TypeInfo};

use std::fmt;

use crate::ast::{ArgumentList, Expr};

/// How a formal parameter receives its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterModality {
    ByValue,
    /// `ByRef` marked `<In>` / `<IsReadOnly>`: passed by reference, never written.
    ByReferenceInputOnly,
    ByReferenceMutable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub modality: ParameterModality,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub parameters: Vec<Parameter>,
    /// Last parameter is a `ParamArray`.
    pub is_param_array: bool,
}

impl MethodSignature {
    /// Parameter whose name matches `name`, compared the way VB compares names.
    pub fn parameter_named(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Field,
    Property,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Field => "field",
            StorageKind::Property => "property",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Copy semantics of the aggregate that declares a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Classes, modules and interfaces.
    Reference,
    /// Structures.
    Value,
}

/// A field or property as seen from a member access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSymbol {
    pub name: String,
    pub kind: StorageKind,
    pub read_only: bool,
    pub container: ContainerKind,
}

/// Read-only view over a bound compilation unit.
pub trait SemanticModel: Send + Sync {
    /// Method a call site's argument list is passed to, if overload resolution succeeded.
    fn call_target(&self, args: &ArgumentList) -> Option<&MethodSignature>;

    /// Field or property named by `expr`: either `receiver.Name` or a bare
    /// name with an implicit `Me` receiver.
    fn storage_symbol(&self, expr: &Expr) -> Option<&StorageSymbol>;
}

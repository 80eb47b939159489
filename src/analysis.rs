//! Call-site analyses shared by lint rules.
//!
//! Both analyses are pure queries over a syntax node and a
//! [`SemanticModel`](crate::semantic::SemanticModel). They keep no state
//! between calls and never fail: anything they cannot resolve comes back as
//! "unknown" so the caller can stay silent.

pub mod modality;
pub mod mutability;

pub use modality::{bind_argument, resolve_modality};
pub use mutability::{StorageVerdict, resolve_storage};

#[cfg(test)]
pub(crate) mod testing {
    //! Hand-built syntax nodes and a table-driven semantic model.

    use std::collections::HashMap;

    use crate::ast::{Argument, ArgumentList, Expr, ExprKind, Ident, NodeId, TextRange};
    use crate::semantic::{
        ContainerKind, MethodSignature, Parameter, ParameterModality, SemanticModel,
        StorageKind, StorageSymbol,
    };

    #[derive(Default)]
    pub struct StubModel {
        pub calls: HashMap<NodeId, MethodSignature>,
        pub storage: HashMap<NodeId, StorageSymbol>,
    }

    impl StubModel {
        pub fn with_storage(
            &mut self,
            expr: &Expr,
            kind: StorageKind,
            read_only: bool,
            container: ContainerKind,
        ) -> &mut Self {
            let name = match &expr.kind {
                ExprKind::MemberAccess { name, .. } | ExprKind::Name(name) => name.text.clone(),
                _ => String::from("?"),
            };
            self.storage.insert(
                expr.id,
                StorageSymbol {
                    name,
                    kind,
                    read_only,
                    container,
                },
            );
            self
        }

        pub fn with_call(
            &mut self,
            args: &ArgumentList,
            parameters: &[(&str, ParameterModality)],
        ) -> &mut Self {
            self.calls.insert(
                args.id,
                MethodSignature {
                    name: String::from("Callee"),
                    parameters: parameters
                        .iter()
                        .map(|(name, modality)| Parameter {
                            name: (*name).to_string(),
                            modality: *modality,
                        })
                        .collect(),
                    is_param_array: false,
                },
            );
            self
        }
    }

    impl SemanticModel for StubModel {
        fn call_target(&self, args: &ArgumentList) -> Option<&MethodSignature> {
            self.calls.get(&args.id)
        }

        fn storage_symbol(&self, expr: &Expr) -> Option<&StorageSymbol> {
            self.storage.get(&expr.id)
        }
    }

    /// Builds expressions with fresh node ids. Ranges are meaningless.
    #[derive(Default)]
    pub struct ExprBuilder {
        next: u32,
    }

    impl ExprBuilder {
        fn id(&mut self) -> NodeId {
            self.next += 1;
            NodeId(self.next)
        }

        fn ident(text: &str) -> Ident {
            Ident::new(text, TextRange::default())
        }

        pub fn name(&mut self, text: &str) -> Expr {
            Expr {
                id: self.id(),
                kind: ExprKind::Name(Self::ident(text)),
                range: TextRange::default(),
            }
        }

        pub fn member(&mut self, receiver: Expr, name: &str) -> Expr {
            Expr {
                id: self.id(),
                kind: ExprKind::MemberAccess {
                    receiver: Box::new(receiver),
                    name: Self::ident(name),
                },
                range: TextRange::default(),
            }
        }

        pub fn paren(&mut self, inner: Expr) -> Expr {
            Expr {
                id: self.id(),
                kind: ExprKind::Paren(Box::new(inner)),
                range: TextRange::default(),
            }
        }

        /// `(name, value)` pairs; a `None` value is an omitted argument.
        pub fn args(&mut self, arguments: Vec<(Option<&str>, Option<Expr>)>) -> ArgumentList {
            ArgumentList {
                id: self.id(),
                arguments: arguments
                    .into_iter()
                    .map(|(name, value)| Argument {
                        name: name.map(Self::ident),
                        value,
                        range: TextRange::default(),
                    })
                    .collect(),
                range: TextRange::default(),
            }
        }
    }
}

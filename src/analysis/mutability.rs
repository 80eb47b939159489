//! Whether an argument expression denotes read-only storage.

use crate::ast::{Expr, ExprKind};
use crate::semantic::{ContainerKind, SemanticModel, StorageKind};

/// Outcome of [`resolve_storage`].
#[derive(Debug, Clone, Copy)]
pub enum StorageVerdict<'e> {
    Writable,
    ReadOnly {
        kind: StorageKind,
        /// Innermost read-only sub-expression; what a diagnostic points at.
        expr: &'e Expr,
    },
}

impl PartialEq for StorageVerdict<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StorageVerdict::Writable, StorageVerdict::Writable) => true,
            (
                StorageVerdict::ReadOnly { kind, expr },
                StorageVerdict::ReadOnly {
                    kind: other_kind,
                    expr: other_expr,
                },
            ) => kind == other_kind && expr.id == other_expr.id,
            _ => false,
        }
    }
}

impl Eq for StorageVerdict<'_> {}

impl StorageVerdict<'_> {
    pub fn is_read_only(&self) -> bool {
        matches!(self, StorageVerdict::ReadOnly { .. })
    }
}

/// Walk `expr` from the outermost member access towards its root.
///
/// A read-only field or property ends the walk with `ReadOnly` located at
/// that access. A writable member declared in a structure is only as writable
/// as its receiver, so the walk continues with the receiver. A writable member
/// of a reference type ends it with `Writable`, as does anything that is not
/// resolved storage: locals, calls, literals, parenthesized copies, unknown
/// symbols.
///
/// A bare name bound to a field or property is a member access with an
/// implicit `Me` receiver, which cannot be read-only.
pub fn resolve_storage<'e>(expr: &'e Expr, model: &dyn SemanticModel) -> StorageVerdict<'e> {
    let mut current = expr;
    loop {
        let receiver = match &current.kind {
            ExprKind::MemberAccess { receiver, .. } => Some(receiver.as_ref()),
            ExprKind::Name(_) => None,
            _ => return StorageVerdict::Writable,
        };
        let Some(symbol) = model.storage_symbol(current) else {
            return StorageVerdict::Writable;
        };
        if symbol.read_only {
            return StorageVerdict::ReadOnly {
                kind: symbol.kind,
                expr: current,
            };
        }
        match (symbol.container, receiver) {
            (ContainerKind::Value, Some(receiver)) => current = receiver,
            (ContainerKind::Value, None) | (ContainerKind::Reference, _) => {
                return StorageVerdict::Writable;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{ExprBuilder, StubModel};
    use ContainerKind::{Reference, Value};
    use StorageKind::{Field, Property};

    fn located<'e>(verdict: StorageVerdict<'e>) -> Option<(StorageKind, &'e Expr)> {
        match verdict {
            StorageVerdict::ReadOnly { kind, expr } => Some((kind, expr)),
            StorageVerdict::Writable => None,
        }
    }

    #[test]
    fn read_only_property_is_reported_at_the_access() {
        let mut b = ExprBuilder::default();
        let point = b.name("point");
        let point_x = b.member(point, "X");
        let mut model = StubModel::default();
        model.with_storage(&point_x, Property, true, Value);

        let (kind, at) = located(resolve_storage(&point_x, &model)).expect("read-only");
        assert_eq!(kind, Property);
        assert_eq!(at.id, point_x.id);
    }

    #[test]
    fn writable_field_and_property_are_accepted() {
        let mut b = ExprBuilder::default();
        let obj = b.name("obj");
        let field = b.member(obj, "Count");
        let other = b.name("other");
        let property = b.member(other, "Total");
        let mut model = StubModel::default();
        model
            .with_storage(&field, Field, false, Reference)
            .with_storage(&property, Property, false, Reference);

        assert_eq!(resolve_storage(&field, &model), StorageVerdict::Writable);
        assert_eq!(resolve_storage(&property, &model), StorageVerdict::Writable);
    }

    #[test]
    fn read_only_value_receiver_is_reported_at_the_receiver() {
        let mut b = ExprBuilder::default();
        let point = b.name("point");
        let point_id = point.id;
        let point_x = b.member(point, "X");
        let mut model = StubModel::default();
        model.with_storage(&point_x, Property, false, Value);
        let (receiver, _) = point_x.as_member_access().expect("member access");
        model.with_storage(receiver, Field, true, Reference);

        let (kind, at) = located(resolve_storage(&point_x, &model)).expect("read-only");
        assert_eq!(kind, Field);
        assert_eq!(at.id, point_id);
    }

    #[test]
    fn reference_member_stops_propagation() {
        let mut b = ExprBuilder::default();
        let holder = b.name("holder");
        let obj = b.member(holder, "Obj");
        let field = b.member(obj, "Field");
        let mut model = StubModel::default();
        model.with_storage(&field, Field, false, Reference);
        let (obj, _) = field.as_member_access().expect("member access");
        model.with_storage(obj, Field, true, Value);

        assert_eq!(resolve_storage(&field, &model), StorageVerdict::Writable);
    }

    #[test]
    fn unresolved_and_non_member_expressions_fail_open() {
        let mut b = ExprBuilder::default();
        let unknown_root = b.name("mystery");
        let unknown = b.member(unknown_root, "Value");
        let local = b.name("local");
        let copied_root = b.name("point");
        let copied_member = b.member(copied_root, "X");
        let copied = b.paren(copied_member);
        let mut model = StubModel::default();
        if let ExprKind::Paren(inner) = &copied.kind {
            model.with_storage(inner, Property, true, Value);
        }

        assert_eq!(resolve_storage(&unknown, &model), StorageVerdict::Writable);
        assert_eq!(resolve_storage(&local, &model), StorageVerdict::Writable);
        assert_eq!(resolve_storage(&copied, &model), StorageVerdict::Writable);
    }

    #[test]
    fn unresolved_link_in_a_value_chain_fails_open() {
        let mut b = ExprBuilder::default();
        let root = b.name("root");
        let inner = b.member(root, "Inner");
        let leaf = b.member(inner, "Leaf");
        let mut model = StubModel::default();
        model.with_storage(&leaf, Field, false, Value);

        assert_eq!(resolve_storage(&leaf, &model), StorageVerdict::Writable);
    }

    #[test]
    fn implicit_receiver_ends_a_writable_value_chain() {
        let mut b = ExprBuilder::default();
        let bare = b.name("X");
        let mut model = StubModel::default();
        model.with_storage(&bare, Property, false, Value);
        assert_eq!(resolve_storage(&bare, &model), StorageVerdict::Writable);

        model.with_storage(&bare, Property, true, Value);
        assert!(resolve_storage(&bare, &model).is_read_only());
    }

    #[test]
    fn deep_value_chains_are_walked_without_recursion() {
        const DEPTH: usize = 100_000;
        let mut b = ExprBuilder::default();
        let mut model = StubModel::default();

        let root = b.name("root");
        model.with_storage(&root, Field, true, Reference);
        let root_id = root.id;
        let mut chain = root;
        for _ in 0..DEPTH {
            chain = b.member(chain, "Inner");
            model.with_storage(&chain, Field, false, Value);
        }

        let (kind, at) = located(resolve_storage(&chain, &model)).expect("read-only root");
        assert_eq!(kind, Field);
        assert_eq!(at.id, root_id);
    }
}

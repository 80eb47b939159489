//! Name binding over a parsed compilation unit.
//!
//! The binder walks every executable body once, tracking the static type of
//! expressions well enough to resolve member accesses and call targets. What
//! it cannot resolve it leaves alone; rules treat a missing entry as "unknown"
//! and stay quiet.

use std::collections::HashMap;

use crate::ast::{
    Accessor, AccessorKind, ArgumentList, CaseClause, CompilationUnit, Expr, ExprKind, Item,
    Member, NodeId, ParameterDecl, PropertyDecl, SelfKind, Stmt, StmtKind, TypeDecl, TypeRef,
    VariableDeclarator,
};

use super::symbols::{MethodEntry, MethodId, StorageId, SymbolTable, TypeId};
use super::{MethodSignature, SemanticModel, StorageSymbol};

/// Semantic model produced by [`bind`].
#[derive(Debug)]
pub struct BoundModel {
    table: SymbolTable,
    storage_refs: HashMap<NodeId, StorageId>,
    call_targets: HashMap<NodeId, MethodId>,
}

impl BoundModel {
    /// Number of argument lists bound to a method.
    pub fn resolved_calls(&self) -> usize {
        self.call_targets.len()
    }

    /// Number of expressions bound to a field or property.
    pub fn resolved_storage_refs(&self) -> usize {
        self.storage_refs.len()
    }
}

impl SemanticModel for BoundModel {
    fn call_target(&self, args: &ArgumentList) -> Option<&MethodSignature> {
        self.call_targets
            .get(&args.id)
            .map(|&id| self.table.signature(id))
    }

    fn storage_symbol(&self, expr: &Expr) -> Option<&StorageSymbol> {
        self.storage_refs
            .get(&expr.id)
            .map(|&id| self.table.storage_symbol(id))
    }
}

/// Build the declaration table for `unit` and bind every body against it.
pub fn bind(unit: &CompilationUnit) -> BoundModel {
    let table = SymbolTable::build(unit);
    let (storage_refs, call_targets) = {
        let mut binder = Binder::new(&table);
        binder.bind_items(&unit.items);
        (binder.storage_refs, binder.call_targets)
    };
    BoundModel {
        table,
        storage_refs,
        call_targets,
    }
}

/// What a name or member access turned out to be.
enum Resolved<'t> {
    /// A value (or type name) with its static type, when known.
    Typed(Option<TypeId>),
    /// A method group, waiting for its argument list.
    Methods(&'t [MethodEntry]),
}

struct Binder<'t> {
    table: &'t SymbolTable,
    /// Block scopes of locals and parameters, innermost last.
    scopes: Vec<HashMap<String, Option<TypeId>>>,
    current: Option<TypeId>,
    storage_refs: HashMap<NodeId, StorageId>,
    call_targets: HashMap<NodeId, MethodId>,
}

impl<'t> Binder<'t> {
    fn new(table: &'t SymbolTable) -> Self {
        Self {
            table,
            scopes: Vec::new(),
            current: None,
            storage_refs: HashMap::new(),
            call_targets: HashMap::new(),
        }
    }

    fn bind_items(&mut self, items: &[Item]) {
        for item in items {
            match item {
                Item::Namespace(ns) => self.bind_items(&ns.items),
                Item::Type(decl) => self.bind_type(decl),
            }
        }
    }

    fn bind_type(&mut self, decl: &TypeDecl) {
        let outer = std::mem::replace(&mut self.current, self.table.type_named(&decl.name.text));
        for member in &decl.members {
            match member {
                Member::Field(field) => {
                    for declarator in &field.declarators {
                        if let Some(init) = &declarator.init {
                            self.bind_expr(init);
                        }
                    }
                }
                Member::Property(property) => self.bind_property(property),
                Member::Method(method) => {
                    if let Some(body) = &method.body {
                        self.with_parameters(&method.parameters, |b| b.bind_block(body));
                    }
                }
                Member::Type(nested) => self.bind_type(nested),
            }
        }
        self.current = outer;
    }

    fn bind_property(&mut self, property: &PropertyDecl) {
        if let Some(init) = &property.init {
            self.bind_expr(init);
        }
        let Some(accessors) = &property.accessors else {
            return;
        };
        for accessor in accessors {
            self.with_parameters(&property.parameters, |b| {
                b.bind_accessor(property, accessor);
            });
        }
    }

    fn bind_accessor(&mut self, property: &PropertyDecl, accessor: &Accessor) {
        self.scopes.push(HashMap::new());
        for parameter in &accessor.parameters {
            self.declare_parameter(parameter);
        }
        if accessor.kind == AccessorKind::Set && accessor.parameters.is_empty() {
            let ty = property.ty.as_ref().and_then(|t| self.resolve_type(t));
            self.declare("value", ty);
        }
        self.bind_block(&accessor.body);
        self.scopes.pop();
    }

    fn with_parameters(&mut self, parameters: &[ParameterDecl], f: impl FnOnce(&mut Self)) {
        self.scopes.push(HashMap::new());
        for parameter in parameters {
            self.declare_parameter(parameter);
        }
        f(self);
        self.scopes.pop();
    }

    fn declare_parameter(&mut self, parameter: &ParameterDecl) {
        let ty = parameter.ty.as_ref().and_then(|t| self.resolve_type(t));
        self.declare(&parameter.name.text, ty);
    }

    fn declare(&mut self, name: &str, ty: Option<TypeId>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_ascii_lowercase(), ty);
        }
    }

    fn lookup_local(&self, name: &str) -> Option<Option<TypeId>> {
        let key = name.to_ascii_lowercase();
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&key).copied())
    }

    fn resolve_type(&self, ty: &TypeRef) -> Option<TypeId> {
        if ty.is_array() {
            return None;
        }
        self.table.type_named(&ty.simple_name().text)
    }

    fn resolve_type_key(&self, key: Option<&str>) -> Option<TypeId> {
        key.and_then(|k| self.table.type_named(k))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn bind_block(&mut self, body: &[Stmt]) {
        self.scopes.push(HashMap::new());
        for stmt in body {
            self.bind_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn bind_declarators(&mut self, declarators: &[VariableDeclarator]) {
        for declarator in declarators {
            let inferred = declarator.init.as_ref().and_then(|init| self.bind_expr(init));
            let ty = match &declarator.ty {
                Some(ty) => self.resolve_type(ty),
                None => inferred,
            };
            self.declare(&declarator.name.text, ty);
        }
    }

    fn bind_opt(&mut self, expr: Option<&Expr>) -> Option<TypeId> {
        expr.and_then(|e| self.bind_expr(e))
    }

    fn bind_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Local(declarators) => self.bind_declarators(declarators),
            StmtKind::Assign { target, value, .. } => {
                self.bind_expr(target);
                self.bind_expr(value);
            }
            StmtKind::Expr(expr) => {
                self.bind_expr(expr);
            }
            StmtKind::Return(value) | StmtKind::Throw(value) => {
                self.bind_opt(value.as_ref());
            }
            StmtKind::If {
                branches,
                else_body,
            } => {
                for branch in branches {
                    self.bind_expr(&branch.condition);
                    self.bind_block(&branch.body);
                }
                if let Some(body) = else_body {
                    self.bind_block(body);
                }
            }
            StmtKind::Select { subject, cases } => {
                self.bind_expr(subject);
                for case in cases {
                    for clause in &case.clauses {
                        match clause {
                            CaseClause::Else => {}
                            CaseClause::Value(value) | CaseClause::Is(_, value) => {
                                self.bind_expr(value);
                            }
                            CaseClause::Range(low, high) => {
                                self.bind_expr(low);
                                self.bind_expr(high);
                            }
                        }
                    }
                    self.bind_block(&case.body);
                }
            }
            StmtKind::While { condition, body } => {
                self.bind_expr(condition);
                self.bind_block(body);
            }
            StmtKind::DoLoop { condition, body } => {
                self.bind_opt(condition.as_ref());
                self.bind_block(body);
            }
            StmtKind::For {
                variable,
                ty,
                from,
                to,
                step,
                body,
            } => {
                let start = self.bind_expr(from);
                self.bind_expr(to);
                self.bind_opt(step.as_ref());
                self.scopes.push(HashMap::new());
                if ty.is_some() || self.lookup_local(&variable.text).is_none() {
                    let declared = ty.as_ref().and_then(|t| self.resolve_type(t));
                    self.declare(&variable.text, declared.or(start));
                }
                self.bind_block(body);
                self.scopes.pop();
            }
            StmtKind::ForEach {
                variable,
                ty,
                collection,
                body,
            } => {
                self.bind_expr(collection);
                self.scopes.push(HashMap::new());
                if ty.is_some() || self.lookup_local(&variable.text).is_none() {
                    let declared = ty.as_ref().and_then(|t| self.resolve_type(t));
                    self.declare(&variable.text, declared);
                }
                self.bind_block(body);
                self.scopes.pop();
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                self.bind_block(body);
                for catch in catches {
                    self.scopes.push(HashMap::new());
                    if let Some(variable) = &catch.variable {
                        let ty = catch.ty.as_ref().and_then(|t| self.resolve_type(t));
                        self.declare(&variable.text, ty);
                    }
                    self.bind_opt(catch.filter.as_ref());
                    self.bind_block(&catch.body);
                    self.scopes.pop();
                }
                if let Some(finally) = finally {
                    self.bind_block(finally);
                }
            }
            StmtKind::Using {
                resources,
                resource,
                body,
            } => {
                self.scopes.push(HashMap::new());
                self.bind_declarators(resources);
                self.bind_opt(resource.as_ref());
                self.bind_block(body);
                self.scopes.pop();
            }
            StmtKind::Jump => {}
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Bind `expr` and return its static type when it is a type from this unit.
    ///
    /// Member-access and invocation spines are unwound into a list and
    /// resolved root-first in a loop; only argument values and other
    /// sub-expressions recurse.
    fn bind_expr(&mut self, expr: &Expr) -> Option<TypeId> {
        let mut spine = Vec::new();
        let mut root = expr;
        loop {
            match &root.kind {
                ExprKind::MemberAccess { receiver, .. } => {
                    spine.push(root);
                    root = receiver;
                }
                ExprKind::Invocation { callee, .. } => {
                    spine.push(root);
                    root = callee;
                }
                _ => break,
            }
        }

        let mut state = self.bind_root(root);
        for node in spine.into_iter().rev() {
            state = match &node.kind {
                ExprKind::MemberAccess { name, .. } => {
                    let receiver = self.settle(state);
                    match receiver {
                        Some(owner) => self.resolve_member(node, owner, &name.text),
                        None => Resolved::Typed(None),
                    }
                }
                ExprKind::Invocation { args, .. } => {
                    let result = match state {
                        Resolved::Methods(candidates) => {
                            match self.select_overload(candidates, args) {
                                Some(entry) => {
                                    self.call_targets.insert(args.id, entry.id);
                                    self.resolve_type_key(entry.return_type.as_deref())
                                }
                                None => None,
                            }
                        }
                        // Array indexing, delegate invocation or an unknown callee.
                        Resolved::Typed(_) => None,
                    };
                    self.bind_arguments(args);
                    Resolved::Typed(result)
                }
                _ => state,
            };
        }
        self.settle(state)
    }

    /// Collapse a method group referenced without parentheses into its result type.
    fn settle(&self, state: Resolved<'t>) -> Option<TypeId> {
        match state {
            Resolved::Typed(ty) => ty,
            Resolved::Methods(candidates) => candidates
                .first()
                .and_then(|c| self.resolve_type_key(c.return_type.as_deref())),
        }
    }

    fn bind_root(&mut self, root: &Expr) -> Resolved<'t> {
        match &root.kind {
            ExprKind::Name(ident) => self.resolve_name(root, &ident.text),
            ExprKind::SelfRef(SelfKind::Me | SelfKind::MyClass) => Resolved::Typed(self.current),
            ExprKind::SelfRef(SelfKind::MyBase) => {
                Resolved::Typed(self.current.and_then(|t| self.table.base_of(t)))
            }
            _ => Resolved::Typed(self.bind_leaf(root)),
        }
    }

    fn bind_leaf(&mut self, expr: &Expr) -> Option<TypeId> {
        match &expr.kind {
            ExprKind::Paren(inner) => self.bind_expr(inner),
            ExprKind::Unary { operand, .. } => {
                self.bind_expr(operand);
                None
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.bind_expr(lhs);
                self.bind_expr(rhs);
                None
            }
            ExprKind::Cast { operand, ty, .. } => {
                self.bind_expr(operand);
                self.resolve_type(ty)
            }
            ExprKind::New { ty, args } => {
                let table = self.table;
                let created = table.type_named(&ty.simple_name().text);
                if let Some(args) = args {
                    if let Some(created) = created {
                        let constructors = &table.type_info(created).constructors;
                        if let Some(entry) = self.select_overload(constructors, args) {
                            self.call_targets.insert(args.id, entry.id);
                        }
                    }
                    self.bind_arguments(args);
                }
                created
            }
            ExprKind::Collection(elements) => {
                for element in elements {
                    self.bind_expr(element);
                }
                None
            }
            ExprKind::Literal(_)
            | ExprKind::Name(_)
            | ExprKind::SelfRef(_)
            | ExprKind::MemberAccess { .. }
            | ExprKind::Invocation { .. } => None,
        }
    }

    fn bind_arguments(&mut self, args: &ArgumentList) {
        for argument in &args.arguments {
            self.bind_opt(argument.value.as_ref());
        }
    }

    /// Unqualified name: locals, then members of the enclosing type and its
    /// bases, then module members, then type names.
    fn resolve_name(&mut self, expr: &Expr, name: &str) -> Resolved<'t> {
        if let Some(ty) = self.lookup_local(name) {
            return Resolved::Typed(ty);
        }
        let table = self.table;
        let scopes = self.current.into_iter().chain(table.modules().iter().copied());
        for owner in scopes {
            if let Some(resolved) = self.try_member(expr, owner, name) {
                return resolved;
            }
        }
        Resolved::Typed(table.type_named(name))
    }

    fn resolve_member(&mut self, expr: &Expr, owner: TypeId, name: &str) -> Resolved<'t> {
        self.try_member(expr, owner, name)
            .unwrap_or(Resolved::Typed(None))
    }

    fn try_member(&mut self, expr: &Expr, owner: TypeId, name: &str) -> Option<Resolved<'t>> {
        let table = self.table;
        if let Some(entry) = table.find_storage(owner, name) {
            self.storage_refs.insert(expr.id, entry.id);
            return Some(Resolved::Typed(self.resolve_type_key(entry.ty.as_deref())));
        }
        table.find_methods(owner, name).map(Resolved::Methods)
    }

    /// One candidate wins outright; otherwise the single applicable one, if any.
    fn select_overload(
        &self,
        candidates: &'t [MethodEntry],
        args: &ArgumentList,
    ) -> Option<&'t MethodEntry> {
        if let [only] = candidates {
            return Some(only);
        }
        let mut applicable = candidates.iter().filter(|c| self.is_applicable(c, args));
        let first = applicable.next()?;
        applicable.next().is_none().then_some(first)
    }

    fn is_applicable(&self, candidate: &MethodEntry, args: &ArgumentList) -> bool {
        let signature = self.table.signature(candidate.id);
        let positional = args.arguments.iter().filter(|a| !a.is_named()).count();
        let fits = positional <= signature.parameters.len() || signature.is_param_array;
        let names_match = args
            .arguments
            .iter()
            .filter_map(|a| a.name.as_ref())
            .all(|name| signature.parameter_named(&name.text).is_some());
        fits && names_match && args.arguments.len() >= candidate.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::MethodDecl;
    use crate::parser::parse_source;
    use crate::semantic::{ContainerKind, ParameterModality, StorageKind};

    fn parse(source: &str) -> CompilationUnit {
        parse_source(source).unwrap_or_else(|err| panic!("parse failed: {err}"))
    }

    fn find_method<'u>(unit: &'u CompilationUnit, name: &str) -> &'u MethodDecl {
        fn search<'u>(items: &'u [Item], name: &str) -> Option<&'u MethodDecl> {
            items.iter().find_map(|item| match item {
                Item::Namespace(ns) => search(&ns.items, name),
                Item::Type(decl) => decl.members.iter().find_map(|m| match m {
                    Member::Method(method) if method.name.matches(name) => Some(method),
                    _ => None,
                }),
            })
        }
        search(&unit.items, name).unwrap_or_else(|| panic!("method {name} not found"))
    }

    /// The call expression of the `index`th statement of `method`.
    fn call_in<'u>(unit: &'u CompilationUnit, method: &str, index: usize) -> &'u Expr {
        let body = find_method(unit, method).body.as_ref().expect("body");
        match &body[index].kind {
            StmtKind::Expr(expr) => expr,
            other => panic!("expected a call statement, got {other:?}"),
        }
    }

    fn arg(call: &Expr, index: usize) -> &Expr {
        call.call_arguments().expect("call site").arguments[index]
            .value
            .as_ref()
            .expect("argument value")
    }

    const PROGRAM: &str = r#"
Structure Point
    Public ReadOnly Property X As Integer
    Public Y As Integer
End Structure

Class Program
    Private ReadOnly origin As Point
    Private cursor As Point

    Sub IncreaseByOne(ByRef x As Integer)
        x += 1
    End Sub

    Sub IncreaseByAmount(ByRef x As Integer, amount As Integer)
        x += amount
    End Sub

    Sub Main()
        Dim point As New Point
        IncreaseByAmount(amount:=5, x:=point.X)
        IncreaseByOne(origin.Y)
        IncreaseByOne(Me.cursor.Y)
    End Sub

    Sub Shadowed(origin As Point)
        IncreaseByOne(origin.Y)
    End Sub
End Class
"#;

    #[test]
    fn binds_call_targets_and_member_storage() {
        let unit = parse(PROGRAM);
        let model = bind(&unit);

        let call = call_in(&unit, "Main", 1);
        let target = model
            .call_target(call.call_arguments().expect("args"))
            .expect("resolved call");
        assert_eq!(target.name, "IncreaseByAmount");
        assert_eq!(target.parameters[0].modality, ParameterModality::ByReferenceMutable);

        let point_x = arg(call, 1);
        let symbol = model.storage_symbol(point_x).expect("point.X is storage");
        assert_eq!(symbol.kind, StorageKind::Property);
        assert!(symbol.read_only);
        assert_eq!(symbol.container, ContainerKind::Value);

        let (receiver, _) = point_x.as_member_access().expect("member access");
        assert!(model.storage_symbol(receiver).is_none(), "locals are not storage");
    }

    #[test]
    fn bare_field_names_have_an_implicit_receiver() {
        let unit = parse(PROGRAM);
        let model = bind(&unit);

        let origin_y = arg(call_in(&unit, "Main", 2), 0);
        let (origin, _) = origin_y.as_member_access().expect("member access");
        let field = model.storage_symbol(origin).expect("origin is a field");
        assert_eq!(field.kind, StorageKind::Field);
        assert!(field.read_only);
        assert_eq!(field.container, ContainerKind::Reference);

        let cursor_y = arg(call_in(&unit, "Main", 3), 0);
        let (cursor, _) = cursor_y.as_member_access().expect("member access");
        assert!(!model.storage_symbol(cursor).expect("field").read_only);
    }

    #[test]
    fn parameters_shadow_fields() {
        let unit = parse(PROGRAM);
        let model = bind(&unit);
        let origin_y = arg(call_in(&unit, "Shadowed", 0), 0);
        let (origin, _) = origin_y.as_member_access().expect("member access");
        assert!(model.storage_symbol(origin).is_none());
        assert!(model.storage_symbol(origin_y).is_some());
    }

    #[test]
    fn overloads_resolve_only_when_unambiguous() {
        let unit = parse(
            r#"
Module Overloads
    Sub Swap(ByRef a As Integer)
    End Sub
    Sub Swap(ByRef a As Integer, ByRef b As Integer)
    End Sub
    Sub Pick(a As Integer)
    End Sub
    Sub Pick(a As String)
    End Sub

    Sub Main()
        Swap(1)
        Swap(1, 2)
        Pick(1)
        Swap(a:=1, c:=2)
    End Sub
End Module
"#,
        );
        let model = bind(&unit);
        let target = |index| model.call_target(call_in(&unit, "Main", index).call_arguments().expect("args"));
        assert_eq!(target(0).map(|s| s.parameters.len()), Some(1));
        assert_eq!(target(1).map(|s| s.parameters.len()), Some(2));
        assert!(target(2).is_none(), "ambiguous by arity");
        assert!(target(3).is_none(), "unknown parameter name");
    }

    #[test]
    fn constructors_inherited_members_and_modules() {
        let unit = parse(
            r#"
Class Holder
    Public ReadOnly Value As Integer
    Public Sub New(ByRef seed As Integer)
    End Sub
End Class

Class Derived
    Inherits Holder
    Sub Run()
        Dim h = New Holder(Value)
        Helpers.Bump(Value)
        Bump(h.Value)
    End Sub
End Class

Module Helpers
    Sub Bump(ByRef n As Integer)
    End Sub
End Module
"#,
        );
        let model = bind(&unit);
        let body = find_method(&unit, "Run").body.as_ref().expect("body");
        let StmtKind::Local(declarators) = &body[0].kind else {
            panic!("expected Dim");
        };
        let creation = declarators[0].init.as_ref().expect("initializer");
        let ctor = model
            .call_target(creation.call_arguments().expect("args"))
            .expect("constructor");
        assert_eq!(ctor.parameters[0].name, "seed");
        assert!(model.storage_symbol(arg(creation, 0)).is_some(), "inherited field");

        let qualified = call_in(&unit, "Run", 1);
        assert!(model.call_target(qualified.call_arguments().expect("args")).is_some());
        let unqualified = call_in(&unit, "Run", 2);
        assert!(model.call_target(unqualified.call_arguments().expect("args")).is_some());
        assert!(model.storage_symbol(arg(unqualified, 0)).is_some(), "inferred local type");
    }

    #[test]
    fn unknown_receivers_stay_unresolved() {
        let unit = parse(
            r#"
Module M
    Sub Main()
        Console.WriteLine(thing.Value)
        Frobnicate(1)
    End Sub
End Module
"#,
        );
        let model = bind(&unit);
        let call = call_in(&unit, "Main", 0);
        assert!(model.call_target(call.call_arguments().expect("args")).is_none());
        assert!(model.storage_symbol(arg(call, 0)).is_none());
        assert_eq!(model.resolved_calls(), 0);
        assert_eq!(model.resolved_storage_refs(), 0);
    }
}

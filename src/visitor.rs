use crate::ast::{
    ArgumentList, CaseClause, CompilationUnit, Expr, ExprKind, Item, Member, MethodDecl, Stmt,
    StmtKind, TypeDecl, VariableDeclarator,
};
use crate::lint::LintContext;

/// Callbacks for [`walk_unit`]. Every method defaults to doing nothing.
pub trait SyntaxVisitor {
    fn visit_type(&mut self, _decl: &TypeDecl, _ctx: &mut LintContext<'_>) {}
    fn visit_method(&mut self, _decl: &MethodDecl, _ctx: &mut LintContext<'_>) {}
    fn visit_stmt(&mut self, _stmt: &Stmt, _ctx: &mut LintContext<'_>) {}
    fn visit_expr(&mut self, _expr: &Expr, _ctx: &mut LintContext<'_>) {}
    /// Argument list of an invocation or `New` expression.
    fn visit_argument_list(&mut self, _args: &ArgumentList, _ctx: &mut LintContext<'_>) {}
}

enum Node<'a> {
    Item(&'a Item),
    Member(&'a Member),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

/// Walk every declaration, statement and expression of `unit` in source order.
///
/// Uses an explicit work stack, so arbitrarily deep member chains and nested
/// blocks cannot overflow the call stack.
pub fn walk_unit(
    unit: &CompilationUnit,
    visitor: &mut impl SyntaxVisitor,
    ctx: &mut LintContext<'_>,
) {
    let mut stack: Vec<Node<'_>> = unit.items.iter().rev().map(Node::Item).collect();

    while let Some(node) = stack.pop() {
        // Children are pushed in reverse so they pop in source order.
        let mut children: Vec<Node<'_>> = Vec::new();
        match node {
            Node::Item(Item::Namespace(ns)) => children.extend(ns.items.iter().map(Node::Item)),
            Node::Item(Item::Type(decl)) | Node::Member(Member::Type(decl)) => {
                visitor.visit_type(decl, ctx);
                children.extend(decl.members.iter().map(Node::Member));
            }
            Node::Member(Member::Field(field)) => declarators(&field.declarators, &mut children),
            Node::Member(Member::Property(property)) => {
                children.extend(property.init.iter().map(Node::Expr));
                for accessor in property.accessors.iter().flatten() {
                    children.extend(accessor.body.iter().map(Node::Stmt));
                }
            }
            Node::Member(Member::Method(method)) => {
                visitor.visit_method(method, ctx);
                children.extend(method.body.iter().flatten().map(Node::Stmt));
            }
            Node::Stmt(stmt) => {
                visitor.visit_stmt(stmt, ctx);
                stmt_children(stmt, &mut children);
            }
            Node::Expr(expr) => {
                visitor.visit_expr(expr, ctx);
                if let Some(args) = expr.call_arguments() {
                    visitor.visit_argument_list(args, ctx);
                }
                expr_children(expr, &mut children);
            }
        }
        stack.extend(children.into_iter().rev());
    }
}

fn declarators<'a>(declarators: &'a [VariableDeclarator], out: &mut Vec<Node<'a>>) {
    out.extend(declarators.iter().filter_map(|d| d.init.as_ref()).map(Node::Expr));
}

fn block<'a>(body: &'a [Stmt], out: &mut Vec<Node<'a>>) {
    out.extend(body.iter().map(Node::Stmt));
}

fn stmt_children<'a>(stmt: &'a Stmt, out: &mut Vec<Node<'a>>) {
    match &stmt.kind {
        StmtKind::Local(decls) => declarators(decls, out),
        StmtKind::Assign { target, value, .. } => {
            out.push(Node::Expr(target));
            out.push(Node::Expr(value));
        }
        StmtKind::Expr(expr) => out.push(Node::Expr(expr)),
        StmtKind::Return(value) | StmtKind::Throw(value) => {
            out.extend(value.iter().map(Node::Expr));
        }
        StmtKind::If {
            branches,
            else_body,
        } => {
            for branch in branches {
                out.push(Node::Expr(&branch.condition));
                block(&branch.body, out);
            }
            block(else_body.as_deref().unwrap_or_default(), out);
        }
        StmtKind::Select { subject, cases } => {
            out.push(Node::Expr(subject));
            for case in cases {
                for clause in &case.clauses {
                    match clause {
                        CaseClause::Else => {}
                        CaseClause::Value(value) | CaseClause::Is(_, value) => {
                            out.push(Node::Expr(value));
                        }
                        CaseClause::Range(low, high) => {
                            out.push(Node::Expr(low));
                            out.push(Node::Expr(high));
                        }
                    }
                }
                block(&case.body, out);
            }
        }
        StmtKind::While { condition, body } => {
            out.push(Node::Expr(condition));
            block(body, out);
        }
        StmtKind::DoLoop { condition, body } => {
            out.extend(condition.iter().map(Node::Expr));
            block(body, out);
        }
        StmtKind::For {
            from,
            to,
            step,
            body,
            ..
        } => {
            out.push(Node::Expr(from));
            out.push(Node::Expr(to));
            out.extend(step.iter().map(Node::Expr));
            block(body, out);
        }
        StmtKind::ForEach {
            collection, body, ..
        } => {
            out.push(Node::Expr(collection));
            block(body, out);
        }
        StmtKind::Try {
            body,
            catches,
            finally,
        } => {
            block(body, out);
            for catch in catches {
                out.extend(catch.filter.iter().map(Node::Expr));
                block(&catch.body, out);
            }
            block(finally.as_deref().unwrap_or_default(), out);
        }
        StmtKind::Using {
            resources,
            resource,
            body,
        } => {
            declarators(resources, out);
            out.extend(resource.iter().map(Node::Expr));
            block(body, out);
        }
        StmtKind::Jump => {}
    }
}

fn expr_children<'a>(expr: &'a Expr, out: &mut Vec<Node<'a>>) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::SelfRef(_) => {}
        ExprKind::MemberAccess { receiver, .. } => out.push(Node::Expr(receiver)),
        ExprKind::Invocation { callee, args } => {
            out.push(Node::Expr(callee));
            out.extend(args.arguments.iter().filter_map(|a| a.value.as_ref()).map(Node::Expr));
        }
        ExprKind::New { args, .. } => {
            let arguments = args.iter().flat_map(|a| a.arguments.iter());
            out.extend(arguments.filter_map(|a| a.value.as_ref()).map(Node::Expr));
        }
        ExprKind::Paren(inner) => out.push(Node::Expr(inner)),
        ExprKind::Unary { operand, .. } | ExprKind::Cast { operand, .. } => {
            out.push(Node::Expr(operand));
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            out.push(Node::Expr(lhs));
            out.push(Node::Expr(rhs));
        }
        ExprKind::Collection(items) => out.extend(items.iter().map(Node::Expr)),
    }
}

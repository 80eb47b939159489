//! Syntax tree for the Visual Basic subset understood by vb-lint.
//!
//! Nodes that the semantic model needs to look up later (expressions and
//! argument lists) carry a [`NodeId`] assigned by the parser. Everything else
//! is plain data with a [`TextRange`] back into the source.

use std::fmt;

/// Half-open byte range into the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest range covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: TextRange) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Source text for this range, or `""` when it does not line up with `source`.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

/// Parser-assigned identity of an expression or argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A syntax error with the byte range it was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at byte range {}..{})",
            self.message, self.range.start, self.range.end
        )
    }
}

/// Identifier as spelled in the source. Visual Basic names are
/// case-insensitive, so comparisons go through [`Ident::matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub text: String,
    pub range: TextRange,
}

impl Ident {
    pub fn new(text: impl Into<String>, range: TextRange) -> Self {
        Self {
            text: text.into(),
            range,
        }
    }

    pub fn matches(&self, other: &str) -> bool {
        self.text.eq_ignore_ascii_case(other)
    }

    /// Case-folded lookup key.
    pub fn key(&self) -> String {
        self.text.to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone)]
pub enum Item {
    Namespace(NamespaceDecl),
    Type(TypeDecl),
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub name: String,
    pub items: Vec<Item>,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDeclKind {
    Class,
    Structure,
    Module,
    Interface,
    Enum,
}

impl TypeDeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeDeclKind::Class => "Class",
            TypeDeclKind::Structure => "Structure",
            TypeDeclKind::Module => "Module",
            TypeDeclKind::Interface => "Interface",
            TypeDeclKind::Enum => "Enum",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub kind: TypeDeclKind,
    pub name: Ident,
    pub modifiers: Modifiers,
    pub inherits: Option<TypeRef>,
    pub members: Vec<Member>,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub enum Member {
    Field(FieldDecl),
    Property(PropertyDecl),
    Method(MethodDecl),
    Type(TypeDecl),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
    Protected,
    Friend,
}

/// Declaration modifiers that matter to the analysis. Others are accepted and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub access: Option<Access>,
    pub shared: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub constant: bool,
    pub must_override: bool,
}

/// `Name [As [New] Type] [= init]` as used by fields and locals.
///
/// `As New T(args)` is stored as `ty = T` plus an `init` holding the
/// object-creation expression.
#[derive(Debug, Clone)]
pub struct VariableDeclarator {
    pub name: Ident,
    pub ty: Option<TypeRef>,
    pub init: Option<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub declarators: Vec<VariableDeclarator>,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Get,
    Set,
}

#[derive(Debug, Clone)]
pub struct Accessor {
    pub kind: AccessorKind,
    pub access: Option<Access>,
    pub parameters: Vec<ParameterDecl>,
    pub body: Vec<Stmt>,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub modifiers: Modifiers,
    pub name: Ident,
    pub parameters: Vec<ParameterDecl>,
    pub ty: Option<TypeRef>,
    pub init: Option<Expr>,
    /// `None` for auto-implemented (and abstract) properties.
    pub accessors: Option<Vec<Accessor>>,
    pub range: TextRange,
}

impl PropertyDecl {
    pub fn is_auto(&self) -> bool {
        self.accessors.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Sub,
    Function,
    Constructor,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    pub kind: MethodKind,
    pub name: Ident,
    pub parameters: Vec<ParameterDecl>,
    pub return_type: Option<TypeRef>,
    /// `None` for `MustOverride` and interface members.
    pub body: Option<Vec<Stmt>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassingMode {
    #[default]
    ByVal,
    ByRef,
}

#[derive(Debug, Clone)]
pub struct ParameterDecl {
    pub attributes: Vec<Ident>,
    pub passing: PassingMode,
    pub optional: bool,
    pub param_array: bool,
    pub name: Ident,
    pub ty: Option<TypeRef>,
    pub default: Option<Expr>,
    pub range: TextRange,
}

impl ParameterDecl {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| {
            a.matches(name)
                || a.text
                    .strip_suffix("Attribute")
                    .is_some_and(|short| short.eq_ignore_ascii_case(name))
        })
    }
}

/// `A.B.C(Of T)()` style type reference.
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub path: Vec<Ident>,
    pub type_args: Vec<TypeRef>,
    pub array_rank: usize,
    pub range: TextRange,
}

impl TypeRef {
    /// Rightmost path segment, which is what lookups key on.
    pub fn simple_name(&self) -> &Ident {
        // The parser never builds an empty path.
        &self.path[self.path.len() - 1]
    }

    pub fn is_array(&self) -> bool {
        self.array_rank > 0
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    IntDivide,
    Power,
    Concat,
}

#[derive(Debug, Clone)]
pub struct IfBranch {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum CaseClause {
    Else,
    Value(Expr),
    Range(Expr, Expr),
    Is(BinaryOp, Expr),
}

#[derive(Debug, Clone)]
pub struct CaseBlock {
    pub clauses: Vec<CaseClause>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct CatchBlock {
    pub variable: Option<Ident>,
    pub ty: Option<TypeRef>,
    pub filter: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `Dim`, `Static` and `Const` locals.
    Local(Vec<VariableDeclarator>),
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    /// Call statements (with or without `Call`) and other bare expressions.
    Expr(Expr),
    Return(Option<Expr>),
    Throw(Option<Expr>),
    If {
        branches: Vec<IfBranch>,
        else_body: Option<Vec<Stmt>>,
    },
    Select {
        subject: Expr,
        cases: Vec<CaseBlock>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    DoLoop {
        condition: Option<Expr>,
        body: Vec<Stmt>,
    },
    For {
        variable: Ident,
        ty: Option<TypeRef>,
        from: Expr,
        to: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    ForEach {
        variable: Ident,
        ty: Option<TypeRef>,
        collection: Expr,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchBlock>,
        finally: Option<Vec<Stmt>>,
    },
    Using {
        resources: Vec<VariableDeclarator>,
        /// `Using expr` form without a declared variable.
        resource: Option<Expr>,
        body: Vec<Stmt>,
    },
    /// `Exit ...`, `Continue ...` and a bare `End`.
    Jump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Integer,
    Float,
    String,
    Char,
    Date,
    Boolean,
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfKind {
    Me,
    MyBase,
    MyClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
    AddressOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntDivide,
    Modulo,
    Power,
    Concat,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Is,
    IsNot,
    Like,
    And,
    AndAlso,
    Or,
    OrElse,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    CType,
    DirectCast,
    TryCast,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(LiteralKind),
    Name(Ident),
    SelfRef(SelfKind),
    MemberAccess {
        receiver: Box<Expr>,
        name: Ident,
    },
    Invocation {
        callee: Box<Expr>,
        args: ArgumentList,
    },
    New {
        ty: TypeRef,
        args: Option<ArgumentList>,
    },
    Paren(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cast {
        kind: CastKind,
        operand: Box<Expr>,
        ty: TypeRef,
    },
    /// `{a, b, c}` array literal.
    Collection(Vec<Expr>),
}

impl Expr {
    /// Receiver and member name when this is `receiver.Name`.
    pub fn as_member_access(&self) -> Option<(&Expr, &Ident)> {
        match &self.kind {
            ExprKind::MemberAccess { receiver, name } => Some((receiver, name)),
            _ => None,
        }
    }

    /// The argument list when this expression is a call site.
    pub fn call_arguments(&self) -> Option<&ArgumentList> {
        match &self.kind {
            ExprKind::Invocation { args, .. } => Some(args),
            ExprKind::New { args, .. } => args.as_ref(),
            _ => None,
        }
    }
}

/// Frees nested expressions from a work list instead of recursing, so a
/// member chain of any depth can be dropped.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(&mut self.kind, &mut pending);
        while let Some(mut expr) = pending.pop() {
            // `expr` is left a leaf, so its own drop does no further work.
            detach_children(&mut expr.kind, &mut pending);
        }
    }
}

fn detach_children(kind: &mut ExprKind, out: &mut Vec<Expr>) {
    let argument_values =
        |args: ArgumentList| args.arguments.into_iter().filter_map(|a| a.value);
    match std::mem::replace(kind, ExprKind::Literal(LiteralKind::Nothing)) {
        ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::SelfRef(_) => {}
        ExprKind::MemberAccess { receiver: child, .. }
        | ExprKind::Paren(child)
        | ExprKind::Unary { operand: child, .. }
        | ExprKind::Cast { operand: child, .. } => out.push(*child),
        ExprKind::Invocation { callee, args } => {
            out.push(*callee);
            out.extend(argument_values(args));
        }
        ExprKind::New { args, .. } => out.extend(args.into_iter().flat_map(argument_values)),
        ExprKind::Binary { lhs, rhs, .. } => {
            out.push(*lhs);
            out.push(*rhs);
        }
        ExprKind::Collection(items) => out.extend(items),
    }
}

/// Parenthesised argument list of an invocation or object creation.
#[derive(Debug, Clone)]
pub struct ArgumentList {
    pub id: NodeId,
    pub arguments: Vec<Argument>,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub struct Argument {
    /// Binding name of a `name:=value` argument.
    pub name: Option<Ident>,
    /// `None` for an omitted argument such as the middle of `f(a, , c)`.
    pub value: Option<Expr>,
    pub range: TextRange,
}

impl Argument {
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

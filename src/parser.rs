//! Recursive-descent parser for the Visual Basic subset.
//!
//! Visual Basic is line oriented: statements end at a newline or `:`, and
//! blocks close with `End <keyword>` (or `Next`, `Loop`, ...). The parser
//! recovers from a malformed statement or member by skipping to the end of its
//! line, so one bad line never hides the rest of a file from the linter.

use crate::ast::*;
use crate::error::{ClippyResult, VbLintError};
use crate::lexer::{Keyword, Token, TokenKind, lex_lossy};

type PResult<T> = Result<T, SyntaxError>;

/// Parse `source`, failing on the first file with any syntax error.
pub fn parse_source(source: &str) -> ClippyResult<CompilationUnit> {
    let (unit, errors) = parse_source_lossy(source);
    if errors.is_empty() {
        Ok(unit)
    } else {
        Err(VbLintError::Syntax(errors))
    }
}

/// Parse `source`, skipping lines that fail to parse and returning their errors.
pub fn parse_source_lossy(source: &str) -> (CompilationUnit, Vec<SyntaxError>) {
    let (tokens, lex_errors) = lex_lossy(source);
    let mut parser = Parser::new(source, tokens);
    parser.errors = lex_errors;
    let unit = parser.parse_unit();
    (unit, parser.errors)
}

/// Deepest chain of nested sub-expressions (parentheses, operands, arguments)
/// the parser descends into before giving up on the statement.
const MAX_EXPRESSION_NESTING: usize = 64;
/// Deepest nesting of statement blocks (`If`, loops, `Try`, ...).
const MAX_BLOCK_NESTING: usize = 64;

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
    expr_nesting: usize,
    block_nesting: usize,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            next_id: 0,
            expr_nesting: 0,
            block_nesting: 0,
            errors: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    fn parse_unit(&mut self) -> CompilationUnit {
        CompilationUnit {
            items: self.parse_items(false),
        }
    }

    fn parse_items(&mut self, in_namespace: bool) -> Vec<Item> {
        let mut items = Vec::new();
        loop {
            self.skip_terminators();
            if self.at(TokenKind::Eof) {
                break;
            }
            if in_namespace && self.at_end_of(Keyword::Namespace) {
                break;
            }
            match self.parse_item() {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(err) => self.recover(err),
            }
        }
        items
    }

    fn parse_item(&mut self) -> PResult<Option<Item>> {
        if self.at_kw(Keyword::Option) || self.at_kw(Keyword::Imports) {
            self.skip_line();
            return Ok(None);
        }
        if self.at_kw(Keyword::Namespace) {
            return self.parse_namespace().map(|ns| Some(Item::Namespace(ns)));
        }

        let start = self.start();
        self.skip_attribute_blocks()?;
        let (modifiers, _) = self.parse_modifiers();
        match self.type_decl_kind() {
            Some(kind) => self
                .parse_type_decl(kind, modifiers, start)
                .map(|decl| Some(Item::Type(decl))),
            None => Err(self.error_here("expected a type or namespace declaration")),
        }
    }

    fn parse_namespace(&mut self) -> PResult<NamespaceDecl> {
        let start = self.start();
        self.bump();
        let mut name = String::new();
        loop {
            let segment = self.member_name()?;
            name.push_str(&segment.text);
            if !self.eat(TokenKind::Dot) {
                break;
            }
            name.push('.');
        }
        self.end_statement()?;
        let items = self.parse_items(true);
        self.close_block(Keyword::Namespace);
        Ok(NamespaceDecl {
            name,
            items,
            range: self.range_from(start),
        })
    }

    fn type_decl_kind(&self) -> Option<TypeDeclKind> {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::Class) => Some(TypeDeclKind::Class),
            TokenKind::Keyword(Keyword::Structure) => Some(TypeDeclKind::Structure),
            TokenKind::Keyword(Keyword::Module) => Some(TypeDeclKind::Module),
            TokenKind::Keyword(Keyword::Interface) => Some(TypeDeclKind::Interface),
            TokenKind::Keyword(Keyword::Enum) => Some(TypeDeclKind::Enum),
            _ => None,
        }
    }

    fn parse_type_decl(
        &mut self,
        kind: TypeDeclKind,
        modifiers: Modifiers,
        start: usize,
    ) -> PResult<TypeDecl> {
        let keyword = match kind {
            TypeDeclKind::Class => Keyword::Class,
            TypeDeclKind::Structure => Keyword::Structure,
            TypeDeclKind::Module => Keyword::Module,
            TypeDeclKind::Interface => Keyword::Interface,
            TypeDeclKind::Enum => Keyword::Enum,
        };
        self.bump();
        let name = self.ident()?;
        if self.at(TokenKind::LParen) && self.nth_is_kw(1, Keyword::Of) {
            self.skip_balanced_parens()?;
        }
        if kind == TypeDeclKind::Enum {
            self.skip_to_terminator();
            self.skip_enum_body();
            return Ok(TypeDecl {
                kind,
                name,
                modifiers,
                inherits: None,
                members: Vec::new(),
                range: self.range_from(start),
            });
        }
        self.end_statement()?;

        let mut inherits = None;
        let mut members = Vec::new();
        loop {
            self.skip_terminators();
            if self.at(TokenKind::Eof) {
                self.errors.push(self.error_here(format!(
                    "missing `End {}`",
                    kind.as_str()
                )));
                break;
            }
            if self.at_end_of(keyword) {
                self.bump();
                self.bump();
                break;
            }
            if self.at_kw(Keyword::End) && self.nth_is_type_keyword(1) {
                // Closes an enclosing declaration; let the owner deal with it.
                self.errors.push(self.error_here(format!(
                    "expected `End {}`",
                    kind.as_str()
                )));
                break;
            }
            if self.at_kw(Keyword::Inherits) {
                self.bump();
                let base = self.parse_type()?;
                self.skip_to_terminator();
                inherits.get_or_insert(base);
                continue;
            }
            if self.at_kw(Keyword::Implements) {
                self.skip_line();
                continue;
            }
            match self.parse_member(kind) {
                Ok(Some(member)) => members.push(member),
                Ok(None) => {}
                Err(err) => self.recover(err),
            }
        }

        Ok(TypeDecl {
            kind,
            name,
            modifiers,
            inherits,
            members,
            range: self.range_from(start),
        })
    }

    fn skip_enum_body(&mut self) {
        loop {
            self.skip_terminators();
            if self.at(TokenKind::Eof) {
                self.errors.push(self.error_here("missing `End Enum`"));
                return;
            }
            if self.at_end_of(Keyword::Enum) {
                self.bump();
                self.bump();
                return;
            }
            self.skip_line();
        }
    }

    fn parse_member(&mut self, container: TypeDeclKind) -> PResult<Option<Member>> {
        let start = self.start();
        self.skip_attribute_blocks()?;
        let (modifiers, modifier_count) = self.parse_modifiers();
        let bodiless = container == TypeDeclKind::Interface || modifiers.must_override;

        if let Some(kind) = self.type_decl_kind() {
            return self
                .parse_type_decl(kind, modifiers, start)
                .map(|decl| Some(Member::Type(decl)));
        }

        match self.peek_kind() {
            TokenKind::Keyword(Keyword::Sub) | TokenKind::Keyword(Keyword::Function) => self
                .parse_method(modifiers, bodiless, start)
                .map(|m| Some(Member::Method(m))),
            TokenKind::Keyword(Keyword::Property) => self
                .parse_property(modifiers, bodiless, start)
                .map(|p| Some(Member::Property(p))),
            TokenKind::Keyword(Keyword::Event) => {
                self.skip_line();
                Ok(None)
            }
            TokenKind::Identifier(_) if modifier_count > 0 => {
                let declarators = self.parse_declarators()?;
                self.end_statement()?;
                Ok(Some(Member::Field(FieldDecl {
                    modifiers,
                    declarators,
                    range: self.range_from(start),
                })))
            }
            _ => Err(self.error_here("expected a member declaration")),
        }
    }

    fn parse_method(
        &mut self,
        modifiers: Modifiers,
        bodiless: bool,
        start: usize,
    ) -> PResult<MethodDecl> {
        let is_sub = self.at_kw(Keyword::Sub);
        let closer = if is_sub {
            Keyword::Sub
        } else {
            Keyword::Function
        };
        self.bump();

        let (kind, name) = if is_sub && self.at_kw(Keyword::New) {
            let token = self.bump();
            (MethodKind::Constructor, Ident::new("New", token.range))
        } else {
            let kind = if is_sub {
                MethodKind::Sub
            } else {
                MethodKind::Function
            };
            (kind, self.member_name()?)
        };

        if self.at(TokenKind::LParen) && self.nth_is_kw(1, Keyword::Of) {
            self.skip_balanced_parens()?;
        }
        let parameters = if self.at(TokenKind::LParen) {
            self.parse_parameter_list()?
        } else {
            Vec::new()
        };
        let return_type = if !is_sub && self.eat_kw(Keyword::As) {
            self.skip_attribute_blocks()?;
            Some(self.parse_type()?)
        } else {
            None
        };
        // `Handles x.Click`, `Implements IFoo.Bar`
        self.skip_to_terminator();

        let body = if bodiless {
            None
        } else {
            let body = self.parse_block(&|p| p.at_end_of(closer));
            self.close_block(closer);
            Some(body)
        };

        Ok(MethodDecl {
            modifiers,
            kind,
            name,
            parameters,
            return_type,
            body,
            range: self.range_from(start),
        })
    }

    fn parse_property(
        &mut self,
        modifiers: Modifiers,
        bodiless: bool,
        start: usize,
    ) -> PResult<PropertyDecl> {
        self.bump();
        let name = self.member_name()?;
        let parameters = if self.at(TokenKind::LParen) {
            self.parse_parameter_list()?
        } else {
            Vec::new()
        };

        let mut ty = None;
        let mut init = None;
        if self.eat_kw(Keyword::As) {
            self.skip_attribute_blocks()?;
            if self.at_kw(Keyword::New) {
                let creation = self.parse_object_creation()?;
                if let ExprKind::New { ty: created, .. } = &creation.kind {
                    ty = Some(created.clone());
                }
                init = Some(creation);
            } else {
                ty = Some(self.parse_type()?);
            }
        }
        if self.eat(TokenKind::Equal) {
            self.skip_newlines();
            init = Some(self.parse_expression()?);
        }
        self.skip_to_terminator();

        let accessors = if bodiless || !self.next_line_starts_accessor() {
            None
        } else {
            Some(self.parse_accessors()?)
        };

        Ok(PropertyDecl {
            modifiers,
            name,
            parameters,
            ty,
            init,
            accessors,
            range: self.range_from(start),
        })
    }

    /// Whether the line after the property header begins a `Get`/`Set` block.
    fn next_line_starts_accessor(&self) -> bool {
        let mut i = self.pos;
        while matches!(
            self.kind_at(i),
            TokenKind::Newline | TokenKind::Colon
        ) {
            i += 1;
        }
        while matches!(
            self.kind_at(i),
            TokenKind::Keyword(
                Keyword::Public | Keyword::Private | Keyword::Protected | Keyword::Friend
            )
        ) {
            i += 1;
        }
        matches!(
            self.kind_at(i),
            TokenKind::Keyword(Keyword::Get | Keyword::Set)
        ) || matches!(self.kind_at(i), TokenKind::Less)
    }

    fn parse_accessors(&mut self) -> PResult<Vec<Accessor>> {
        let mut accessors = Vec::new();
        loop {
            self.skip_terminators();
            if self.at_end_of(Keyword::Property) {
                self.bump();
                self.bump();
                break;
            }
            let start = self.start();
            self.skip_attribute_blocks()?;
            let (modifiers, _) = self.parse_modifiers();
            let kind = if self.eat_kw(Keyword::Get) {
                AccessorKind::Get
            } else if self.eat_kw(Keyword::Set) {
                AccessorKind::Set
            } else {
                self.errors
                    .push(self.error_here("expected `Get`, `Set` or `End Property`"));
                break;
            };
            let parameters = if self.at(TokenKind::LParen) {
                self.parse_parameter_list()?
            } else {
                Vec::new()
            };
            self.end_statement()?;
            let closer = match kind {
                AccessorKind::Get => Keyword::Get,
                AccessorKind::Set => Keyword::Set,
            };
            let body = self.parse_block(&|p| p.at_end_of(closer));
            self.close_block(closer);
            accessors.push(Accessor {
                kind,
                access: modifiers.access,
                parameters,
                body,
                range: self.range_from(start),
            });
        }
        Ok(accessors)
    }

    fn parse_parameter_list(&mut self) -> PResult<Vec<ParameterDecl>> {
        self.expect(TokenKind::LParen, "expected `(`")?;
        self.skip_newlines();
        let mut parameters = Vec::new();
        if self.eat(TokenKind::RParen) {
            return Ok(parameters);
        }
        loop {
            parameters.push(self.parse_parameter()?);
            self.skip_newlines();
            if self.eat(TokenKind::Comma) {
                self.skip_newlines();
                continue;
            }
            self.expect(TokenKind::RParen, "expected `,` or `)` in parameter list")?;
            break;
        }
        Ok(parameters)
    }

    fn parse_parameter(&mut self) -> PResult<ParameterDecl> {
        let start = self.start();
        let mut attributes = Vec::new();
        while self.at(TokenKind::Less) {
            attributes.extend(self.parse_attribute_block()?);
        }

        let mut passing = PassingMode::ByVal;
        let mut optional = false;
        let mut param_array = false;
        loop {
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::ByVal) => passing = PassingMode::ByVal,
                TokenKind::Keyword(Keyword::ByRef) => passing = PassingMode::ByRef,
                TokenKind::Keyword(Keyword::Optional) => optional = true,
                TokenKind::Keyword(Keyword::ParamArray) => param_array = true,
                _ => break,
            }
            self.bump();
        }

        let name = self.ident()?;
        // `values()` declares an array parameter.
        if self.at(TokenKind::LParen) {
            self.skip_balanced_parens()?;
        }
        self.eat(TokenKind::Question);
        let ty = if self.eat_kw(Keyword::As) {
            self.skip_attribute_blocks()?;
            Some(self.parse_type()?)
        } else {
            None
        };
        let default = if self.eat(TokenKind::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(ParameterDecl {
            attributes,
            passing,
            optional,
            param_array,
            name,
            ty,
            default,
            range: self.range_from(start),
        })
    }

    /// `<A, B(...)>`; returns the attribute names.
    fn parse_attribute_block(&mut self) -> PResult<Vec<Ident>> {
        self.expect(TokenKind::Less, "expected `<`")?;
        let mut names = Vec::new();
        loop {
            self.skip_newlines();
            // `Assembly:` / `Module:` targets
            if self.nth_kind(1) == &TokenKind::Colon {
                self.bump();
                self.bump();
            }
            let mut name = self.member_name()?;
            while self.eat(TokenKind::Dot) {
                name = self.member_name()?;
            }
            if self.at(TokenKind::LParen) {
                self.skip_balanced_parens()?;
            }
            names.push(name);
            self.skip_newlines();
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Greater, "expected `>` to close attribute list")?;
        Ok(names)
    }

    fn skip_attribute_blocks(&mut self) -> PResult<()> {
        while self.at(TokenKind::Less) {
            self.parse_attribute_block()?;
            self.skip_newlines();
        }
        Ok(())
    }

    /// Returns the collected modifiers and how many modifier keywords were consumed.
    fn parse_modifiers(&mut self) -> (Modifiers, usize) {
        let mut modifiers = Modifiers::default();
        let mut count = 0;
        loop {
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::Public) => modifiers.access = Some(Access::Public),
                TokenKind::Keyword(Keyword::Private) => modifiers.access = Some(Access::Private),
                TokenKind::Keyword(Keyword::Friend) => {
                    if modifiers.access != Some(Access::Protected) {
                        modifiers.access = Some(Access::Friend);
                    }
                }
                TokenKind::Keyword(Keyword::Protected) => {
                    modifiers.access = Some(Access::Protected)
                }
                TokenKind::Keyword(Keyword::Shared) => modifiers.shared = true,
                TokenKind::Keyword(Keyword::ReadOnly) => modifiers.read_only = true,
                TokenKind::Keyword(Keyword::WriteOnly) => modifiers.write_only = true,
                TokenKind::Keyword(Keyword::Const) => modifiers.constant = true,
                TokenKind::Keyword(Keyword::MustOverride) => modifiers.must_override = true,
                TokenKind::Keyword(
                    Keyword::Dim
                    | Keyword::Static
                    | Keyword::Overridable
                    | Keyword::Overrides
                    | Keyword::Overloads
                    | Keyword::Shadows
                    | Keyword::NotOverridable
                    | Keyword::Default
                    | Keyword::Partial
                    | Keyword::WithEvents
                    | Keyword::MustInherit
                    | Keyword::NotInheritable,
                ) => {}
                TokenKind::Identifier(word)
                    if (word.eq_ignore_ascii_case("async")
                        || word.eq_ignore_ascii_case("iterator"))
                        && matches!(
                            self.nth_kind(1),
                            TokenKind::Keyword(Keyword::Sub | Keyword::Function)
                        ) => {}
                _ => break,
            }
            self.bump();
            count += 1;
        }
        (modifiers, count)
    }

    // ------------------------------------------------------------------
    // Declarators and types
    // ------------------------------------------------------------------

    /// `a As T = 1, b, c As New U` with VB's shared-type rule for `a, b As T`.
    fn parse_declarators(&mut self) -> PResult<Vec<VariableDeclarator>> {
        let mut declarators = Vec::new();
        loop {
            declarators.push(self.parse_declarator()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }

        let mut shared_ty: Option<TypeRef> = None;
        for declarator in declarators.iter_mut().rev() {
            match (&declarator.ty, &declarator.init) {
                (Some(ty), _) => shared_ty = Some(ty.clone()),
                (None, None) => declarator.ty = shared_ty.clone(),
                (None, Some(_)) => shared_ty = None,
            }
        }
        Ok(declarators)
    }

    fn parse_declarator(&mut self) -> PResult<VariableDeclarator> {
        let start = self.start();
        let name = self.ident()?;
        if self.at(TokenKind::LParen) {
            self.skip_balanced_parens()?;
        }
        self.eat(TokenKind::Question);

        let mut ty = None;
        let mut init = None;
        if self.eat_kw(Keyword::As) {
            if self.at_kw(Keyword::New) {
                let creation = self.parse_object_creation()?;
                if let ExprKind::New { ty: created, .. } = &creation.kind {
                    ty = Some(created.clone());
                }
                init = Some(creation);
            } else {
                ty = Some(self.parse_type()?);
            }
        }
        if self.eat(TokenKind::Equal) {
            self.skip_newlines();
            init = Some(self.parse_expression()?);
        }

        Ok(VariableDeclarator {
            name,
            ty,
            init,
            range: self.range_from(start),
        })
    }

    fn parse_type(&mut self) -> PResult<TypeRef> {
        let mut ty = self.parse_type_path()?;
        while self.at(TokenKind::LParen)
            && matches!(self.nth_kind(1), TokenKind::RParen | TokenKind::Comma)
        {
            self.skip_balanced_parens()?;
            ty.array_rank += 1;
        }
        self.eat(TokenKind::Question);
        ty.range = self.range_from(ty.range.start);
        Ok(ty)
    }

    /// Qualified name plus optional `(Of ...)`, without array suffixes.
    fn parse_type_path(&mut self) -> PResult<TypeRef> {
        let start = self.start();
        let mut path = vec![self.member_name()?];
        while self.at(TokenKind::Dot) {
            self.bump();
            path.push(self.member_name()?);
        }
        let mut type_args = Vec::new();
        if self.at(TokenKind::LParen) && self.nth_is_kw(1, Keyword::Of) {
            self.bump();
            self.bump();
            loop {
                type_args.push(self.parse_type()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "expected `)` after type arguments")?;
        }
        Ok(TypeRef {
            path,
            type_args,
            array_rank: 0,
            range: self.range_from(start),
        })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Parse statements until a block closer that `accepts` (or that closes a member).
    fn parse_block(&mut self, accepts: &dyn Fn(&Self) -> bool) -> Vec<Stmt> {
        let mut body = Vec::new();
        loop {
            self.skip_terminators();
            if self.at(TokenKind::Eof) {
                break;
            }
            if self.at_block_closer() {
                if accepts(&*self) || self.at_member_closer() {
                    break;
                }
                let err = self.error_here(format!(
                    "unexpected `{}`",
                    self.peek_text().to_ascii_lowercase()
                ));
                self.recover(err);
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(err) => self.recover(err),
            }
        }
        body
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        if self.block_nesting >= MAX_BLOCK_NESTING {
            return Err(self.error_here("statement is nested too deeply"));
        }
        self.block_nesting += 1;
        let result = self.parse_statement_kind();
        self.block_nesting -= 1;
        result
    }

    fn parse_statement_kind(&mut self) -> PResult<Stmt> {
        let start = self.start();
        let kind = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Dim | Keyword::Static | Keyword::Const) => {
                while matches!(
                    self.peek_kind(),
                    TokenKind::Keyword(Keyword::Dim | Keyword::Static | Keyword::Const)
                ) {
                    self.bump();
                }
                let declarators = self.parse_declarators()?;
                self.end_statement()?;
                StmtKind::Local(declarators)
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                let value = self.parse_optional_expression()?;
                self.end_statement()?;
                StmtKind::Return(value)
            }
            TokenKind::Keyword(Keyword::Throw) => {
                self.bump();
                let value = self.parse_optional_expression()?;
                self.end_statement()?;
                StmtKind::Throw(value)
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::Select) => self.parse_select()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while()?,
            TokenKind::Keyword(Keyword::Do) => self.parse_do()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::Keyword(Keyword::Using) => self.parse_using()?,
            TokenKind::Keyword(Keyword::Exit | Keyword::Continue | Keyword::End) => {
                self.skip_to_terminator();
                StmtKind::Jump
            }
            TokenKind::Keyword(Keyword::Call | Keyword::RaiseEvent) => {
                self.bump();
                let expr = self.parse_postfix()?;
                self.end_statement()?;
                StmtKind::Expr(expr)
            }
            TokenKind::Keyword(Keyword::With) => {
                return Err(self.error_here("`With` blocks are not supported"));
            }
            _ => self.parse_expression_statement()?,
        };
        Ok(Stmt {
            kind,
            range: self.range_from(start),
        })
    }

    fn parse_expression_statement(&mut self) -> PResult<StmtKind> {
        let target = self.parse_postfix()?;
        let op = match self.peek_kind() {
            TokenKind::Equal => Some(AssignOp::Assign),
            TokenKind::PlusEqual => Some(AssignOp::Add),
            TokenKind::MinusEqual => Some(AssignOp::Subtract),
            TokenKind::StarEqual => Some(AssignOp::Multiply),
            TokenKind::SlashEqual => Some(AssignOp::Divide),
            TokenKind::BackslashEqual => Some(AssignOp::IntDivide),
            TokenKind::CaretEqual => Some(AssignOp::Power),
            TokenKind::AmpersandEqual => Some(AssignOp::Concat),
            _ => None,
        };
        let Some(op) = op else {
            self.end_statement()?;
            return Ok(StmtKind::Expr(target));
        };
        self.bump();
        self.skip_newlines();
        let value = self.parse_expression()?;
        self.end_statement()?;
        Ok(StmtKind::Assign { target, op, value })
    }

    fn parse_if(&mut self) -> PResult<StmtKind> {
        self.bump();
        let condition = self.parse_expression()?;
        self.eat_kw(Keyword::Then);

        if !self.at(TokenKind::Newline) && !self.at(TokenKind::Eof) {
            let body = self.parse_inline_statements()?;
            let else_body = if self.eat_kw(Keyword::Else) {
                Some(self.parse_inline_statements()?)
            } else {
                None
            };
            self.end_statement()?;
            return Ok(StmtKind::If {
                branches: vec![IfBranch { condition, body }],
                else_body,
            });
        }

        let accepts = |p: &Self| {
            p.at_kw(Keyword::Else) || p.at_kw(Keyword::ElseIf) || p.at_end_of(Keyword::If)
        };
        let body = self.parse_block(&accepts);
        let mut branches = vec![IfBranch { condition, body }];
        let mut else_body = None;
        loop {
            let else_if = self.at_kw(Keyword::ElseIf)
                || (self.at_kw(Keyword::Else) && self.nth_is_kw(1, Keyword::If));
            if else_if {
                if self.at_kw(Keyword::Else) {
                    self.bump();
                }
                self.bump();
                let condition = self.parse_expression()?;
                self.eat_kw(Keyword::Then);
                self.end_statement()?;
                let body = self.parse_block(&accepts);
                branches.push(IfBranch { condition, body });
            } else if self.eat_kw(Keyword::Else) {
                self.end_statement()?;
                else_body = Some(self.parse_block(&|p| p.at_end_of(Keyword::If)));
            } else {
                break;
            }
        }
        self.close_block(Keyword::If);
        Ok(StmtKind::If {
            branches,
            else_body,
        })
    }

    /// Statements of a single-line `If`, up to `Else` or the end of the line.
    fn parse_inline_statements(&mut self) -> PResult<Vec<Stmt>> {
        let mut body = Vec::new();
        loop {
            while self.eat(TokenKind::Colon) {}
            if self.at(TokenKind::Newline) || self.at(TokenKind::Eof) || self.at_kw(Keyword::Else)
            {
                break;
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_select(&mut self) -> PResult<StmtKind> {
        self.bump();
        self.eat_kw(Keyword::Case);
        let subject = self.parse_expression()?;
        self.end_statement()?;

        let accepts = |p: &Self| p.at_kw(Keyword::Case) || p.at_end_of(Keyword::Select);
        let mut cases = Vec::new();
        loop {
            self.skip_terminators();
            if !self.eat_kw(Keyword::Case) {
                break;
            }
            let clauses = self.parse_case_clauses()?;
            self.end_statement()?;
            let body = self.parse_block(&accepts);
            cases.push(CaseBlock { clauses, body });
        }
        self.close_block(Keyword::Select);
        Ok(StmtKind::Select { subject, cases })
    }

    fn parse_case_clauses(&mut self) -> PResult<Vec<CaseClause>> {
        if self.eat_kw(Keyword::Else) {
            return Ok(vec![CaseClause::Else]);
        }
        let mut clauses = Vec::new();
        loop {
            if self.eat_kw(Keyword::Is) {
                let Some((op, _)) = self.binary_op() else {
                    return Err(self.error_here("expected a comparison operator after `Is`"));
                };
                self.bump();
                clauses.push(CaseClause::Is(op, self.parse_expression()?));
            } else {
                let low = self.parse_expression()?;
                if self.eat_kw(Keyword::To) {
                    clauses.push(CaseClause::Range(low, self.parse_expression()?));
                } else {
                    clauses.push(CaseClause::Value(low));
                }
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(clauses)
    }

    fn parse_while(&mut self) -> PResult<StmtKind> {
        self.bump();
        let condition = self.parse_expression()?;
        self.end_statement()?;
        let body =
            self.parse_block(&|p| p.at_end_of(Keyword::While) || p.at_kw(Keyword::Wend));
        if !self.eat_kw(Keyword::Wend) {
            self.close_block(Keyword::While);
        }
        Ok(StmtKind::While { condition, body })
    }

    fn parse_do(&mut self) -> PResult<StmtKind> {
        self.bump();
        let mut condition = if self.eat_kw(Keyword::While) || self.eat_kw(Keyword::Until) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.end_statement()?;
        let body = self.parse_block(&|p| p.at_kw(Keyword::Loop));
        if self.eat_kw(Keyword::Loop) {
            if self.eat_kw(Keyword::While) || self.eat_kw(Keyword::Until) {
                let trailing = self.parse_expression()?;
                condition.get_or_insert(trailing);
            }
        } else {
            self.errors.push(self.error_here("expected `Loop`"));
        }
        Ok(StmtKind::DoLoop { condition, body })
    }

    fn parse_for(&mut self) -> PResult<StmtKind> {
        self.bump();
        if self.eat_kw(Keyword::Each) {
            let variable = self.ident()?;
            let ty = if self.eat_kw(Keyword::As) {
                Some(self.parse_type()?)
            } else {
                None
            };
            if !self.eat_kw(Keyword::In) {
                return Err(self.error_here("expected `In` in `For Each`"));
            }
            let collection = self.parse_expression()?;
            self.end_statement()?;
            let body = self.parse_block(&|p| p.at_kw(Keyword::Next));
            self.close_next();
            return Ok(StmtKind::ForEach {
                variable,
                ty,
                collection,
                body,
            });
        }

        let variable = self.ident()?;
        let ty = if self.eat_kw(Keyword::As) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Equal, "expected `=` in `For`")?;
        let from = self.parse_expression()?;
        if !self.eat_kw(Keyword::To) {
            return Err(self.error_here("expected `To` in `For`"));
        }
        let to = self.parse_expression()?;
        let step = if self.eat_kw(Keyword::Step) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.end_statement()?;
        let body = self.parse_block(&|p| p.at_kw(Keyword::Next));
        self.close_next();
        Ok(StmtKind::For {
            variable,
            ty,
            from,
            to,
            step,
            body,
        })
    }

    fn close_next(&mut self) {
        if self.eat_kw(Keyword::Next) {
            self.skip_to_terminator();
        } else {
            self.errors.push(self.error_here("expected `Next`"));
        }
    }

    fn parse_try(&mut self) -> PResult<StmtKind> {
        self.bump();
        self.end_statement()?;
        let accepts = |p: &Self| {
            p.at_kw(Keyword::Catch) || p.at_kw(Keyword::Finally) || p.at_end_of(Keyword::Try)
        };
        let body = self.parse_block(&accepts);

        let mut catches = Vec::new();
        while self.eat_kw(Keyword::Catch) {
            let variable = match self.peek_kind() {
                TokenKind::Identifier(_) => Some(self.ident()?),
                _ => None,
            };
            let ty = if self.eat_kw(Keyword::As) {
                Some(self.parse_type()?)
            } else {
                None
            };
            let filter = if self.eat_kw(Keyword::When) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.end_statement()?;
            let body = self.parse_block(&accepts);
            catches.push(CatchBlock {
                variable,
                ty,
                filter,
                body,
            });
        }

        let finally = if self.eat_kw(Keyword::Finally) {
            self.end_statement()?;
            Some(self.parse_block(&|p| p.at_end_of(Keyword::Try)))
        } else {
            None
        };
        self.close_block(Keyword::Try);
        Ok(StmtKind::Try {
            body,
            catches,
            finally,
        })
    }

    fn parse_using(&mut self) -> PResult<StmtKind> {
        self.bump();
        let declares = matches!(self.peek_kind(), TokenKind::Identifier(_))
            && matches!(
                self.nth_kind(1),
                TokenKind::Keyword(Keyword::As) | TokenKind::Equal | TokenKind::Comma
            );
        let (resources, resource) = if declares {
            (self.parse_declarators()?, None)
        } else {
            (Vec::new(), Some(self.parse_expression()?))
        };
        self.end_statement()?;
        let body = self.parse_block(&|p| p.at_end_of(Keyword::Using));
        self.close_block(Keyword::Using);
        Ok(StmtKind::Using {
            resources,
            resource,
            body,
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_binary(0)
    }

    fn parse_optional_expression(&mut self) -> PResult<Option<Expr>> {
        if self.at_statement_end() {
            Ok(None)
        } else {
            self.parse_expression().map(Some)
        }
    }

    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        let op = match self.peek_kind() {
            TokenKind::Keyword(Keyword::OrElse) => (BinaryOp::OrElse, 1),
            TokenKind::Keyword(Keyword::Or) => (BinaryOp::Or, 1),
            TokenKind::Keyword(Keyword::Xor) => (BinaryOp::Xor, 1),
            TokenKind::Keyword(Keyword::AndAlso) => (BinaryOp::AndAlso, 2),
            TokenKind::Keyword(Keyword::And) => (BinaryOp::And, 2),
            TokenKind::Equal => (BinaryOp::Equal, 4),
            TokenKind::NotEqual => (BinaryOp::NotEqual, 4),
            TokenKind::Less => (BinaryOp::Less, 4),
            TokenKind::LessEqual => (BinaryOp::LessEqual, 4),
            TokenKind::Greater => (BinaryOp::Greater, 4),
            TokenKind::GreaterEqual => (BinaryOp::GreaterEqual, 4),
            TokenKind::Keyword(Keyword::Is) => (BinaryOp::Is, 4),
            TokenKind::Keyword(Keyword::IsNot) => (BinaryOp::IsNot, 4),
            TokenKind::Keyword(Keyword::Like) => (BinaryOp::Like, 4),
            TokenKind::Ampersand => (BinaryOp::Concat, 5),
            TokenKind::Plus => (BinaryOp::Add, 6),
            TokenKind::Minus => (BinaryOp::Subtract, 6),
            TokenKind::Keyword(Keyword::Mod) => (BinaryOp::Modulo, 7),
            TokenKind::Backslash => (BinaryOp::IntDivide, 8),
            TokenKind::Star => (BinaryOp::Multiply, 9),
            TokenKind::Slash => (BinaryOp::Divide, 9),
            TokenKind::Caret => (BinaryOp::Power, 11),
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        if self.expr_nesting >= MAX_EXPRESSION_NESTING {
            return Err(self.error_here("expression is nested too deeply"));
        }
        self.expr_nesting += 1;
        let result = self.parse_binary_operands(min_prec);
        self.expr_nesting -= 1;
        result
    }

    fn parse_binary_operands(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut lhs = self.parse_prefix()?;
        while let Some((op, prec)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            self.bump();
            self.skip_newlines();
            let rhs = self.parse_binary(prec + 1)?;
            let range = lhs.range.cover(rhs.range);
            lhs = self.node(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                range,
            );
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        let start = self.start();
        let (op, operand_prec) = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Not) => (UnaryOp::Not, 4),
            TokenKind::Minus => (UnaryOp::Negate, 11),
            TokenKind::Plus => (UnaryOp::Plus, 11),
            TokenKind::Keyword(Keyword::AddressOf) => (UnaryOp::AddressOf, 12),
            _ => return self.parse_postfix(),
        };
        self.bump();
        let operand = if operand_prec > 11 {
            self.parse_postfix()?
        } else {
            self.parse_binary(operand_prec)?
        };
        let range = self.range_from(start);
        Ok(self.node(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            range,
        ))
    }

    /// Primary expression followed by any number of `.Name` and `(args)` suffixes.
    ///
    /// Member-access chains are folded in a loop, so chain length does not
    /// grow the parser's stack.
    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at(TokenKind::Dot)
                || (self.at(TokenKind::Question) && self.nth_kind(1) == &TokenKind::Dot)
            {
                if self.at(TokenKind::Question) {
                    self.bump();
                }
                self.bump();
                self.skip_newlines();
                let name = self.member_name()?;
                let range = expr.range.cover(name.range);
                expr = self.node(
                    ExprKind::MemberAccess {
                        receiver: Box::new(expr),
                        name,
                    },
                    range,
                );
            } else if self.at(TokenKind::LParen) {
                if self.nth_is_kw(1, Keyword::Of) {
                    self.skip_balanced_parens()?;
                    continue;
                }
                let args = self.parse_argument_list()?;
                let range = expr.range.cover(args.range);
                expr = self.node(
                    ExprKind::Invocation {
                        callee: Box::new(expr),
                        args,
                    },
                    range,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.start();
        let literal = match self.peek_kind() {
            TokenKind::IntLiteral => Some(LiteralKind::Integer),
            TokenKind::FloatLiteral => Some(LiteralKind::Float),
            TokenKind::StringLiteral => Some(LiteralKind::String),
            TokenKind::CharLiteral => Some(LiteralKind::Char),
            TokenKind::DateLiteral => Some(LiteralKind::Date),
            TokenKind::Keyword(Keyword::True | Keyword::False) => Some(LiteralKind::Boolean),
            TokenKind::Keyword(Keyword::Nothing) => Some(LiteralKind::Nothing),
            _ => None,
        };
        if let Some(literal) = literal {
            let token = self.bump();
            return Ok(self.node(ExprKind::Literal(literal), token.range));
        }

        match self.peek_kind().clone() {
            TokenKind::Identifier(text) => {
                let token = self.bump();
                Ok(self.node(ExprKind::Name(Ident::new(text, token.range)), token.range))
            }
            TokenKind::Keyword(Keyword::Me) => self.self_ref(SelfKind::Me),
            TokenKind::Keyword(Keyword::MyBase) => self.self_ref(SelfKind::MyBase),
            TokenKind::Keyword(Keyword::MyClass) => self.self_ref(SelfKind::MyClass),
            TokenKind::Keyword(Keyword::New) => self.parse_object_creation(),
            TokenKind::LParen => {
                self.bump();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(TokenKind::RParen, "expected `)`")?;
                let range = self.range_from(start);
                Ok(self.node(ExprKind::Paren(Box::new(inner)), range))
            }
            TokenKind::LBrace => {
                self.bump();
                self.skip_newlines();
                let mut elements = Vec::new();
                if !self.at(TokenKind::RBrace) {
                    loop {
                        elements.push(self.parse_expression()?);
                        self.skip_newlines();
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                        self.skip_newlines();
                    }
                }
                self.expect(TokenKind::RBrace, "expected `}`")?;
                let range = self.range_from(start);
                Ok(self.node(ExprKind::Collection(elements), range))
            }
            TokenKind::Keyword(Keyword::CType | Keyword::DirectCast | Keyword::TryCast) => {
                let kind = match self.bump().kind {
                    TokenKind::Keyword(Keyword::DirectCast) => CastKind::DirectCast,
                    TokenKind::Keyword(Keyword::TryCast) => CastKind::TryCast,
                    _ => CastKind::CType,
                };
                self.expect(TokenKind::LParen, "expected `(` after cast operator")?;
                let operand = self.parse_expression()?;
                self.expect(TokenKind::Comma, "expected `,` in cast")?;
                let ty = self.parse_type()?;
                self.expect(TokenKind::RParen, "expected `)` after cast")?;
                let range = self.range_from(start);
                Ok(self.node(
                    ExprKind::Cast {
                        kind,
                        operand: Box::new(operand),
                        ty,
                    },
                    range,
                ))
            }
            // `If(cond, a, b)` is modelled as a call to a function nobody can declare.
            TokenKind::Keyword(Keyword::If) if self.nth_kind(1) == &TokenKind::LParen => {
                let token = self.bump();
                Ok(self.node(ExprKind::Name(Ident::new("If", token.range)), token.range))
            }
            TokenKind::Keyword(Keyword::Sub | Keyword::Function) => {
                Err(self.error_here("lambda expressions are not supported"))
            }
            _ => Err(self.error_here("expected an expression")),
        }
    }

    fn self_ref(&mut self, kind: SelfKind) -> PResult<Expr> {
        let token = self.bump();
        Ok(self.node(ExprKind::SelfRef(kind), token.range))
    }

    /// `New T[(args)] [With {...} | From {...} | {...}]`
    fn parse_object_creation(&mut self) -> PResult<Expr> {
        let start = self.start();
        self.bump();
        let ty = self.parse_type_path()?;
        let args = if self.at(TokenKind::LParen) {
            Some(self.parse_argument_list()?)
        } else {
            None
        };
        if self.at_kw(Keyword::With)
            || matches!(self.peek_kind(), TokenKind::Identifier(w) if w.eq_ignore_ascii_case("from"))
        {
            self.bump();
        }
        if self.at(TokenKind::LBrace) {
            self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
        }
        let range = self.range_from(start);
        Ok(self.node(ExprKind::New { ty, args }, range))
    }

    fn parse_argument_list(&mut self) -> PResult<ArgumentList> {
        let start = self.start();
        let id = self.fresh_id();
        self.expect(TokenKind::LParen, "expected `(`")?;
        self.skip_newlines();
        let mut arguments = Vec::new();
        if self.eat(TokenKind::RParen) {
            return Ok(ArgumentList {
                id,
                arguments,
                range: self.range_from(start),
            });
        }
        loop {
            self.skip_newlines();
            let arg_start = self.start();
            if self.at(TokenKind::Comma) || self.at(TokenKind::RParen) {
                arguments.push(Argument {
                    name: None,
                    value: None,
                    range: TextRange::new(arg_start, arg_start),
                });
            } else {
                let name = if self.nth_kind(1) == &TokenKind::ColonEquals {
                    let name = self.member_name()?;
                    self.bump();
                    self.skip_newlines();
                    Some(name)
                } else {
                    None
                };
                let value = self.parse_expression()?;
                arguments.push(Argument {
                    name,
                    value: Some(value),
                    range: self.range_from(arg_start),
                });
            }
            self.skip_newlines();
            if self.eat(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "expected `,` or `)` in argument list")?;
            break;
        }
        Ok(ArgumentList {
            id,
            arguments,
            range: self.range_from(start),
        })
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn node(&mut self, kind: ExprKind, range: TextRange) -> Expr {
        Expr {
            id: self.fresh_id(),
            kind,
            range,
        }
    }

    fn peek(&self) -> &Token {
        self.token_at(self.pos)
    }

    fn token_at(&self, index: usize) -> &Token {
        // The token stream always ends with `Eof`.
        let last = self.tokens.len() - 1;
        &self.tokens[index.min(last)]
    }

    fn kind_at(&self, index: usize) -> &TokenKind {
        &self.token_at(index).kind
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn nth_kind(&self, n: usize) -> &TokenKind {
        self.kind_at(self.pos + n)
    }

    fn peek_text(&self) -> &'a str {
        self.peek().range.slice(self.source)
    }

    fn at(&self, kind: TokenKind) -> bool {
        *self.peek_kind() == kind
    }

    fn at_kw(&self, keyword: Keyword) -> bool {
        *self.peek_kind() == TokenKind::Keyword(keyword)
    }

    fn nth_is_kw(&self, n: usize, keyword: Keyword) -> bool {
        *self.nth_kind(n) == TokenKind::Keyword(keyword)
    }

    fn nth_is_type_keyword(&self, n: usize) -> bool {
        matches!(
            self.nth_kind(n),
            TokenKind::Keyword(
                Keyword::Class
                    | Keyword::Structure
                    | Keyword::Module
                    | Keyword::Interface
                    | Keyword::Namespace
            )
        )
    }

    fn at_end_of(&self, keyword: Keyword) -> bool {
        self.at_kw(Keyword::End) && self.nth_is_kw(1, keyword)
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Colon | TokenKind::Eof | TokenKind::Keyword(Keyword::Else)
        )
    }

    /// Tokens that end a statement block. A bare `End` is a statement, not a closer.
    fn at_block_closer(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::End) => !matches!(
                self.nth_kind(1),
                TokenKind::Newline | TokenKind::Colon | TokenKind::Eof
            ),
            TokenKind::Keyword(
                Keyword::Else
                | Keyword::ElseIf
                | Keyword::Next
                | Keyword::Loop
                | Keyword::Case
                | Keyword::Catch
                | Keyword::Finally
                | Keyword::Wend,
            ) => true,
            _ => false,
        }
    }

    fn at_member_closer(&self) -> bool {
        self.at_kw(Keyword::End)
            && (self.nth_is_type_keyword(1)
                || matches!(
                    self.nth_kind(1),
                    TokenKind::Keyword(
                        Keyword::Sub
                            | Keyword::Function
                            | Keyword::Property
                            | Keyword::Get
                            | Keyword::Set
                    )
                ))
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, keyword: Keyword) -> bool {
        self.eat(TokenKind::Keyword(keyword))
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error_here(message))
        }
    }

    fn ident(&mut self) -> PResult<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(text) => {
                let token = self.bump();
                Ok(Ident::new(text, token.range))
            }
            _ => Err(self.error_here("expected an identifier")),
        }
    }

    /// Identifier in a position where keywords are also valid names (after `.`).
    fn member_name(&mut self) -> PResult<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(text) => {
                let token = self.bump();
                Ok(Ident::new(text, token.range))
            }
            TokenKind::Keyword(_) => {
                let token = self.bump();
                Ok(Ident::new(token.range.slice(self.source), token.range))
            }
            _ => Err(self.error_here("expected a name")),
        }
    }

    fn end_statement(&mut self) -> PResult<()> {
        if self.at_statement_end() {
            Ok(())
        } else {
            Err(self.error_here(format!(
                "expected end of statement, found `{}`",
                self.peek_text()
            )))
        }
    }

    /// Consume `End <keyword>`, or record an error without consuming anything.
    fn close_block(&mut self, keyword: Keyword) {
        if self.at_end_of(keyword) {
            self.bump();
            self.bump();
        } else {
            let mut name = keyword.as_str().to_string();
            if let Some(first) = name.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            self.errors
                .push(self.error_here(format!("expected `End {name}`")));
        }
    }

    fn skip_terminators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Colon) {
            self.bump();
        }
    }

    fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.bump();
        }
    }

    fn skip_to_terminator(&mut self) {
        while !matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Colon | TokenKind::Eof
        ) {
            self.bump();
        }
    }

    fn skip_line(&mut self) {
        while !matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof) {
            self.bump();
        }
    }

    fn skip_balanced_parens(&mut self) -> PResult<()> {
        self.skip_balanced(TokenKind::LParen, TokenKind::RParen)
    }

    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> PResult<()> {
        self.expect(open.clone(), "expected an opening bracket")?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.at(TokenKind::Eof) {
                return Err(self.error_here("unbalanced brackets"));
            }
            let token = self.bump();
            if token.kind == open {
                depth += 1;
            } else if token.kind == close {
                depth -= 1;
            }
        }
        Ok(())
    }

    fn recover(&mut self, err: SyntaxError) {
        self.errors.push(err);
        self.skip_line();
    }

    fn start(&self) -> usize {
        self.peek().range.start
    }

    fn range_from(&self, start: usize) -> TextRange {
        let end = if self.pos == 0 {
            start
        } else {
            self.token_at(self.pos - 1).range.end.max(start)
        };
        TextRange::new(start, end)
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.peek().range)
    }
}

//! Line-oriented tokenizer for Visual Basic source.

use crate::ast::{SyntaxError, TextRange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    CharLiteral,
    DateLiteral,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Dot,
    ColonEquals,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Backslash,
    Caret,
    Ampersand,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    BackslashEqual,
    CaretEqual,
    AmpersandEqual,
    Question,
    Bang,
    /// End of a logical line.
    Newline,
    /// `:` between statements on one line.
    Colon,
    Eof,
}

macro_rules! keywords {
    ($($variant:ident => $text:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            /// Case-insensitive keyword lookup.
            pub fn from_ident(text: &str) -> Option<Self> {
                let lower = text.to_ascii_lowercase();
                match lower.as_str() {
                    $($text => Some(Keyword::$variant),)*
                    _ => None,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text,)*
                }
            }
        }
    };
}

keywords! {
    AddressOf => "addressof",
    And => "and",
    AndAlso => "andalso",
    As => "as",
    ByRef => "byref",
    ByVal => "byval",
    Call => "call",
    Case => "case",
    Catch => "catch",
    Class => "class",
    Const => "const",
    Continue => "continue",
    CType => "ctype",
    Default => "default",
    Dim => "dim",
    DirectCast => "directcast",
    Do => "do",
    Each => "each",
    Else => "else",
    ElseIf => "elseif",
    End => "end",
    Enum => "enum",
    Event => "event",
    Exit => "exit",
    False => "false",
    Finally => "finally",
    For => "for",
    Friend => "friend",
    Function => "function",
    Get => "get",
    Handles => "handles",
    If => "if",
    Implements => "implements",
    Imports => "imports",
    In => "in",
    Inherits => "inherits",
    Interface => "interface",
    Is => "is",
    IsNot => "isnot",
    Like => "like",
    Loop => "loop",
    Me => "me",
    Mod => "mod",
    Module => "module",
    MustInherit => "mustinherit",
    MustOverride => "mustoverride",
    MyBase => "mybase",
    MyClass => "myclass",
    Namespace => "namespace",
    New => "new",
    Next => "next",
    Not => "not",
    NotInheritable => "notinheritable",
    NotOverridable => "notoverridable",
    Nothing => "nothing",
    Of => "of",
    Option => "option",
    Optional => "optional",
    Or => "or",
    OrElse => "orelse",
    Overloads => "overloads",
    Overridable => "overridable",
    Overrides => "overrides",
    ParamArray => "paramarray",
    Partial => "partial",
    Private => "private",
    Property => "property",
    Protected => "protected",
    Public => "public",
    RaiseEvent => "raiseevent",
    ReadOnly => "readonly",
    Return => "return",
    Select => "select",
    Set => "set",
    Shadows => "shadows",
    Shared => "shared",
    Static => "static",
    Step => "step",
    Structure => "structure",
    Sub => "sub",
    Then => "then",
    Throw => "throw",
    To => "to",
    True => "true",
    Try => "try",
    TryCast => "trycast",
    Until => "until",
    Using => "using",
    Wend => "wend",
    When => "when",
    While => "while",
    With => "with",
    WithEvents => "withevents",
    WriteOnly => "writeonly",
    Xor => "xor",
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<SyntaxError>> {
    let (tokens, errors) = lex_lossy(source);
    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// Tokenize without giving up on errors; offending characters are dropped.
pub fn lex_lossy(source: &str) -> (Vec<Token>, Vec<SyntaxError>) {
    let mut lexer = Lexer::new(source);
    lexer.lex_all();
    (lexer.tokens, lexer.errors)
}

struct Lexer<'a> {
    source: &'a str,
    cursor: usize,
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn lex_all(&mut self) {
        loop {
            if self.at_line_start() && self.skip_directive_line() {
                continue;
            }
            self.skip_blanks();
            let Some(current) = self.peek_char() else {
                break;
            };
            let start = self.cursor;
            match current {
                '\r' | '\n' => {
                    self.advance();
                    if current == '\r' && self.peek_char() == Some('\n') {
                        self.advance();
                    }
                    self.push_newline(start);
                }
                '\'' | '‘' | '’' => self.skip_comment(),
                '_' if self.is_line_continuation() => self.skip_line_continuation(),
                '"' => self.lex_string(start),
                '[' => self.lex_escaped_identifier(start),
                '#' => self.lex_date(start),
                '&' if self.peek_nth(1).is_some_and(|c| matches!(c, 'h' | 'H' | 'o' | 'O' | 'b' | 'B'))
                    && self.peek_nth(2).is_some_and(|c| c.is_ascii_alphanumeric()) =>
                {
                    self.lex_prefixed_integer(start)
                }
                c if c.is_ascii_digit() => self.lex_number(start),
                '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.lex_number(start)
                }
                c if c.is_alphabetic() || c == '_' => self.lex_word(start),
                _ => self.lex_punctuation(start, current),
            }
        }

        self.push_newline(self.cursor);
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            range: TextRange::new(self.cursor, self.cursor),
        });
    }

    fn lex_punctuation(&mut self, start: usize, current: char) {
        self.advance();
        let next = self.peek_char();
        let (kind, extra) = match (current, next) {
            ('(', _) => (TokenKind::LParen, false),
            (')', _) => (TokenKind::RParen, false),
            ('{', _) => (TokenKind::LBrace, false),
            ('}', _) => (TokenKind::RBrace, false),
            (',', _) => (TokenKind::Comma, false),
            ('.', _) => (TokenKind::Dot, false),
            ('?', _) => (TokenKind::Question, false),
            ('!', _) => (TokenKind::Bang, false),
            (':', Some('=')) => (TokenKind::ColonEquals, true),
            (':', _) => (TokenKind::Colon, false),
            ('=', _) => (TokenKind::Equal, false),
            ('<', Some('>')) => (TokenKind::NotEqual, true),
            ('<', Some('=')) => (TokenKind::LessEqual, true),
            ('<', _) => (TokenKind::Less, false),
            ('>', Some('=')) => (TokenKind::GreaterEqual, true),
            ('>', _) => (TokenKind::Greater, false),
            ('+', Some('=')) => (TokenKind::PlusEqual, true),
            ('+', _) => (TokenKind::Plus, false),
            ('-', Some('=')) => (TokenKind::MinusEqual, true),
            ('-', _) => (TokenKind::Minus, false),
            ('*', Some('=')) => (TokenKind::StarEqual, true),
            ('*', _) => (TokenKind::Star, false),
            ('/', Some('=')) => (TokenKind::SlashEqual, true),
            ('/', _) => (TokenKind::Slash, false),
            ('\\', Some('=')) => (TokenKind::BackslashEqual, true),
            ('\\', _) => (TokenKind::Backslash, false),
            ('^', Some('=')) => (TokenKind::CaretEqual, true),
            ('^', _) => (TokenKind::Caret, false),
            ('&', Some('=')) => (TokenKind::AmpersandEqual, true),
            ('&', _) => (TokenKind::Ampersand, false),
            _ => {
                self.errors.push(SyntaxError::new(
                    format!("unexpected character '{current}'"),
                    TextRange::new(start, self.cursor),
                ));
                return;
            }
        };
        if extra {
            self.advance();
        }
        self.push(kind, start);
    }

    fn lex_word(&mut self, start: usize) {
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        // Type characters such as `name$` or `count%`.
        if let Some(c) = self.peek_char()
            && matches!(c, '$' | '%' | '&' | '@')
            && !self.peek_nth(1).is_some_and(|n| n == '=' || n.is_alphanumeric())
        {
            self.advance();
        }

        let text = &self.source[start..self.cursor];
        let word = text.trim_end_matches(['$', '%', '&', '@']);
        if word.eq_ignore_ascii_case("rem") {
            self.skip_comment();
            return;
        }
        let kind = match Keyword::from_ident(word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(word.to_string()),
        };
        self.push(kind, start);
    }

    fn lex_escaped_identifier(&mut self, start: usize) {
        self.advance();
        let name_start = self.cursor;
        while let Some(c) = self.peek_char() {
            if c == ']' || c == '\n' || c == '\r' {
                break;
            }
            self.advance();
        }
        if self.peek_char() != Some(']') {
            self.errors.push(SyntaxError::new(
                "unterminated escaped identifier",
                TextRange::new(start, self.cursor),
            ));
            return;
        }
        let name = self.source[name_start..self.cursor].to_string();
        self.advance();
        self.push(TokenKind::Identifier(name), start);
    }

    fn lex_string(&mut self, start: usize) {
        self.advance();
        loop {
            match self.peek_char() {
                Some('"') => {
                    self.advance();
                    if self.peek_char() == Some('"') {
                        self.advance();
                        continue;
                    }
                    break;
                }
                Some('\n') | Some('\r') | None => {
                    self.errors.push(SyntaxError::new(
                        "unterminated string literal",
                        TextRange::new(start, self.cursor),
                    ));
                    return;
                }
                Some(_) => self.advance(),
            }
        }
        if self.peek_char().is_some_and(|c| c == 'c' || c == 'C')
            && !self.peek_nth(1).is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
            self.push(TokenKind::CharLiteral, start);
        } else {
            self.push(TokenKind::StringLiteral, start);
        }
    }

    fn lex_date(&mut self, start: usize) {
        self.advance();
        while let Some(c) = self.peek_char() {
            if c == '#' || c == '\n' || c == '\r' {
                break;
            }
            self.advance();
        }
        if self.peek_char() != Some('#') {
            self.errors.push(SyntaxError::new(
                "unterminated date literal",
                TextRange::new(start, self.cursor),
            ));
            return;
        }
        self.advance();
        self.push(TokenKind::DateLiteral, start);
    }

    fn lex_prefixed_integer(&mut self, start: usize) {
        self.advance();
        self.advance();
        while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.advance();
        }
        self.skip_numeric_suffix();
        self.push(TokenKind::IntLiteral, start);
    }

    fn lex_number(&mut self, start: usize) {
        let mut is_float = false;
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek_char() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.peek_char().is_some_and(|c| c == 'e' || c == 'E')
            && self
                .peek_nth(1)
                .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-')
        {
            is_float = true;
            self.advance();
            self.advance();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.skip_numeric_suffix() {
            let suffix = &self.source[start..self.cursor];
            if suffix.ends_with(['f', 'F', 'r', 'R', 'd', 'D', '!', '#', '@']) {
                is_float = true;
            }
        }
        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        self.push(kind, start);
    }

    /// Consume a literal type suffix (`L`, `UI`, `D`, `!`, ...). Returns whether one was found.
    fn skip_numeric_suffix(&mut self) -> bool {
        let before = self.cursor;
        match self.peek_char() {
            Some('!' | '#' | '@' | '%') => self.advance(),
            Some(c) if c.is_ascii_alphabetic() => {
                while self.peek_char().is_some_and(|c| c.is_ascii_alphabetic()) {
                    self.advance();
                }
            }
            _ => {}
        }
        self.cursor != before
    }

    fn is_line_continuation(&self) -> bool {
        let preceded_by_blank = self.cursor == 0
            || self.source[..self.cursor]
                .chars()
                .next_back()
                .is_some_and(|c| c == ' ' || c == '\t');
        let rest = &self.source[self.cursor + 1..];
        let line_rest = rest.split(['\n', '\r']).next().unwrap_or("");
        let line_rest = line_rest.trim_start();
        preceded_by_blank && (line_rest.is_empty() || line_rest.starts_with('\''))
    }

    fn skip_line_continuation(&mut self) {
        self.advance();
        self.skip_comment_body();
        if self.peek_char() == Some('\r') {
            self.advance();
        }
        if self.peek_char() == Some('\n') {
            self.advance();
        }
    }

    fn skip_comment(&mut self) {
        self.skip_comment_body();
    }

    fn skip_comment_body(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '\n' || c == '\r' {
                break;
            }
            self.advance();
        }
    }

    fn at_line_start(&self) -> bool {
        self.source[..self.cursor]
            .chars()
            .rev()
            .take_while(|c| *c != '\n' && *c != '\r')
            .all(|c| c == ' ' || c == '\t')
    }

    /// Skips a `#...` preprocessor line. Suppression pragmas are read from the raw source.
    fn skip_directive_line(&mut self) -> bool {
        let rest = &self.source[self.cursor..];
        let trimmed = rest.trim_start_matches([' ', '\t']);
        let Some(body) = trimmed.strip_prefix('#') else {
            return false;
        };
        // `#1/1/2000#` at the start of a line is a date literal, not a directive.
        if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return false;
        }
        self.cursor += rest.len() - trimmed.len();
        self.skip_comment_body();
        true
    }

    fn skip_blanks(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == ' ' || c == '\t' || c == '\u{feff}' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            range: TextRange::new(start, self.cursor),
        });
    }

    /// Newlines collapse: a run of blank lines yields a single token.
    fn push_newline(&mut self, start: usize) {
        if matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline)
        ) {
            return;
        }
        self.tokens.push(Token {
            kind: TokenKind::Newline,
            range: TextRange::new(start, self.cursor),
        });
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.cursor..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.cursor..].chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.cursor += c.len_utf8();
        }
    }
}

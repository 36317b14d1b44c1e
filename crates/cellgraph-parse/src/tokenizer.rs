use std::error::Error;
use std::fmt::{self, Display};

const OPERATOR_CHARS: &str = "+-*/&=<>!";

const fn build_operator_table() -> [bool; 256] {
    let mut tbl = [false; 256];
    let bytes = OPERATOR_CHARS.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        tbl[bytes[i] as usize] = true;
        i += 1;
    }
    tbl
}
static OPERATOR_TABLE: [bool; 256] = build_operator_table();

#[inline(always)]
fn is_operator_byte(c: u8) -> bool {
    OPERATOR_TABLE[c as usize]
}

/// Represents operator associativity.
#[derive(Debug, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// A custom error type for the tokenizer.
#[derive(Debug)]
pub struct TokenizerError {
    pub message: String,
    pub pos: usize,
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenizerError at {}: {}", self.pos, self.message)
    }
}

impl Error for TokenizerError {}

/// The type of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Operand,
    Func,
    Paren,
    Sep,
    OpPrefix,
    OpInfix,
    Whitespace,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The subtype of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSubType {
    None,
    Text,
    Number,
    Logical,
    Field,
    Open,
    Close,
    Arg,
}

impl Display for TokenSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A token in a field formula.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct Token {
    pub value: String,
    pub token_type: TokenType,
    pub subtype: TokenSubType,
    pub start: usize,
    pub end: usize,
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} subtype: {:?} value: {}>",
            self.token_type, self.subtype, self.value
        )
    }
}

impl Token {
    pub fn new_with_span(
        value: String,
        token_type: TokenType,
        subtype: TokenSubType,
        start: usize,
        end: usize,
    ) -> Self {
        Token {
            value,
            token_type,
            subtype,
            start,
            end,
        }
    }

    fn from_slice(
        source: &str,
        token_type: TokenType,
        subtype: TokenSubType,
        start: usize,
        end: usize,
    ) -> Self {
        Token {
            value: source[start..end].to_string(),
            token_type,
            subtype,
            start,
            end,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.token_type, TokenType::OpPrefix | TokenType::OpInfix)
    }

    pub fn get_precedence(&self) -> Option<(u8, Associativity)> {
        // For a prefix operator, use the 'u' key.
        let op = if self.token_type == TokenType::OpPrefix {
            "u"
        } else {
            self.value.as_str()
        };

        match op {
            "u" => Some((7, Associativity::Right)),
            "*" | "/" => Some((4, Associativity::Left)),
            "+" | "-" => Some((3, Associativity::Left)),
            "&" => Some((2, Associativity::Left)),
            "=" | "<" | ">" | "<=" | ">=" | "<>" => Some((1, Associativity::Left)),
            _ => None,
        }
    }
}

/// A tokenizer for field formulas such as `{fldPrice} * {fldQty}` or
/// `sum({values})`.
///
/// Unlike worksheet formulas there is no leading `=`; field references are
/// brace-delimited ids.
pub struct Tokenizer {
    formula: String,
    pub items: Vec<Token>,
    /// Open parens, `true` when the paren belongs to a function call.
    paren_stack: Vec<bool>,
    offset: usize,
}

impl Tokenizer {
    /// Create a new tokenizer and immediately tokenize the formula.
    pub fn new(formula: &str) -> Result<Self, TokenizerError> {
        let mut tokenizer = Tokenizer {
            formula: formula.to_string(),
            items: Vec::with_capacity(formula.len() / 2),
            paren_stack: Vec::with_capacity(8),
            offset: 0,
        };
        tokenizer.parse()?;
        Ok(tokenizer)
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    #[inline]
    fn current_byte(&self) -> Option<u8> {
        self.formula.as_bytes().get(self.offset).copied()
    }

    #[inline]
    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.formula.as_bytes().get(pos).copied()
    }

    fn error<S: Into<String>>(&self, message: S) -> TokenizerError {
        TokenizerError {
            message: message.into(),
            pos: self.offset,
        }
    }

    /// Whether the last significant token ends an operand, which makes a
    /// following `+`/`-` infix rather than prefix.
    fn after_operand(&self) -> bool {
        self.items
            .iter()
            .rev()
            .find(|t| t.token_type != TokenType::Whitespace)
            .is_some_and(|t| {
                t.token_type == TokenType::Operand
                    || (matches!(t.token_type, TokenType::Paren | TokenType::Func)
                        && t.subtype == TokenSubType::Close)
            })
    }

    fn parse(&mut self) -> Result<(), TokenizerError> {
        while let Some(c) = self.current_byte() {
            match c {
                b' ' | b'\t' | b'\n' | b'\r' => self.parse_whitespace(),
                b'{' => self.parse_field_reference()?,
                b'"' | b'\'' => self.parse_string(c)?,
                b'0'..=b'9' | b'.' => self.parse_number()?,
                b'(' => {
                    self.push_simple(TokenType::Paren, TokenSubType::Open, 1);
                    self.paren_stack.push(false);
                }
                b')' => {
                    let is_func = self
                        .paren_stack
                        .pop()
                        .ok_or_else(|| self.error("Unmatched ')'"))?;
                    let token_type = if is_func {
                        TokenType::Func
                    } else {
                        TokenType::Paren
                    };
                    self.push_simple(token_type, TokenSubType::Close, 1);
                }
                b',' => {
                    if self.paren_stack.last() != Some(&true) {
                        return Err(self.error("Argument separator outside a function call"));
                    }
                    self.push_simple(TokenType::Sep, TokenSubType::Arg, 1);
                }
                c if is_operator_byte(c) => self.parse_operator()?,
                c if c.is_ascii_alphabetic() || c == b'_' => self.parse_identifier()?,
                _ => {
                    let ch = self.formula[self.offset..].chars().next().unwrap_or('?');
                    return Err(self.error(format!("Unexpected character '{ch}'")));
                }
            }
        }

        if !self.paren_stack.is_empty() {
            return Err(self.error("Mismatched ( and )"));
        }
        Ok(())
    }

    fn push_simple(&mut self, token_type: TokenType, subtype: TokenSubType, len: usize) {
        let start = self.offset;
        self.offset += len;
        self.items.push(Token::from_slice(
            &self.formula,
            token_type,
            subtype,
            start,
            self.offset,
        ));
    }

    fn parse_whitespace(&mut self) {
        let start = self.offset;
        while matches!(self.current_byte(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.offset += 1;
        }
        self.items.push(Token::from_slice(
            &self.formula,
            TokenType::Whitespace,
            TokenSubType::None,
            start,
            self.offset,
        ));
    }

    /// `{fieldId}`; the token value is the trimmed id without braces.
    fn parse_field_reference(&mut self) -> Result<(), TokenizerError> {
        let start = self.offset;
        let close = self.formula[start + 1..]
            .find('}')
            .map(|i| start + 1 + i)
            .ok_or_else(|| self.error("Unterminated field reference"))?;
        let id = self.formula[start + 1..close].trim();
        if id.is_empty() {
            return Err(self.error("Empty field reference"));
        }
        self.offset = close + 1;
        self.items.push(Token::new_with_span(
            id.to_string(),
            TokenType::Operand,
            TokenSubType::Field,
            start,
            self.offset,
        ));
        Ok(())
    }

    /// Quoted text. A doubled quote or a backslash escapes the delimiter.
    fn parse_string(&mut self, delim: u8) -> Result<(), TokenizerError> {
        let start = self.offset;
        let mut text = String::new();
        let mut pos = start + 1;
        loop {
            let Some(c) = self.byte_at(pos) else {
                return Err(TokenizerError {
                    message: "Reached end of formula while parsing string".to_string(),
                    pos: start,
                });
            };
            if c == b'\\' {
                if let Some(next) = self.byte_at(pos + 1) {
                    text.push(next as char);
                    pos += 2;
                    continue;
                }
            }
            if c == delim {
                if self.byte_at(pos + 1) == Some(delim) {
                    text.push(delim as char);
                    pos += 2;
                    continue;
                }
                pos += 1;
                break;
            }
            let ch = self.formula[pos..].chars().next().unwrap_or_default();
            text.push(ch);
            pos += ch.len_utf8();
        }
        self.offset = pos;
        self.items.push(Token::new_with_span(
            text,
            TokenType::Operand,
            TokenSubType::Text,
            start,
            pos,
        ));
        Ok(())
    }

    fn parse_number(&mut self) -> Result<(), TokenizerError> {
        let start = self.offset;
        while matches!(self.current_byte(), Some(b'0'..=b'9' | b'.')) {
            self.offset += 1;
        }
        // Scientific notation: 1.5E+3, 2e-4
        if matches!(self.current_byte(), Some(b'e' | b'E')) {
            let mut pos = self.offset + 1;
            if matches!(self.byte_at(pos), Some(b'+' | b'-')) {
                pos += 1;
            }
            if matches!(self.byte_at(pos), Some(b'0'..=b'9')) {
                while matches!(self.byte_at(pos), Some(b'0'..=b'9')) {
                    pos += 1;
                }
                self.offset = pos;
            }
        }
        let literal = &self.formula[start..self.offset];
        if literal.parse::<f64>().is_err() {
            return Err(TokenizerError {
                message: format!("Invalid number '{literal}'"),
                pos: start,
            });
        }
        self.items.push(Token::from_slice(
            &self.formula,
            TokenType::Operand,
            TokenSubType::Number,
            start,
            self.offset,
        ));
        Ok(())
    }

    fn parse_operator(&mut self) -> Result<(), TokenizerError> {
        let start = self.offset;
        let two = self.formula.get(start..start + 2);
        let (value, len) = match two {
            Some("<=") | Some(">=") | Some("<>") => (two.unwrap_or_default().to_string(), 2),
            Some("!=") => ("<>".to_string(), 2),
            _ => {
                let c = self.formula.as_bytes()[start];
                if c == b'!' {
                    return Err(self.error("Unexpected '!'"));
                }
                ((c as char).to_string(), 1)
            }
        };
        let token_type = if matches!(value.as_str(), "+" | "-") && !self.after_operand() {
            TokenType::OpPrefix
        } else {
            TokenType::OpInfix
        };
        self.offset += len;
        self.items.push(Token::new_with_span(
            value,
            token_type,
            TokenSubType::None,
            start,
            self.offset,
        ));
        Ok(())
    }

    /// Function names (`SUM(`) and logical constants.
    fn parse_identifier(&mut self) -> Result<(), TokenizerError> {
        let start = self.offset;
        while matches!(self.current_byte(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.offset += 1;
        }
        let ident = &self.formula[start..self.offset];

        if self.current_byte() == Some(b'(') {
            self.offset += 1;
            self.paren_stack.push(true);
            self.items.push(Token::new_with_span(
                format!("{}(", ident.to_ascii_uppercase()),
                TokenType::Func,
                TokenSubType::Open,
                start,
                self.offset,
            ));
            return Ok(());
        }

        match ident.to_ascii_uppercase().as_str() {
            upper @ ("TRUE" | "FALSE") => {
                self.items.push(Token::new_with_span(
                    upper.to_string(),
                    TokenType::Operand,
                    TokenSubType::Logical,
                    start,
                    self.offset,
                ));
                Ok(())
            }
            _ => Err(TokenizerError {
                message: format!("Unknown identifier '{ident}'"),
                pos: start,
            }),
        }
    }
}

use crate::tokenizer::{Associativity, Token, TokenSubType, TokenType, TokenizerError};
use crate::{CellValue, FieldId, Tokenizer};

use std::error::Error;
use std::fmt::{self, Display};

/// A custom error type for the parser.
#[derive(Debug)]
pub struct ParserError {
    pub message: String,
    pub position: Option<usize>,
}

impl Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = self.position {
            write!(f, "ParserError at position {}: {}", pos, self.message)
        } else {
            write!(f, "ParserError: {}", self.message)
        }
    }
}

impl Error for ParserError {}

impl From<TokenizerError> for ParserError {
    fn from(err: TokenizerError) -> Self {
        ParserError {
            message: err.message,
            position: Some(err.pos),
        }
    }
}

/// The type of an AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum ASTNodeType {
    Literal(CellValue),
    Reference {
        original: String,
        field_id: FieldId,
    },
    UnaryOp {
        op: String,
        expr: Box<ASTNode>,
    },
    BinaryOp {
        op: String,
        left: Box<ASTNode>,
        right: Box<ASTNode>,
    },
    Function {
        name: String,
        args: Vec<ASTNode>,
    },
}

impl Display for ASTNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ASTNodeType::Literal(CellValue::Text(s)) => {
                write!(f, "\"{}\"", s.replace('"', "\"\""))
            }
            ASTNodeType::Literal(CellValue::Boolean(b)) => {
                f.write_str(if *b { "TRUE" } else { "FALSE" })
            }
            ASTNodeType::Literal(value) => write!(f, "{value}"),
            ASTNodeType::Reference { field_id, .. } => write!(f, "{{{field_id}}}"),
            ASTNodeType::UnaryOp { op, expr } => write!(f, "{op}{expr}"),
            ASTNodeType::BinaryOp { op, left, right } => write!(f, "({left} {op} {right})"),
            ASTNodeType::Function { name, args } => {
                let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", name, rendered.join(", "))
            }
        }
    }
}

/// An AST node represents a parsed formula element.
#[derive(Debug, Clone, PartialEq)]
pub struct ASTNode {
    pub node_type: ASTNodeType,
    pub source_token: Option<Token>,
}

impl Display for ASTNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node_type)
    }
}

impl ASTNode {
    pub fn new(node_type: ASTNodeType, source_token: Option<Token>) -> Self {
        ASTNode {
            node_type,
            source_token,
        }
    }

    /// Field ids this expression reads, first occurrence order, no repeats.
    pub fn references(&self) -> Vec<FieldId> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<FieldId>) {
        match &self.node_type {
            ASTNodeType::Reference { field_id, .. } => {
                if !out.contains(field_id) {
                    out.push(field_id.clone());
                }
            }
            ASTNodeType::UnaryOp { expr, .. } => expr.collect_references(out),
            ASTNodeType::BinaryOp { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            ASTNodeType::Function { args, .. } => {
                for arg in args {
                    arg.collect_references(out);
                }
            }
            ASTNodeType::Literal(_) => {}
        }
    }
}

/// A parser for converting tokens into an AST.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl TryFrom<&str> for Parser {
    type Error = TokenizerError;

    fn try_from(formula: &str) -> Result<Self, Self::Error> {
        let tokenizer = Tokenizer::new(formula)?;
        Ok(Self::new(tokenizer.items))
    }
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens
                .into_iter()
                .filter(|t| t.token_type != TokenType::Whitespace)
                .collect(),
            position: 0,
        }
    }

    /// Parse the tokens into an AST.
    pub fn parse(&mut self) -> Result<ASTNode, ParserError> {
        if self.tokens.is_empty() {
            return Err(ParserError {
                message: "No tokens to parse".to_string(),
                position: None,
            });
        }

        let ast = self.parse_expression()?;
        if self.position < self.tokens.len() {
            return Err(ParserError {
                message: format!("Unexpected token {}", self.tokens[self.position]),
                position: Some(self.tokens[self.position].start),
            });
        }
        Ok(ast)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn error_here<S: Into<String>>(&self, message: S) -> ParserError {
        ParserError {
            message: message.into(),
            position: self.peek().map(|t| t.start),
        }
    }

    fn parse_expression(&mut self) -> Result<ASTNode, ParserError> {
        self.parse_binary_op(0)
    }

    fn parse_binary_op(&mut self, min_precedence: u8) -> Result<ASTNode, ParserError> {
        let mut left = self.parse_unary_op()?;

        while let Some(token) = self.peek() {
            if token.token_type != TokenType::OpInfix {
                break;
            }

            let (precedence, associativity) =
                token.get_precedence().unwrap_or((0, Associativity::Left));
            if precedence < min_precedence {
                break;
            }

            let op_token = token.clone();
            self.position += 1;

            let next_min_precedence = if associativity == Associativity::Left {
                precedence + 1
            } else {
                precedence
            };

            let right = self.parse_binary_op(next_min_precedence)?;
            left = ASTNode::new(
                ASTNodeType::BinaryOp {
                    op: op_token.value.clone(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Some(op_token),
            );
        }

        Ok(left)
    }

    fn parse_unary_op(&mut self) -> Result<ASTNode, ParserError> {
        if let Some(token) = self.peek() {
            if token.token_type == TokenType::OpPrefix {
                let op_token = token.clone();
                self.position += 1;
                let expr = self.parse_unary_op()?;
                return Ok(ASTNode::new(
                    ASTNodeType::UnaryOp {
                        op: op_token.value.clone(),
                        expr: Box::new(expr),
                    },
                    Some(op_token),
                ));
            }
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ASTNode, ParserError> {
        let Some(token) = self.peek().cloned() else {
            return Err(ParserError {
                message: "Unexpected end of formula".to_string(),
                position: None,
            });
        };

        match (token.token_type, token.subtype) {
            (TokenType::Operand, _) => {
                self.position += 1;
                self.parse_operand(token)
            }
            (TokenType::Func, TokenSubType::Open) => {
                self.position += 1;
                self.parse_function(token)
            }
            (TokenType::Paren, TokenSubType::Open) => {
                self.position += 1;
                let expr = self.parse_expression()?;
                match self.peek() {
                    Some(t) if t.token_type == TokenType::Paren && t.subtype == TokenSubType::Close => {
                        self.position += 1;
                        Ok(expr)
                    }
                    _ => Err(self.error_here("Expected closing parenthesis")),
                }
            }
            _ => Err(self.error_here(format!("Unexpected token {token}"))),
        }
    }

    fn parse_operand(&mut self, token: Token) -> Result<ASTNode, ParserError> {
        let node_type = match token.subtype {
            TokenSubType::Number => {
                let value = token.value.parse::<f64>().map_err(|_| ParserError {
                    message: format!("Invalid number: {}", token.value),
                    position: Some(token.start),
                })?;
                ASTNodeType::Literal(CellValue::Number(value))
            }
            TokenSubType::Text => ASTNodeType::Literal(CellValue::Text(token.value.clone())),
            TokenSubType::Logical => ASTNodeType::Literal(CellValue::Boolean(token.value == "TRUE")),
            TokenSubType::Field => ASTNodeType::Reference {
                original: format!("{{{}}}", token.value),
                field_id: FieldId::new(token.value.clone()),
            },
            _ => {
                return Err(ParserError {
                    message: format!("Unexpected operand subtype: {:?}", token.subtype),
                    position: Some(token.start),
                });
            }
        };
        Ok(ASTNode::new(node_type, Some(token)))
    }

    fn parse_function(&mut self, func_token: Token) -> Result<ASTNode, ParserError> {
        let name = func_token.value[..func_token.value.len() - 1].to_string();
        let args = self.parse_function_arguments()?;
        Ok(ASTNode::new(
            ASTNodeType::Function { name, args },
            Some(func_token),
        ))
    }

    fn parse_function_arguments(&mut self) -> Result<Vec<ASTNode>, ParserError> {
        let mut args = Vec::new();

        if let Some(t) = self.peek() {
            if t.token_type == TokenType::Func && t.subtype == TokenSubType::Close {
                self.position += 1;
                return Ok(args);
            }
        }

        args.push(self.parse_expression()?);
        loop {
            match self.peek() {
                Some(t) if t.token_type == TokenType::Sep => {
                    self.position += 1;
                    args.push(self.parse_expression()?);
                }
                Some(t) if t.token_type == TokenType::Func && t.subtype == TokenSubType::Close => {
                    self.position += 1;
                    return Ok(args);
                }
                Some(t) => {
                    return Err(ParserError {
                        message: format!("Expected ',' or ')' in function arguments, got {t}"),
                        position: Some(t.start),
                    });
                }
                None => return Err(self.error_here("Unterminated function call")),
            }
        }
    }
}

pub fn parse<T: AsRef<str>>(formula: T) -> Result<ASTNode, ParserError> {
    Parser::try_from(formula.as_ref())?.parse()
}

//! Recursive-descent parser over the precedence ladder.
//!
//! The parser owns a single-token lookahead, the case-insensitive keyword
//! and symbol tables, the iteration-scope stack (`it`, `it_1`, ...), and
//! the literal side-table that lets promotion re-lex numeric literals. It
//! invokes the promotion engine and overload resolver at every operator and
//! call site, so the tree it emits is typed as it is built.
//!
//! One parse is a pure function of its inputs: all mutable state lives on
//! the parser instance and nothing is shared across threads.

use std::collections::HashMap;

use crate::aggregates;
use crate::ast::{
    BinaryOp, CallTarget, Expr, Ordering, Parameter, Token, TokenKind, UnaryOp,
};
use crate::builtins;
use crate::error::{ErrorKind, ParseError};
use crate::lexer::Lexer;
use crate::promote::{
    LiteralTable, Promoter, ADD_SIGNATURES, ARITHMETIC_SIGNATURES, EQUALITY_SIGNATURES,
    LOGICAL_SIGNATURES, NEGATION_SIGNATURES, NOT_SIGNATURES, RELATIONAL_SIGNATURES,
    SUBTRACT_SIGNATURES,
};
use crate::records::{self, DynamicProperty};
use crate::resolve::{resolve_overloads, Resolution};
use crate::types::{self, TypeKind, TypeRef};
use crate::value::Value;

/// Entries of the keyword table.
#[derive(Clone)]
enum Keyword {
    /// A type referenceable by short name
    Type(TypeRef),
    /// The implicit iteration receiver
    It,
    /// Ternary-as-call
    Iif,
    /// Anonymous-record constructor
    New,
    /// `true`, `false`, `null`
    Literal(Expr),
}

/// Entries of the symbol table: user parameters and `@n` substitutions.
#[derive(Clone)]
enum Symbol {
    Param(Parameter),
    Value(Value),
}

pub struct Parser {
    lexer: Lexer,
    token: Token,
    keywords: HashMap<String, Keyword>,
    symbols: HashMap<String, Symbol>,
    externals: HashMap<String, Value>,
    literals: LiteralTable,
    it_stack: Vec<Parameter>,
    /// Caller-supplied types, referenceable and invocable alongside the
    /// predefined set
    extra_types: Vec<TypeRef>,
}

impl Parser {
    /// Parser over just the predefined types, with no parameters or
    /// substitution values.
    pub fn new(expression: &str) -> Result<Self, ParseError> {
        Parser::with_context(expression, &[], vec![], &[])
    }

    /// Full-context parser.
    ///
    /// Named parameters become symbols; a single anonymous parameter is
    /// pushed as the initial `it`. Substitution values become `@0`, `@1`,
    /// ...; if the final value is a [`Value::Dict`], it is installed as the
    /// externals table instead.
    pub fn with_context(
        expression: &str,
        parameters: &[Parameter],
        values: Vec<Value>,
        extra_types: &[TypeRef],
    ) -> Result<Self, ParseError> {
        let mut keywords = HashMap::new();
        keywords.insert("true".to_string(), Keyword::Literal(Expr::constant(Value::Bool(true))));
        keywords.insert("false".to_string(), Keyword::Literal(Expr::constant(Value::Bool(false))));
        keywords.insert("null".to_string(), Keyword::Literal(Expr::constant(Value::Null)));
        keywords.insert("it".to_string(), Keyword::It);
        keywords.insert("iif".to_string(), Keyword::Iif);
        keywords.insert("new".to_string(), Keyword::New);
        for ty in builtins::PREDEFINED.iter().chain(extra_types.iter()) {
            keywords.insert(short_name(&ty.full_name()).to_lowercase(), Keyword::Type(ty.clone()));
        }

        let mut parser = Parser {
            lexer: Lexer::new(expression),
            token: Token::new(TokenKind::End, "", 0),
            keywords,
            symbols: HashMap::new(),
            externals: HashMap::new(),
            literals: LiteralTable::new(),
            it_stack: Vec::new(),
            extra_types: extra_types.to_vec(),
        };

        for param in parameters {
            if !param.name.is_empty() {
                parser.add_symbol(&param.name, Symbol::Param(param.clone()))?;
            }
        }
        let mut anonymous = parameters.iter().filter(|p| p.name.is_empty());
        if let (Some(only), None) = (anonymous.next(), anonymous.next()) {
            parser.it_stack.push(only.clone());
        }

        let count = values.len();
        for (i, value) in values.into_iter().enumerate() {
            if i == count - 1 {
                if let Value::Dict(map) = value {
                    parser.externals =
                        map.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
                    break;
                }
            }
            parser.add_symbol(&format!("@{}", i), Symbol::Value(value))?;
        }

        parser.next_token()?;
        Ok(parser)
    }

    fn add_symbol(&mut self, name: &str, symbol: Symbol) -> Result<(), ParseError> {
        let key = name.to_lowercase();
        if self.symbols.contains_key(&key) {
            return Err(ParseError::new(ErrorKind::DuplicateIdentifier(name.to_string()), 0));
        }
        self.symbols.insert(key, symbol);
        Ok(())
    }

    /// Parse a complete expression; with a result type, the top-level
    /// expression is promoted to it exactly.
    pub fn parse(&mut self, result_type: Option<&TypeRef>) -> Result<Expr, ParseError> {
        let expr_pos = self.token.pos;
        let mut expr = self.parse_expression()?;
        if let Some(target) = result_type {
            expr = self.promote(&expr, target, true).ok_or_else(|| {
                ParseError::new(ErrorKind::ExpressionTypeMismatch(target.name()), expr_pos)
            })?;
        }
        self.validate_token(TokenKind::End, ErrorKind::SyntaxError)?;
        Ok(expr)
    }

    /// Parse a comma-separated sequence of ordering clauses.
    pub fn parse_ordering(&mut self) -> Result<Vec<Ordering>, ParseError> {
        let mut orderings = Vec::new();
        loop {
            let clause_pos = self.token.pos;
            let selector = self.parse_expression()?;
            let parameter = self
                .it_stack
                .last()
                .cloned()
                .ok_or_else(|| ParseError::new(ErrorKind::NoItInScope, clause_pos))?;
            let mut ascending = true;
            if self.token.identifier_is("asc") || self.token.identifier_is("ascending") {
                self.next_token()?;
            } else if self.token.identifier_is("desc") || self.token.identifier_is("descending") {
                self.next_token()?;
                ascending = false;
            }
            orderings.push(Ordering { selector, parameter, ascending });
            if self.token.kind == TokenKind::Comma {
                self.next_token()?;
            } else {
                break;
            }
        }
        self.validate_token(TokenKind::End, ErrorKind::SyntaxError)?;
        Ok(orderings)
    }

    // -- token plumbing ----------------------------------------------------

    fn next_token(&mut self) -> Result<(), ParseError> {
        self.token = self.lexer.next_token()?;
        Ok(())
    }

    fn validate_token(&self, kind: TokenKind, error: ErrorKind) -> Result<(), ParseError> {
        if self.token.kind != kind {
            return Err(ParseError::new(error, self.token.pos));
        }
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind, error: ErrorKind) -> Result<(), ParseError> {
        self.validate_token(kind, error)?;
        self.next_token()
    }

    fn promote(&self, expr: &Expr, target: &TypeRef, exact: bool) -> Option<Expr> {
        Promoter::new(&self.literals).promote(expr, target, exact)
    }

    // -- precedence ladder -------------------------------------------------

    /// `?:`
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let error_pos = self.token.pos;
        let expr = self.parse_logical_or()?;
        if self.token.kind == TokenKind::Question {
            self.next_token()?;
            let if_true = self.parse_expression()?;
            self.expect(TokenKind::Colon, ErrorKind::ColonExpected)?;
            let if_false = self.parse_expression()?;
            return self.generate_conditional(expr, if_true, if_false, error_pos);
        }
        Ok(expr)
    }

    /// `||`, `or`
    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.token.kind == TokenKind::DoubleBar || self.token.identifier_is("or") {
            let op = self.token.clone();
            self.next_token()?;
            let mut right = self.parse_logical_and()?;
            self.check_and_promote_binary(&LOGICAL_SIGNATURES, &op, &mut left, &mut right)?;
            let ty = left.ty().clone();
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                ty,
            };
        }
        Ok(left)
    }

    /// `&&`, `and`
    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        while self.token.kind == TokenKind::DoubleAmp || self.token.identifier_is("and") {
            let op = self.token.clone();
            self.next_token()?;
            let mut right = self.parse_comparison()?;
            self.check_and_promote_binary(&LOGICAL_SIGNATURES, &op, &mut left, &mut right)?;
            let ty = left.ty().clone();
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
                ty,
            };
        }
        Ok(left)
    }

    /// `= == != <> < <= > >=`, `as`, `is`
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            match self.token.kind {
                TokenKind::IsType => {
                    self.next_token()?;
                    let target = self.parse_qualified_type()?;
                    left = Expr::TypeIs { expr: Box::new(left), target };
                }
                TokenKind::AsType => {
                    self.next_token()?;
                    let type_pos = self.token.pos;
                    let target = self.parse_qualified_type()?;
                    if target.is_value_type() && !target.is_nullable() {
                        return Err(ParseError::new(
                            ErrorKind::CannotConvertValue {
                                from: left.ty().name(),
                                to: target.name(),
                            },
                            type_pos,
                        ));
                    }
                    left = Expr::TypeAs { expr: Box::new(left), ty: target };
                }
                TokenKind::Equal
                | TokenKind::DoubleEqual
                | TokenKind::ExclamationEqual
                | TokenKind::LessGreater
                | TokenKind::LessThan
                | TokenKind::LessThanEqual
                | TokenKind::GreaterThan
                | TokenKind::GreaterThanEqual => {
                    let op = self.token.clone();
                    self.next_token()?;
                    let right = self.parse_additive()?;
                    left = self.apply_comparison(&op, left, right)?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn apply_comparison(
        &mut self,
        op: &Token,
        mut left: Expr,
        mut right: Expr,
    ) -> Result<Expr, ParseError> {
        let is_equality = matches!(
            op.kind,
            TokenKind::Equal
                | TokenKind::DoubleEqual
                | TokenKind::ExclamationEqual
                | TokenKind::LessGreater
        );

        if is_equality && !left.ty().is_value_type() && !right.ty().is_value_type() {
            // Reference comparison: align the types one direction
            if left.ty() != right.ty() {
                if left.ty().is_assignable_from(right.ty()) {
                    right = Expr::Convert {
                        ty: left.ty().clone(),
                        expr: Box::new(right),
                        checked: false,
                    };
                } else if right.ty().is_assignable_from(left.ty()) {
                    left = Expr::Convert {
                        ty: right.ty().clone(),
                        expr: Box::new(left),
                        checked: false,
                    };
                } else {
                    return Err(self.incompatible_operands(op, &left, &right));
                }
            }
        } else if left.ty().non_nullable().is_enum() || right.ty().non_nullable().is_enum() {
            if left.ty() != right.ty() {
                if let Some(e) = self.promote(&right, left.ty(), true) {
                    right = e;
                } else if let Some(e) = self.promote(&left, right.ty(), true) {
                    left = e;
                } else {
                    return Err(self.incompatible_operands(op, &left, &right));
                }
            }
        } else {
            let signatures =
                if is_equality { &*EQUALITY_SIGNATURES } else { &*RELATIONAL_SIGNATURES };
            self.check_and_promote_binary(signatures, op, &mut left, &mut right)?;
        }

        let binop = match op.kind {
            TokenKind::Equal | TokenKind::DoubleEqual => BinaryOp::Equal,
            TokenKind::ExclamationEqual | TokenKind::LessGreater => BinaryOp::NotEqual,
            TokenKind::LessThan => BinaryOp::LessThan,
            TokenKind::LessThanEqual => BinaryOp::LessEqual,
            TokenKind::GreaterThan => BinaryOp::GreaterThan,
            _ => BinaryOp::GreaterEqual,
        };

        let relational = matches!(
            binop,
            BinaryOp::LessThan
                | BinaryOp::LessEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterEqual
        );
        if relational && *left.ty() == *types::STRING {
            // String ordering compiles to Compare(left, right) <op> 0
            let compare = Expr::Call {
                target: CallTarget::Static(types::STRING.clone()),
                method: "Compare".to_string(),
                type_args: vec![],
                args: vec![left, right],
                ty: types::INT32.clone(),
            };
            return Ok(Expr::Binary {
                op: binop,
                left: Box::new(compare),
                right: Box::new(Expr::typed_constant(Value::Int32(0), types::INT32.clone())),
                ty: types::BOOL.clone(),
            });
        }

        Ok(Expr::Binary {
            op: binop,
            left: Box::new(left),
            right: Box::new(right),
            ty: types::BOOL.clone(),
        })
    }

    /// `+ - &`
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        while matches!(self.token.kind, TokenKind::Plus | TokenKind::Minus | TokenKind::Amp) {
            let op = self.token.clone();
            self.next_token()?;
            let mut right = self.parse_multiplicative()?;
            match op.kind {
                TokenKind::Plus => {
                    if *left.ty() == *types::STRING || *right.ty() == *types::STRING {
                        left = string_concat(left, right);
                    } else {
                        self.check_and_promote_binary(&ADD_SIGNATURES, &op, &mut left, &mut right)?;
                        let ty = additive_result(left.ty(), right.ty(), false);
                        left = Expr::Binary {
                            op: BinaryOp::Add,
                            left: Box::new(left),
                            right: Box::new(right),
                            ty,
                        };
                    }
                }
                TokenKind::Minus => {
                    self.check_and_promote_binary(&SUBTRACT_SIGNATURES, &op, &mut left, &mut right)?;
                    let ty = additive_result(left.ty(), right.ty(), true);
                    left = Expr::Binary {
                        op: BinaryOp::Subtract,
                        left: Box::new(left),
                        right: Box::new(right),
                        ty,
                    };
                }
                _ => left = string_concat(left, right),
            }
        }
        Ok(left)
    }

    /// `* / %`, `mod`
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let binop = match self.token.kind {
                TokenKind::Asterisk => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                TokenKind::Identifier if self.token.identifier_is("mod") => BinaryOp::Modulo,
                _ => break,
            };
            let op = self.token.clone();
            self.next_token()?;
            let mut right = self.parse_unary()?;
            self.check_and_promote_binary(&ARITHMETIC_SIGNATURES, &op, &mut left, &mut right)?;
            let ty = left.ty().clone();
            left = Expr::Binary { op: binop, left: Box::new(left), right: Box::new(right), ty };
        }
        Ok(left)
    }

    /// `- ! not`
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let negate = self.token.kind == TokenKind::Minus;
        if negate || self.token.kind == TokenKind::Bang || self.token.identifier_is("not") {
            let op = self.token.clone();
            self.next_token()?;
            if negate
                && matches!(self.token.kind, TokenKind::IntegerLiteral | TokenKind::RealLiteral)
            {
                // Fold the sign into the literal so the minimum signed
                // value stays representable
                self.token.text = format!("-{}", self.token.text);
                self.token.pos = op.pos;
                return self.parse_primary();
            }
            let mut expr = self.parse_unary()?;
            if negate {
                self.check_and_promote_unary(&NEGATION_SIGNATURES, &op, &mut expr)?;
                let ty = expr.ty().clone();
                expr = Expr::Unary { op: UnaryOp::Negate, operand: Box::new(expr), ty };
            } else {
                self.check_and_promote_unary(&NOT_SIGNATURES, &op, &mut expr)?;
                let ty = expr.ty().clone();
                expr = Expr::Unary { op: UnaryOp::Not, operand: Box::new(expr), ty };
            }
            return Ok(expr);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary_start()?;
        loop {
            match self.token.kind {
                TokenKind::Dot => {
                    self.next_token()?;
                    expr = self.parse_member_access(Some(expr), None)?;
                }
                TokenKind::OpenBracket => {
                    expr = self.parse_element_access(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary_start(&mut self) -> Result<Expr, ParseError> {
        match self.token.kind {
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::StringLiteral => self.parse_string_literal(),
            TokenKind::IntegerLiteral => self.parse_integer_literal(),
            TokenKind::RealLiteral => self.parse_real_literal(),
            TokenKind::OpenParen => self.parse_paren_expression(),
            _ => Err(ParseError::new(ErrorKind::ExpressionExpected, self.token.pos)),
        }
    }

    fn parse_paren_expression(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenKind::OpenParen, ErrorKind::OpenParenExpected)?;
        let expr = self.parse_expression()?;
        self.validate_token(TokenKind::CloseParen, ErrorKind::CloseParenOrOperatorExpected)?;
        self.next_token()?;
        Ok(expr)
    }

    // -- literals ----------------------------------------------------------

    fn create_literal(&mut self, value: Value, text: &str) -> Expr {
        let id = self.literals.track(text);
        let ty = value.type_of();
        Expr::Constant { value, ty, literal: Some(id) }
    }

    fn parse_string_literal(&mut self) -> Result<Expr, ParseError> {
        let token = self.token.clone();
        let chars: Vec<char> = token.text.chars().collect();
        let quote = chars[0];
        let mut s = String::new();
        let mut i = 1;
        while i < chars.len() - 1 {
            s.push(chars[i]);
            if chars[i] == quote {
                // Skip the second half of a doubled delimiter
                i += 2;
            } else {
                i += 1;
            }
        }
        self.next_token()?;

        if quote == '\'' {
            let mut it = s.chars();
            match (it.next(), it.next()) {
                (Some(c), None) => return Ok(self.create_literal(Value::Char(c), &s)),
                (None, _) => {
                    return Err(ParseError::new(ErrorKind::InvalidCharacterLiteral, token.pos))
                }
                _ => {}
            }
        }
        Ok(self.create_literal(Value::String(s.clone()), &s))
    }

    fn parse_integer_literal(&mut self) -> Result<Expr, ParseError> {
        let token = self.token.clone();
        let text = token.text.as_str();
        let value = if text.starts_with('-') {
            match text.parse::<i64>() {
                Ok(v) if v >= i32::MIN as i64 && v <= i32::MAX as i64 => Value::Int32(v as i32),
                Ok(v) => Value::Int64(v),
                Err(_) => {
                    return Err(ParseError::new(
                        ErrorKind::InvalidIntegerLiteral(text.to_string()),
                        token.pos,
                    ))
                }
            }
        } else {
            match text.parse::<u64>() {
                Ok(v) if v <= i32::MAX as u64 => Value::Int32(v as i32),
                Ok(v) if v <= u32::MAX as u64 => Value::UInt32(v as u32),
                Ok(v) if v <= i64::MAX as u64 => Value::Int64(v as i64),
                Ok(v) => Value::UInt64(v),
                Err(_) => {
                    return Err(ParseError::new(
                        ErrorKind::InvalidIntegerLiteral(text.to_string()),
                        token.pos,
                    ))
                }
            }
        };
        self.next_token()?;
        Ok(self.create_literal(value, text))
    }

    fn parse_real_literal(&mut self) -> Result<Expr, ParseError> {
        let token = self.token.clone();
        let text = token.text.as_str();
        let value = if text.ends_with('f') || text.ends_with('F') {
            text[..text.len() - 1].parse::<f32>().ok().map(Value::Single)
        } else {
            text.parse::<f64>().ok().map(Value::Double)
        };
        let value = value.ok_or_else(|| {
            ParseError::new(ErrorKind::InvalidRealLiteral(text.to_string()), token.pos)
        })?;
        self.next_token()?;
        Ok(self.create_literal(value, text))
    }

    // -- identifiers -------------------------------------------------------

    fn parse_identifier(&mut self) -> Result<Expr, ParseError> {
        let token = self.token.clone();
        let lower = token.text.to_lowercase();

        // Parent-iteration references before everything else
        if let Some(rest) = lower.strip_prefix("it_") {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(k) = rest.parse::<usize>() {
                    return self.parse_outer_it(k, token.pos);
                }
                return Err(ParseError::new(ErrorKind::NoItInScope, token.pos));
            }
        }

        if let Some(keyword) = self.keywords.get(&lower).cloned() {
            return match keyword {
                Keyword::Type(ty) => self.parse_type_access(ty, token.pos),
                Keyword::It => self.parse_it(token.pos),
                Keyword::Iif => self.parse_iif(token.pos),
                Keyword::New => self.parse_new(),
                Keyword::Literal(expr) => {
                    self.next_token()?;
                    Ok(expr)
                }
            };
        }

        if let Some(symbol) = self.symbols.get(&lower).cloned() {
            return self.parse_symbol(symbol, &token);
        }
        if let Some(value) = self.externals.get(&lower).cloned() {
            return self.parse_symbol(Symbol::Value(value), &token);
        }

        // Unqualified names fall back to members of the implicit receiver
        if let Some(it) = self.it_stack.last().cloned() {
            return self.parse_member_access(Some(Expr::Parameter(it)), None);
        }
        Err(ParseError::new(ErrorKind::UnknownIdentifier(token.text.clone()), token.pos))
    }

    fn parse_it(&mut self, pos: usize) -> Result<Expr, ParseError> {
        let it = self
            .it_stack
            .last()
            .cloned()
            .ok_or_else(|| ParseError::new(ErrorKind::NoItInScope, pos))?;
        self.next_token()?;
        Ok(Expr::Parameter(it))
    }

    /// `it_k`: the k-th frame below the top of the iteration stack.
    fn parse_outer_it(&mut self, k: usize, pos: usize) -> Result<Expr, ParseError> {
        let index = self
            .it_stack
            .len()
            .checked_sub(1 + k)
            .ok_or_else(|| ParseError::new(ErrorKind::NoItInScope, pos))?;
        let param = self.it_stack[index].clone();
        self.next_token()?;
        Ok(Expr::Parameter(param))
    }

    fn parse_symbol(&mut self, symbol: Symbol, token: &Token) -> Result<Expr, ParseError> {
        match symbol {
            Symbol::Param(param) => {
                self.next_token()?;
                Ok(Expr::Parameter(param))
            }
            Symbol::Value(Value::Lambda(lambda)) => self.parse_lambda_invocation(*lambda, token),
            Symbol::Value(value) => {
                self.next_token()?;
                Ok(Expr::constant(value))
            }
        }
    }

    fn parse_lambda_invocation(
        &mut self,
        lambda: Expr,
        token: &Token,
    ) -> Result<Expr, ParseError> {
        self.next_token()?;
        let args = self.parse_argument_list()?;
        let TypeKind::Function { params, result } = lambda.ty().kind().clone() else {
            return Err(ParseError::new(ErrorKind::ArgsIncompatibleWithLambda, token.pos));
        };
        if params.len() != args.len() {
            return Err(ParseError::new(ErrorKind::ArgsIncompatibleWithLambda, token.pos));
        }
        let mut promoted = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&params) {
            match self.promote(arg, param, false) {
                Some(e) => promoted.push(e),
                None => {
                    return Err(ParseError::new(ErrorKind::ArgsIncompatibleWithLambda, token.pos))
                }
            }
        }
        Ok(Expr::Invoke { lambda: Box::new(lambda), args: promoted, ty: result })
    }

    fn parse_iif(&mut self, pos: usize) -> Result<Expr, ParseError> {
        self.next_token()?;
        let mut args = self.parse_argument_list()?;
        if args.len() != 3 {
            return Err(ParseError::new(ErrorKind::IifRequiresThreeArgs, pos));
        }
        let if_false = args.pop().unwrap();
        let if_true = args.pop().unwrap();
        let test = args.pop().unwrap();
        self.generate_conditional(test, if_true, if_false, pos)
    }

    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        self.next_token()?;
        self.expect(TokenKind::OpenParen, ErrorKind::OpenParenExpected)?;
        let mut properties = Vec::new();
        let mut expressions = Vec::new();
        loop {
            let expr_pos = self.token.pos;
            let expr = self.parse_expression()?;
            let name = if self.token.identifier_is("alias") {
                self.next_token()?;
                self.validate_token(TokenKind::Identifier, ErrorKind::IdentifierExpected)?;
                let name = self.token.text.clone();
                self.next_token()?;
                name
            } else {
                match &expr {
                    Expr::Member { name, .. } => name.clone(),
                    _ => return Err(ParseError::new(ErrorKind::MissingAsClause, expr_pos)),
                }
            };
            properties.push(DynamicProperty::new(&name, expr.ty().clone()));
            expressions.push(expr);
            if self.token.kind == TokenKind::Comma {
                self.next_token()?;
            } else {
                break;
            }
        }
        self.validate_token(TokenKind::CloseParen, ErrorKind::CloseParenOrCommaExpected)?;
        self.next_token()?;

        let ty = records::create_class(&properties);
        let bindings = properties
            .iter()
            .zip(expressions)
            .map(|(p, e)| (p.name().to_string(), e))
            .collect();
        Ok(Expr::MemberInit { ty, bindings })
    }

    // -- types and members -------------------------------------------------

    /// Dotted type name after `is`/`as`.
    fn parse_qualified_type(&mut self) -> Result<TypeRef, ParseError> {
        let error_pos = self.token.pos;
        self.validate_token(TokenKind::Identifier, ErrorKind::IdentifierExpected)?;
        let mut name = self.token.text.clone();
        self.next_token()?;
        while self.token.kind == TokenKind::Dot {
            self.next_token()?;
            self.validate_token(TokenKind::Identifier, ErrorKind::IdentifierExpected)?;
            name.push('.');
            name.push_str(&self.token.text);
            self.next_token()?;
        }
        builtins::resolve_type_name(&name, &self.extra_types)
            .ok_or_else(|| ParseError::new(ErrorKind::UnknownIdentifier(name), error_pos))
    }

    /// A type name in expression position: `T?`, `T(...)`, or `T.member`.
    fn parse_type_access(&mut self, ty: TypeRef, error_pos: usize) -> Result<Expr, ParseError> {
        self.next_token()?;
        let mut ty = ty;
        if self.token.kind == TokenKind::Question {
            if !ty.is_value_type() || ty.is_nullable() {
                return Err(ParseError::new(
                    ErrorKind::TypeHasNoNullableForm(ty.name()),
                    error_pos,
                ));
            }
            ty = TypeRef::nullable_of(ty);
            self.next_token()?;
        }
        match self.token.kind {
            TokenKind::OpenParen => {
                let args = self.parse_argument_list()?;
                let ctors = builtins::constructors_of(&ty);
                let lists: Vec<&[TypeRef]> =
                    ctors.iter().map(|c| c.params.as_slice()).collect();
                match resolve_overloads(&Promoter::new(&self.literals), &lists, &args) {
                    Resolution::Matched { args: promoted, .. } => {
                        Ok(Expr::New { ty, args: promoted })
                    }
                    Resolution::NoMatch if args.len() == 1 => {
                        let arg = args.into_iter().next().unwrap();
                        self.generate_conversion(arg, ty, error_pos)
                    }
                    Resolution::NoMatch => Err(ParseError::new(
                        ErrorKind::NoMatchingConstructor(ty.name()),
                        error_pos,
                    )),
                    Resolution::Ambiguous => Err(ParseError::new(
                        ErrorKind::AmbiguousConstructorInvocation(ty.name()),
                        error_pos,
                    )),
                }
            }
            TokenKind::Dot => {
                self.next_token()?;
                self.parse_member_access(None, Some(ty))
            }
            _ => Err(ParseError::new(ErrorKind::DotOrOpenParenExpected, self.token.pos)),
        }
    }

    /// The explicit conversion rule for `T(x)` with no matching constructor.
    fn generate_conversion(
        &self,
        expr: Expr,
        target: TypeRef,
        error_pos: usize,
    ) -> Result<Expr, ParseError> {
        let source = expr.ty().clone();
        if source == target {
            return Ok(expr);
        }
        if source.is_value_type() && target.is_value_type() {
            let sn = source.non_nullable();
            let tn = target.non_nullable();
            if (source.is_nullable() || target.is_nullable()) && sn == tn {
                return Ok(Expr::Convert { expr: Box::new(expr), ty: target, checked: true });
            }
            if (sn.is_numeric() || sn.is_enum()) && (tn.is_numeric() || tn.is_enum()) {
                return Ok(Expr::Convert { expr: Box::new(expr), ty: target, checked: true });
            }
        }
        if source.is_assignable_from(&target)
            || target.is_assignable_from(&source)
            || source.is_interface()
            || target.is_interface()
        {
            return Ok(Expr::Convert { expr: Box::new(expr), ty: target, checked: false });
        }
        Err(ParseError::new(
            ErrorKind::CannotConvertValue { from: source.name(), to: target.name() },
            error_pos,
        ))
    }

    /// Member access: the current token is the member name. Exactly one of
    /// `instance` / `static_type` is set.
    fn parse_member_access(
        &mut self,
        instance: Option<Expr>,
        static_type: Option<TypeRef>,
    ) -> Result<Expr, ParseError> {
        let ty = match (&instance, &static_type) {
            (Some(expr), _) => expr.ty().clone(),
            (None, Some(ty)) => ty.clone(),
            (None, None) => unreachable!("member access needs a receiver or a type"),
        };
        let error_pos = self.token.pos;
        self.validate_token(TokenKind::Identifier, ErrorKind::IdentifierExpected)?;
        let name = self.token.text.clone();
        self.next_token()?;

        if self.token.kind == TokenKind::OpenParen {
            // Aggregate dispatch preempts method lookup on enumerable
            // receivers (string excluded)
            if let Some(receiver) = instance {
                if ty != *types::STRING {
                    if let Some(element) = ty.element_type() {
                        return self.parse_aggregate(receiver, element, &name, error_pos);
                    }
                }
                return self.parse_method_call(Some(receiver), ty, &name, error_pos);
            }
            return self.parse_method_call(None, ty, &name, error_pos);
        }

        // Static access on an enum yields the member constant
        if instance.is_none() {
            if let TypeKind::Enum(def) = ty.kind() {
                return match def.find_member(&name) {
                    Some((member, value)) => Ok(Expr::typed_constant(
                        Value::Enum { ty: ty.clone(), member: member.to_string(), value },
                        ty.clone(),
                    )),
                    None => Err(ParseError::new(
                        ErrorKind::UnknownPropertyOrField { name, type_name: ty.name() },
                        error_pos,
                    )),
                };
            }
        }

        if let Some(receiver) = instance {
            for level in ty.self_and_bases() {
                let found = builtins::declared_properties(&level)
                    .into_iter()
                    .find(|p| p.name.eq_ignore_ascii_case(&name));
                if let Some(prop) = found {
                    return Ok(Expr::Member {
                        instance: Box::new(receiver),
                        name: prop.name,
                        ty: prop.ty,
                    });
                }
            }
        }
        Err(ParseError::new(
            ErrorKind::UnknownPropertyOrField { name, type_name: ty.name() },
            error_pos,
        ))
    }

    fn parse_method_call(
        &mut self,
        instance: Option<Expr>,
        ty: TypeRef,
        name: &str,
        error_pos: usize,
    ) -> Result<Expr, ParseError> {
        let args = self.parse_argument_list()?;
        let static_access = instance.is_none();

        for level in ty.self_and_bases() {
            let methods: Vec<_> = builtins::declared_methods(&level)
                .into_iter()
                .filter(|m| m.is_static == static_access && m.name.eq_ignore_ascii_case(name))
                .collect();
            if methods.is_empty() {
                continue;
            }
            let lists: Vec<&[TypeRef]> = methods.iter().map(|m| m.params.as_slice()).collect();
            match resolve_overloads(&Promoter::new(&self.literals), &lists, &args) {
                Resolution::Matched { index, args: promoted } => {
                    let method = &methods[index];
                    if !self.is_accessible(&level) {
                        return Err(ParseError::new(
                            ErrorKind::MethodsAreInaccessible(level.name()),
                            error_pos,
                        ));
                    }
                    if method.ret == *types::VOID {
                        return Err(ParseError::new(
                            ErrorKind::MethodIsVoid {
                                name: method.name.clone(),
                                type_name: ty.name(),
                            },
                            error_pos,
                        ));
                    }
                    let target = match instance {
                        Some(receiver) => CallTarget::Instance(Box::new(receiver)),
                        None => CallTarget::Static(ty.clone()),
                    };
                    return Ok(Expr::Call {
                        target,
                        method: method.name.clone(),
                        type_args: vec![],
                        args: promoted,
                        ty: method.ret.clone(),
                    });
                }
                Resolution::Ambiguous => {
                    return Err(ParseError::new(
                        ErrorKind::AmbiguousMethodInvocation {
                            name: name.to_string(),
                            type_name: ty.name(),
                        },
                        error_pos,
                    ))
                }
                Resolution::NoMatch => continue,
            }
        }
        Err(ParseError::new(
            ErrorKind::NoApplicableMethod { name: name.to_string(), type_name: ty.name() },
            error_pos,
        ))
    }

    /// Types whose methods may be invoked: the predefined set plus the
    /// caller's allowed types.
    fn is_accessible(&self, ty: &TypeRef) -> bool {
        match ty.kind() {
            TypeKind::Class(_) | TypeKind::Enum(_) => {
                builtins::PREDEFINED.iter().any(|t| t == ty)
                    || self.extra_types.iter().any(|t| t == ty)
            }
            _ => true,
        }
    }

    fn parse_aggregate(
        &mut self,
        receiver: Expr,
        element: TypeRef,
        name: &str,
        error_pos: usize,
    ) -> Result<Expr, ParseError> {
        let inner = Parameter::anonymous(element.clone());
        self.it_stack.push(inner.clone());
        let args = self.parse_argument_list();
        self.it_stack.pop();
        let args = args?;

        let promoter = Promoter::new(&self.literals);
        match aggregates::dispatch(&promoter, name, receiver, &element, &inner, &args) {
            Some(resolved) => Ok(aggregates::into_call(resolved)),
            None => Err(ParseError::new(
                ErrorKind::NoApplicableAggregate(name.to_string()),
                error_pos,
            )),
        }
    }

    fn parse_element_access(&mut self, expr: Expr) -> Result<Expr, ParseError> {
        let error_pos = self.token.pos;
        self.expect(TokenKind::OpenBracket, ErrorKind::ExpressionExpected)?;
        let mut args = Vec::new();
        loop {
            args.push(self.parse_expression()?);
            if self.token.kind == TokenKind::Comma {
                self.next_token()?;
            } else {
                break;
            }
        }
        self.validate_token(TokenKind::CloseBracket, ErrorKind::CloseBracketOrCommaExpected)?;
        self.next_token()?;

        let ty = expr.ty().clone();
        if let TypeKind::Array { element, rank } = ty.kind() {
            if *rank != 1 || args.len() != 1 {
                return Err(ParseError::new(ErrorKind::CannotIndexMultiDimArray, error_pos));
            }
            let index = self
                .promote(&args[0], &types::INT32, true)
                .ok_or_else(|| ParseError::new(ErrorKind::InvalidIndex, error_pos))?;
            return Ok(Expr::ArrayIndex {
                array: Box::new(expr),
                index: Box::new(index),
                ty: element.clone(),
            });
        }

        for level in ty.self_and_bases() {
            let indexers = builtins::declared_indexers(&level);
            if indexers.is_empty() {
                continue;
            }
            let lists: Vec<&[TypeRef]> = indexers.iter().map(|x| x.params.as_slice()).collect();
            match resolve_overloads(&Promoter::new(&self.literals), &lists, &args) {
                Resolution::Matched { index, args: promoted } => {
                    return Ok(Expr::Index {
                        instance: Box::new(expr),
                        args: promoted,
                        ty: indexers[index].ty.clone(),
                    });
                }
                Resolution::Ambiguous => {
                    return Err(ParseError::new(
                        ErrorKind::AmbiguousIndexerInvocation(ty.name()),
                        error_pos,
                    ))
                }
                Resolution::NoMatch => continue,
            }
        }
        Err(ParseError::new(ErrorKind::NoApplicableIndexer(ty.name()), error_pos))
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::OpenParen, ErrorKind::OpenParenExpected)?;
        let mut args = Vec::new();
        if self.token.kind != TokenKind::CloseParen {
            loop {
                args.push(self.parse_expression()?);
                if self.token.kind == TokenKind::Comma {
                    self.next_token()?;
                } else {
                    break;
                }
            }
        }
        self.validate_token(TokenKind::CloseParen, ErrorKind::CloseParenOrCommaExpected)?;
        self.next_token()?;
        Ok(args)
    }

    // -- operator promotion ------------------------------------------------

    fn check_and_promote_binary(
        &self,
        signatures: &[Vec<TypeRef>],
        op: &Token,
        left: &mut Expr,
        right: &mut Expr,
    ) -> Result<(), ParseError> {
        let lists: Vec<&[TypeRef]> = signatures.iter().map(|s| s.as_slice()).collect();
        let args = [left.clone(), right.clone()];
        match resolve_overloads(&Promoter::new(&self.literals), &lists, &args) {
            Resolution::Matched { args: mut promoted, .. } => {
                *right = promoted.pop().unwrap();
                *left = promoted.pop().unwrap();
                Ok(())
            }
            _ => Err(self.incompatible_operands(op, left, right)),
        }
    }

    fn check_and_promote_unary(
        &self,
        signatures: &[Vec<TypeRef>],
        op: &Token,
        expr: &mut Expr,
    ) -> Result<(), ParseError> {
        let lists: Vec<&[TypeRef]> = signatures.iter().map(|s| s.as_slice()).collect();
        let args = [expr.clone()];
        match resolve_overloads(&Promoter::new(&self.literals), &lists, &args) {
            Resolution::Matched { args: mut promoted, .. } => {
                *expr = promoted.pop().unwrap();
                Ok(())
            }
            _ => Err(ParseError::new(
                ErrorKind::IncompatibleOperand {
                    op: op.text.clone(),
                    operand: expr.ty().name(),
                },
                op.pos,
            )),
        }
    }

    fn incompatible_operands(&self, op: &Token, left: &Expr, right: &Expr) -> ParseError {
        ParseError::new(
            ErrorKind::IncompatibleOperands {
                op: op.text.clone(),
                left: left.ty().name(),
                right: right.ty().name(),
            },
            op.pos,
        )
    }

    /// Reconcile the two result arms by bidirectional exact promotion;
    /// exactly one direction may succeed.
    fn generate_conditional(
        &self,
        test: Expr,
        mut if_true: Expr,
        mut if_false: Expr,
        error_pos: usize,
    ) -> Result<Expr, ParseError> {
        if *test.ty() != *types::BOOL {
            return Err(ParseError::new(ErrorKind::FirstExprMustBeBool, error_pos));
        }
        if if_true.ty() != if_false.ty() {
            // The null constant is never a promotion target
            let true_as_false = if !if_false.is_null_literal() {
                self.promote(&if_true, if_false.ty(), true)
            } else {
                None
            };
            let false_as_true = if !if_true.is_null_literal() {
                self.promote(&if_false, if_true.ty(), true)
            } else {
                None
            };
            match (true_as_false, false_as_true) {
                (Some(promoted), None) => if_true = promoted,
                (None, Some(promoted)) => if_false = promoted,
                (Some(_), Some(_)) => {
                    return Err(ParseError::new(
                        ErrorKind::BothTypesConvertToOther {
                            left: if_true.ty().name(),
                            right: if_false.ty().name(),
                        },
                        error_pos,
                    ))
                }
                (None, None) => {
                    return Err(ParseError::new(
                        ErrorKind::NeitherTypeConvertsToOther {
                            left: if_true.ty().name(),
                            right: if_false.ty().name(),
                        },
                        error_pos,
                    ))
                }
            }
        }
        let ty = if_true.ty().clone();
        Ok(Expr::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
            ty,
        })
    }
}

/// String concatenation: a call to the host's `Concat(Object, Object)`.
fn string_concat(left: Expr, right: Expr) -> Expr {
    Expr::Call {
        target: CallTarget::Static(types::STRING.clone()),
        method: "Concat".to_string(),
        type_args: vec![],
        args: vec![left, right],
        ty: types::STRING.clone(),
    }
}

/// Result type of `+`/`-` after signature promotion. The date/duration
/// pairs are the only ones whose result differs from the operand type.
fn additive_result(left: &TypeRef, right: &TypeRef, subtract: bool) -> TypeRef {
    let base = match (left.non_nullable().kind(), right.non_nullable().kind()) {
        (TypeKind::DateTime, TypeKind::TimeSpan) => types::DATETIME.clone(),
        (TypeKind::DateTime, TypeKind::DateTime) if subtract => types::TIMESPAN.clone(),
        (TypeKind::TimeSpan, TypeKind::TimeSpan) => types::TIMESPAN.clone(),
        _ => return left.clone(),
    };
    if left.is_nullable() || right.is_nullable() {
        TypeRef::nullable_of(base)
    } else {
        base
    }
}

fn short_name(full: &str) -> &str {
    full.rsplit('.').next().unwrap_or(full)
}

/// Parse a single expression. With a non-null `result_type` the top-level
/// expression is promoted to it exactly.
pub fn parse(
    result_type: Option<&TypeRef>,
    expression: &str,
    extra_types: &[TypeRef],
    values: Vec<Value>,
) -> Result<Expr, ParseError> {
    Parser::with_context(expression, &[], values, extra_types)?.parse(result_type)
}

/// Parse an expression over named parameters and wrap it in a lambda.
pub fn parse_lambda(
    parameters: &[Parameter],
    result_type: Option<&TypeRef>,
    expression: &str,
    extra_types: &[TypeRef],
    values: Vec<Value>,
) -> Result<Expr, ParseError> {
    let mut parser = Parser::with_context(expression, parameters, values, extra_types)?;
    let body = parser.parse(result_type)?;
    Ok(Expr::lambda(parameters.to_vec(), body))
}

/// Single-anonymous-parameter lambda form: the parameter is pushed as `it`.
pub fn parse_lambda_it(
    it_type: TypeRef,
    result_type: Option<&TypeRef>,
    expression: &str,
    extra_types: &[TypeRef],
    values: Vec<Value>,
) -> Result<Expr, ParseError> {
    let parameters = [Parameter::anonymous(it_type)];
    let mut parser = Parser::with_context(expression, &parameters, values, extra_types)?;
    let body = parser.parse(result_type)?;
    Ok(Expr::lambda(parameters.to_vec(), body))
}

/// Parse ordering clauses over an anonymous `it` of `it_type`.
pub fn parse_ordering(
    it_type: TypeRef,
    expression: &str,
    extra_types: &[TypeRef],
    values: Vec<Value>,
) -> Result<Vec<Ordering>, ParseError> {
    let parameters = [Parameter::anonymous(it_type)];
    Parser::with_context(expression, &parameters, values, extra_types)?.parse_ordering()
}

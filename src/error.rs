//! Parse-time error reporting.
//!
//! Every failure raised while lexing, parsing, or typing an expression is a
//! [`ParseError`]: an [`ErrorKind`] plus the 0-based character offset into
//! the source text where the problem was detected. The first error aborts
//! the parse; there is no local recovery.

use std::fmt;

/// The reason a parse failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Lexical
    /// String literal was never closed
    UnterminatedStringLiteral,
    /// Character that starts no token
    InvalidCharacter(char),
    /// A digit was required (e.g. after an exponent sign)
    DigitExpected,
    /// Integer literal out of range or malformed
    InvalidIntegerLiteral(String),
    /// Real literal malformed
    InvalidRealLiteral(String),
    /// Single-quoted literal with no characters
    InvalidCharacterLiteral,

    // Syntactic
    SyntaxError,
    OpenParenExpected,
    CloseParenOrCommaExpected,
    CloseParenOrOperatorExpected,
    ColonExpected,
    DotOrOpenParenExpected,
    CloseBracketOrCommaExpected,
    IdentifierExpected,
    /// `new(...)` element that is neither aliased nor a member access
    MissingAsClause,
    ExpressionExpected,

    // Name resolution
    UnknownIdentifier(String),
    UnknownPropertyOrField { name: String, type_name: String },
    DuplicateIdentifier(String),
    NoItInScope,

    // Typing
    /// Top-level expression could not be promoted to the requested type
    ExpressionTypeMismatch(String),
    TypeHasNoNullableForm(String),
    CannotConvertValue { from: String, to: String },
    FirstExprMustBeBool,
    BothTypesConvertToOther { left: String, right: String },
    NeitherTypeConvertsToOther { left: String, right: String },
    IncompatibleOperand { op: String, operand: String },
    IncompatibleOperands { op: String, left: String, right: String },
    InvalidIndex,
    CannotIndexMultiDimArray,

    // Overload resolution
    NoApplicableMethod { name: String, type_name: String },
    AmbiguousMethodInvocation { name: String, type_name: String },
    NoApplicableIndexer(String),
    AmbiguousIndexerInvocation(String),
    NoMatchingConstructor(String),
    AmbiguousConstructorInvocation(String),
    NoApplicableAggregate(String),
    MethodsAreInaccessible(String),
    MethodIsVoid { name: String, type_name: String },
    ArgsIncompatibleWithLambda,
    IifRequiresThreeArgs,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnterminatedStringLiteral => write!(f, "Unterminated string literal"),
            ErrorKind::InvalidCharacter(ch) => write!(f, "Invalid character '{}'", ch),
            ErrorKind::DigitExpected => write!(f, "Digit expected"),
            ErrorKind::InvalidIntegerLiteral(text) => {
                write!(f, "Invalid integer literal '{}'", text)
            }
            ErrorKind::InvalidRealLiteral(text) => write!(f, "Invalid real literal '{}'", text),
            ErrorKind::InvalidCharacterLiteral => {
                write!(f, "Character literal must contain exactly one character")
            }
            ErrorKind::SyntaxError => write!(f, "Syntax error"),
            ErrorKind::OpenParenExpected => write!(f, "'(' expected"),
            ErrorKind::CloseParenOrCommaExpected => write!(f, "')' or ',' expected"),
            ErrorKind::CloseParenOrOperatorExpected => write!(f, "')' or operator expected"),
            ErrorKind::ColonExpected => write!(f, "':' expected"),
            ErrorKind::DotOrOpenParenExpected => write!(f, "'.' or '(' expected"),
            ErrorKind::CloseBracketOrCommaExpected => write!(f, "']' or ',' expected"),
            ErrorKind::IdentifierExpected => write!(f, "Identifier expected"),
            ErrorKind::MissingAsClause => write!(f, "Expression is missing an 'alias' clause"),
            ErrorKind::ExpressionExpected => write!(f, "Expression expected"),
            ErrorKind::UnknownIdentifier(name) => write!(f, "Unknown identifier '{}'", name),
            ErrorKind::UnknownPropertyOrField { name, type_name } => {
                write!(f, "No property or field '{}' exists in type '{}'", name, type_name)
            }
            ErrorKind::DuplicateIdentifier(name) => {
                write!(f, "The identifier '{}' was defined more than once", name)
            }
            ErrorKind::NoItInScope => write!(f, "No 'it' is in scope"),
            ErrorKind::ExpressionTypeMismatch(type_name) => {
                write!(f, "Expression of type '{}' expected", type_name)
            }
            ErrorKind::TypeHasNoNullableForm(type_name) => {
                write!(f, "Type '{}' has no nullable form", type_name)
            }
            ErrorKind::CannotConvertValue { from, to } => {
                write!(f, "A value of type '{}' cannot be converted to type '{}'", from, to)
            }
            ErrorKind::FirstExprMustBeBool => {
                write!(f, "The first expression must be of type 'Boolean'")
            }
            ErrorKind::BothTypesConvertToOther { left, right } => {
                write!(f, "Both of the types '{}' and '{}' convert to the other", left, right)
            }
            ErrorKind::NeitherTypeConvertsToOther { left, right } => {
                write!(f, "Neither of the types '{}' and '{}' converts to the other", left, right)
            }
            ErrorKind::IncompatibleOperand { op, operand } => {
                write!(f, "Operator '{}' incompatible with operand type '{}'", op, operand)
            }
            ErrorKind::IncompatibleOperands { op, left, right } => {
                write!(
                    f,
                    "Operator '{}' incompatible with operand types '{}' and '{}'",
                    op, left, right
                )
            }
            ErrorKind::InvalidIndex => write!(f, "Array index must be an integer expression"),
            ErrorKind::CannotIndexMultiDimArray => {
                write!(f, "Indexing of multi-dimensional arrays is not supported")
            }
            ErrorKind::NoApplicableMethod { name, type_name } => {
                write!(f, "No applicable method '{}' exists in type '{}'", name, type_name)
            }
            ErrorKind::AmbiguousMethodInvocation { name, type_name } => {
                write!(f, "Ambiguous invocation of method '{}' in type '{}'", name, type_name)
            }
            ErrorKind::NoApplicableIndexer(type_name) => {
                write!(f, "No applicable indexer exists in type '{}'", type_name)
            }
            ErrorKind::AmbiguousIndexerInvocation(type_name) => {
                write!(f, "Ambiguous invocation of indexer in type '{}'", type_name)
            }
            ErrorKind::NoMatchingConstructor(type_name) => {
                write!(f, "No matching constructor in type '{}'", type_name)
            }
            ErrorKind::AmbiguousConstructorInvocation(type_name) => {
                write!(f, "Ambiguous invocation of constructor in type '{}'", type_name)
            }
            ErrorKind::NoApplicableAggregate(name) => {
                write!(f, "No applicable aggregate method '{}' exists", name)
            }
            ErrorKind::MethodsAreInaccessible(type_name) => {
                write!(f, "Methods on type '{}' are not accessible", type_name)
            }
            ErrorKind::MethodIsVoid { name, type_name } => {
                write!(f, "Method '{}' in type '{}' does not return a value", name, type_name)
            }
            ErrorKind::ArgsIncompatibleWithLambda => {
                write!(f, "Argument list incompatible with lambda expression")
            }
            ErrorKind::IifRequiresThreeArgs => {
                write!(f, "The 'iif' function requires three arguments")
            }
        }
    }
}

/// A parse failure with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// What went wrong
    pub kind: ErrorKind,
    /// 0-based character offset into the source expression
    pub position: usize,
}

impl ParseError {
    pub fn new(kind: ErrorKind, position: usize) -> Self {
        ParseError { kind, position }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at index {})", self.kind, self.position)
    }
}

impl std::error::Error for ParseError {}

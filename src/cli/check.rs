//! Parse an expression against declared parameters and report its type.

use super::CliError;
use crate::ast::{Expr, Parameter};
use crate::builtins;
use crate::parser::Parser;
use crate::types::TypeRef;

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression to parse
    pub expression: String,
    /// Typed parameters, each of the form `name:Type`
    pub parameters: Vec<String>,
    /// Type of the anonymous iteration parameter `it`, if any
    pub it_type: Option<String>,
    /// Promote the top-level expression to this type
    pub result_type: Option<String>,
}

/// Result of a check operation
#[derive(Debug)]
pub struct CheckResult {
    /// The parsed, typed tree
    pub expr: Expr,
    /// Display name of the expression's type
    pub type_name: String,
}

fn resolve(name: &str) -> Result<TypeRef, CliError> {
    builtins::resolve_type_name(name, &[]).ok_or_else(|| CliError::UnknownType(name.to_string()))
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let mut parameters = Vec::new();
    for raw in &options.parameters {
        let (name, type_name) = raw
            .split_once(':')
            .ok_or_else(|| CliError::InvalidParameter(raw.clone()))?;
        parameters.push(Parameter::new(name.trim(), resolve(type_name.trim())?));
    }
    if let Some(type_name) = &options.it_type {
        parameters.push(Parameter::anonymous(resolve(type_name.trim())?));
    }
    let result_type = match &options.result_type {
        Some(name) => Some(resolve(name.trim())?),
        None => None,
    };

    let mut parser = Parser::with_context(&options.expression, &parameters, vec![], &[])?;
    let expr = parser.parse(result_type.as_ref())?;
    let type_name = expr.ty().name();
    Ok(CheckResult { expr, type_name })
}

//! Rendering of typed expression trees.
//!
//! Two formats: an indented text dump for humans (one node per line,
//! `kind detail : Type`) and a [`serde_json::Value`] tree for tooling.
//! Both are deterministic for a given tree.

use serde_json::{json, Value as Json};

use crate::ast::{CallTarget, Expr};

/// Indented text rendering of a tree.
pub fn to_text(expr: &Expr) -> String {
    let mut out = String::new();
    write_node(&mut out, expr, 0);
    out
}

fn push_line(out: &mut String, indent: usize, line: &str) {
    out.push_str(&"  ".repeat(indent));
    out.push_str(line);
    out.push('\n');
}

fn write_node(out: &mut String, expr: &Expr, indent: usize) {
    match expr {
        Expr::Constant { value, ty, .. } => {
            push_line(out, indent, &format!("constant {} : {}", value.render(), ty));
        }
        Expr::Parameter(param) => {
            let name = if param.name.is_empty() { "it" } else { &param.name };
            push_line(out, indent, &format!("parameter {} : {}", name, param.ty));
        }
        Expr::Unary { op, operand, ty } => {
            push_line(out, indent, &format!("unary {} : {}", op.symbol(), ty));
            write_node(out, operand, indent + 1);
        }
        Expr::Binary { op, left, right, ty } => {
            push_line(out, indent, &format!("binary {} : {}", op.symbol(), ty));
            write_node(out, left, indent + 1);
            write_node(out, right, indent + 1);
        }
        Expr::Conditional { test, if_true, if_false, ty } => {
            push_line(out, indent, &format!("conditional : {}", ty));
            write_node(out, test, indent + 1);
            write_node(out, if_true, indent + 1);
            write_node(out, if_false, indent + 1);
        }
        Expr::Convert { expr: inner, ty, checked } => {
            let kind = if *checked { "convert-checked" } else { "convert" };
            push_line(out, indent, &format!("{} : {}", kind, ty));
            write_node(out, inner, indent + 1);
        }
        Expr::TypeIs { expr: inner, target } => {
            push_line(out, indent, &format!("is {} : Boolean", target));
            write_node(out, inner, indent + 1);
        }
        Expr::TypeAs { expr: inner, ty } => {
            push_line(out, indent, &format!("as {0} : {0}", ty));
            write_node(out, inner, indent + 1);
        }
        Expr::Member { instance, name, ty } => {
            push_line(out, indent, &format!("member {} : {}", name, ty));
            write_node(out, instance, indent + 1);
        }
        Expr::ArrayIndex { array, index, ty } => {
            push_line(out, indent, &format!("array-index : {}", ty));
            write_node(out, array, indent + 1);
            write_node(out, index, indent + 1);
        }
        Expr::Index { instance, args, ty } => {
            push_line(out, indent, &format!("index : {}", ty));
            write_node(out, instance, indent + 1);
            for arg in args {
                write_node(out, arg, indent + 1);
            }
        }
        Expr::Call { target, method, type_args, args, ty } => {
            let mut line = format!("call {}", method);
            if !type_args.is_empty() {
                let names: Vec<String> = type_args.iter().map(|t| t.to_string()).collect();
                line.push_str(&format!("<{}>", names.join(", ")));
            }
            match target {
                CallTarget::Static(owner) => line.push_str(&format!(" on {}", owner)),
                CallTarget::Sequence => line.push_str(" on sequence"),
                CallTarget::Instance(_) => {}
            }
            push_line(out, indent, &format!("{} : {}", line, ty));
            if let CallTarget::Instance(receiver) = target {
                write_node(out, receiver, indent + 1);
            }
            for arg in args {
                write_node(out, arg, indent + 1);
            }
        }
        Expr::Invoke { lambda, args, ty } => {
            push_line(out, indent, &format!("invoke : {}", ty));
            write_node(out, lambda, indent + 1);
            for arg in args {
                write_node(out, arg, indent + 1);
            }
        }
        Expr::Lambda { params, body, ty } => {
            let names: Vec<&str> = params
                .iter()
                .map(|p| if p.name.is_empty() { "it" } else { p.name.as_str() })
                .collect();
            push_line(out, indent, &format!("lambda ({}) : {}", names.join(", "), ty));
            write_node(out, body, indent + 1);
        }
        Expr::New { ty, args } => {
            push_line(out, indent, &format!("new : {}", ty));
            for arg in args {
                write_node(out, arg, indent + 1);
            }
        }
        Expr::MemberInit { ty, bindings } => {
            push_line(out, indent, &format!("record : {}", ty));
            for (name, value) in bindings {
                push_line(out, indent + 1, &format!("bind {}", name));
                write_node(out, value, indent + 2);
            }
        }
    }
}

/// JSON rendering of a tree.
pub fn to_json(expr: &Expr) -> Json {
    match expr {
        Expr::Constant { value, ty, .. } => json!({
            "node": "constant",
            "value": value.render(),
            "type": ty.to_string(),
        }),
        Expr::Parameter(param) => json!({
            "node": "parameter",
            "name": if param.name.is_empty() { "it".to_string() } else { param.name.clone() },
            "type": param.ty.to_string(),
        }),
        Expr::Unary { op, operand, ty } => json!({
            "node": "unary",
            "op": op.symbol(),
            "operand": to_json(operand),
            "type": ty.to_string(),
        }),
        Expr::Binary { op, left, right, ty } => json!({
            "node": "binary",
            "op": op.symbol(),
            "left": to_json(left),
            "right": to_json(right),
            "type": ty.to_string(),
        }),
        Expr::Conditional { test, if_true, if_false, ty } => json!({
            "node": "conditional",
            "test": to_json(test),
            "then": to_json(if_true),
            "else": to_json(if_false),
            "type": ty.to_string(),
        }),
        Expr::Convert { expr: inner, ty, checked } => json!({
            "node": "convert",
            "checked": checked,
            "operand": to_json(inner),
            "type": ty.to_string(),
        }),
        Expr::TypeIs { expr: inner, target } => json!({
            "node": "is",
            "operand": to_json(inner),
            "target": target.to_string(),
            "type": "Boolean",
        }),
        Expr::TypeAs { expr: inner, ty } => json!({
            "node": "as",
            "operand": to_json(inner),
            "type": ty.to_string(),
        }),
        Expr::Member { instance, name, ty } => json!({
            "node": "member",
            "name": name,
            "instance": to_json(instance),
            "type": ty.to_string(),
        }),
        Expr::ArrayIndex { array, index, ty } => json!({
            "node": "array-index",
            "array": to_json(array),
            "index": to_json(index),
            "type": ty.to_string(),
        }),
        Expr::Index { instance, args, ty } => json!({
            "node": "index",
            "instance": to_json(instance),
            "args": args.iter().map(to_json).collect::<Vec<_>>(),
            "type": ty.to_string(),
        }),
        Expr::Call { target, method, type_args, args, ty } => {
            let target_json = match target {
                CallTarget::Instance(receiver) => to_json(receiver),
                CallTarget::Static(owner) => json!({ "static": owner.to_string() }),
                CallTarget::Sequence => json!("sequence"),
            };
            json!({
                "node": "call",
                "method": method,
                "target": target_json,
                "typeArgs": type_args.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
                "args": args.iter().map(to_json).collect::<Vec<_>>(),
                "type": ty.to_string(),
            })
        }
        Expr::Invoke { lambda, args, ty } => json!({
            "node": "invoke",
            "lambda": to_json(lambda),
            "args": args.iter().map(to_json).collect::<Vec<_>>(),
            "type": ty.to_string(),
        }),
        Expr::Lambda { params, body, ty } => json!({
            "node": "lambda",
            "params": params
                .iter()
                .map(|p| json!({
                    "name": if p.name.is_empty() { "it".to_string() } else { p.name.clone() },
                    "type": p.ty.to_string(),
                }))
                .collect::<Vec<_>>(),
            "body": to_json(body),
            "type": ty.to_string(),
        }),
        Expr::New { ty, args } => json!({
            "node": "new",
            "args": args.iter().map(to_json).collect::<Vec<_>>(),
            "type": ty.to_string(),
        }),
        Expr::MemberInit { ty, bindings } => json!({
            "node": "record",
            "bindings": bindings
                .iter()
                .map(|(name, value)| json!({ "name": name, "value": to_json(value) }))
                .collect::<Vec<_>>(),
            "type": ty.to_string(),
        }),
    }
}

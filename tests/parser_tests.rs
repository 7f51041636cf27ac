// tests/parser_tests.rs

use std::collections::HashMap;

use dynexpr::parser::{parse, parse_lambda_it, parse_ordering, Parser};
use dynexpr::types::{self, ClassDef, EnumDef, MethodDef, TypeRef};
use dynexpr::{BinaryOp, CallTarget, ErrorKind, Expr, Parameter, UnaryOp, Value};

fn parse_simple(input: &str) -> Expr {
    parse(None, input, &[], vec![]).expect("expression should parse")
}

fn parse_with_it(it_type: TypeRef, input: &str) -> Expr {
    let params = [Parameter::anonymous(it_type)];
    Parser::with_context(input, &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .expect("expression should parse")
}

fn parse_err(input: &str) -> dynexpr::ParseError {
    parse(None, input, &[], vec![]).expect_err("expression should fail")
}

// ============================================================================
// Precedence and simple shapes
// ============================================================================

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    let expr = parse_simple("1 + 2 * 3");
    match expr {
        Expr::Binary { op: BinaryOp::Add, right, .. } => {
            assert!(matches!(*right, Expr::Binary { op: BinaryOp::Multiply, .. }));
        }
        other => panic!("expected addition at the top, got {:?}", other),
    }
}

#[test]
fn test_parentheses_override_precedence() {
    let expr = parse_simple("(1 + 2) * 3");
    match expr {
        Expr::Binary { op: BinaryOp::Multiply, left, .. } => {
            assert!(matches!(*left, Expr::Binary { op: BinaryOp::Add, .. }));
        }
        other => panic!("expected multiplication at the top, got {:?}", other),
    }
}

#[test]
fn test_comparison_is_boolean() {
    let expr = parse_simple("1 < 2");
    assert_eq!(expr.ty(), &*types::BOOL);
}

#[test]
fn test_word_operators_are_case_insensitive() {
    let expr = parse_simple("true AND false Or NOT true");
    assert_eq!(expr.ty(), &*types::BOOL);
    assert!(matches!(expr, Expr::Binary { op: BinaryOp::Or, .. }));

    let modulo = parse_simple("7 MOD 2");
    assert!(matches!(modulo, Expr::Binary { op: BinaryOp::Modulo, .. }));
}

#[test]
fn test_logical_operators_require_booleans() {
    let err = parse_err("1 && true");
    assert!(matches!(err.kind, ErrorKind::IncompatibleOperands { .. }));
    assert_eq!(err.position, 2);
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_integer_literal_sizing() {
    assert_eq!(parse_simple("5").ty(), &*types::INT32);
    assert_eq!(parse_simple("3000000000").ty(), &*types::UINT32);
    assert_eq!(parse_simple("5000000000").ty(), &*types::INT64);
    assert_eq!(parse_simple("10000000000000000000").ty(), &*types::UINT64);
}

#[test]
fn test_negative_literal_folding() {
    let expr = parse_simple("-2147483648");
    match expr {
        Expr::Constant { value, ty, .. } => {
            assert_eq!(value, Value::Int32(i32::MIN));
            assert_eq!(ty, *types::INT32);
        }
        other => panic!("expected a folded constant, got {:?}", other),
    }
}

#[test]
fn test_unary_minus_on_expressions() {
    let params = [Parameter::new("x", types::INT32.clone())];
    let expr = Parser::with_context("-x", &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .unwrap();
    assert!(matches!(expr, Expr::Unary { op: UnaryOp::Negate, .. }));
}

#[test]
fn test_real_literal_suffix() {
    assert_eq!(parse_simple("1.5").ty(), &*types::DOUBLE);
    assert_eq!(parse_simple("1.5f").ty(), &*types::SINGLE);
}

#[test]
fn test_integer_with_suffix_is_invalid() {
    let err = parse_err("10f");
    assert!(matches!(err.kind, ErrorKind::InvalidIntegerLiteral(_)));
}

#[test]
fn test_char_and_string_literals() {
    assert_eq!(parse_simple("'a'").ty(), &*types::CHAR);
    assert_eq!(parse_simple("\"ab\"").ty(), &*types::STRING);
    // A long single-quoted literal decays to a string
    assert_eq!(parse_simple("'ab'").ty(), &*types::STRING);

    let err = parse_err("''");
    assert_eq!(err.kind, ErrorKind::InvalidCharacterLiteral);
}

#[test]
fn test_doubled_quote_unescapes() {
    let expr = parse_simple("\"say \"\"hi\"\"\"");
    match expr {
        Expr::Constant { value: Value::String(s), .. } => assert_eq!(s, "say \"hi\""),
        other => panic!("expected a string constant, got {:?}", other),
    }
}

#[test]
fn test_literal_widens_across_operator() {
    // The integer literal re-lexes as Double; no conversion node appears
    let expr = parse_simple("1 < 2.5");
    match expr {
        Expr::Binary { left, .. } => {
            assert_eq!(*left, Expr::typed_constant(Value::Double(1.0), types::DOUBLE.clone()));
        }
        other => panic!("expected comparison, got {:?}", other),
    }
}

// ============================================================================
// Ternary and iif
// ============================================================================

#[test]
fn test_ternary() {
    let expr = parse_simple("true ? 1 : 2");
    assert!(matches!(expr, Expr::Conditional { .. }));
    assert_eq!(expr.ty(), &*types::INT32);
}

#[test]
fn test_iif_is_the_ternary() {
    let expr = parse_simple("iif(true, 1, 2)");
    assert!(matches!(expr, Expr::Conditional { .. }));
}

#[test]
fn test_iif_arity() {
    let err = parse_err("iif(true, 1)");
    assert_eq!(err.kind, ErrorKind::IifRequiresThreeArgs);
}

#[test]
fn test_ternary_test_must_be_boolean() {
    let err = parse_err("1 ? 2 : 3");
    assert_eq!(err.kind, ErrorKind::FirstExprMustBeBool);
}

#[test]
fn test_ternary_reconciles_null() {
    let expr = parse_simple("true ? \"a\" : null");
    assert_eq!(expr.ty(), &*types::STRING);
}

#[test]
fn test_ternary_rejects_unrelated_arms() {
    let err = parse_err("true ? \"a\" : false");
    assert!(matches!(err.kind, ErrorKind::NeitherTypeConvertsToOther { .. }));
}

// ============================================================================
// Parameters, values, and externals
// ============================================================================

#[test]
fn test_named_parameter_lookup_is_case_insensitive() {
    let params = [Parameter::new("Price", types::DOUBLE.clone())];
    let expr = Parser::with_context("price * 2", &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .unwrap();
    assert_eq!(expr.ty(), &*types::DOUBLE);
}

#[test]
fn test_duplicate_parameter_names_are_rejected() {
    let params =
        [Parameter::new("x", types::INT32.clone()), Parameter::new("X", types::INT64.clone())];
    let err = Parser::with_context("x", &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicateIdentifier(_)));
}

#[test]
fn test_positional_value_substitution() {
    let expr = parse(None, "@0 + @1", &[], vec![Value::Int32(1), Value::Int32(2)]).unwrap();
    assert!(matches!(expr, Expr::Binary { op: BinaryOp::Add, .. }));
}

#[test]
fn test_trailing_dict_becomes_externals() {
    let mut externals = HashMap::new();
    externals.insert("Limit".to_string(), Value::Int32(10));
    let expr = parse(None, "limit * 2", &[], vec![Value::Dict(externals)]).unwrap();
    assert_eq!(expr.ty(), &*types::INT32);
}

#[test]
fn test_lambda_value_invocation() {
    let add_one = parse_lambda_it(types::INT32.clone(), None, "it + 1", &[], vec![]).unwrap();
    let expr =
        parse(None, "@0(41)", &[], vec![Value::Lambda(Box::new(add_one))]).unwrap();
    match expr {
        Expr::Invoke { ty, args, .. } => {
            assert_eq!(ty, *types::INT32);
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected an invocation, got {:?}", other),
    }
}

#[test]
fn test_lambda_value_arity_mismatch() {
    let add_one = parse_lambda_it(types::INT32.clone(), None, "it + 1", &[], vec![]).unwrap();
    let err =
        parse(None, "@0(1, 2)", &[], vec![Value::Lambda(Box::new(add_one))]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArgsIncompatibleWithLambda);
}

#[test]
fn test_unknown_identifier() {
    let err = parse_err("nonsense");
    assert!(matches!(err.kind, ErrorKind::UnknownIdentifier(_)));
    assert_eq!(err.position, 0);
}

// ============================================================================
// Member and element access
// ============================================================================

#[test]
fn test_member_access_on_parameter() {
    let params = [Parameter::new("x", types::STRING.clone())];
    let expr = Parser::with_context("x.Length", &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .unwrap();
    match expr {
        Expr::Member { name, ty, .. } => {
            assert_eq!(name, "Length");
            assert_eq!(ty, *types::INT32);
        }
        other => panic!("expected member access, got {:?}", other),
    }
}

#[test]
fn test_unqualified_name_is_member_of_it() {
    let expr = parse_with_it(types::STRING.clone(), "Length + 1");
    assert_eq!(expr.ty(), &*types::INT32);
}

#[test]
fn test_member_lookup_is_case_insensitive_and_canonical() {
    let expr = parse_with_it(types::STRING.clone(), "length");
    match expr {
        Expr::Member { name, .. } => assert_eq!(name, "Length"),
        other => panic!("expected member access, got {:?}", other),
    }
}

#[test]
fn test_unknown_property() {
    let err = parse_with_err(types::STRING.clone(), "it.Missing");
    assert!(matches!(err.kind, ErrorKind::UnknownPropertyOrField { .. }));
}

fn parse_with_err(it_type: TypeRef, input: &str) -> dynexpr::ParseError {
    let params = [Parameter::anonymous(it_type)];
    Parser::with_context(input, &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .expect_err("expression should fail")
}

#[test]
fn test_string_indexer() {
    let expr = parse_with_it(types::STRING.clone(), "it[0]");
    match expr {
        Expr::Index { ty, .. } => assert_eq!(ty, *types::CHAR),
        other => panic!("expected indexer access, got {:?}", other),
    }
}

#[test]
fn test_array_index() {
    let expr = parse_with_it(TypeRef::array_of(types::INT32.clone()), "it[2] + 1");
    assert_eq!(expr.ty(), &*types::INT32);
}

#[test]
fn test_array_index_must_be_int() {
    let err = parse_with_err(TypeRef::array_of(types::INT32.clone()), "it[\"x\"]");
    assert_eq!(err.kind, ErrorKind::InvalidIndex);
}

#[test]
fn test_multi_dimensional_arrays_are_not_indexable() {
    let err = parse_with_err(TypeRef::array_with_rank(types::INT32.clone(), 2), "it[1, 2]");
    assert_eq!(err.kind, ErrorKind::CannotIndexMultiDimArray);
}

#[test]
fn test_nullable_members() {
    let nullable = TypeRef::nullable_of(types::INT32.clone());
    assert_eq!(parse_with_it(nullable.clone(), "it.HasValue").ty(), &*types::BOOL);
    assert_eq!(parse_with_it(nullable.clone(), "it.Value").ty(), &*types::INT32);
    assert_eq!(parse_with_it(nullable, "it.GetValueOrDefault()").ty(), &*types::INT32);
}

// ============================================================================
// Method calls
// ============================================================================

#[test]
fn test_instance_method_overloads() {
    let expr = parse_with_it(types::STRING.clone(), "it.Substring(1, 2)");
    match &expr {
        Expr::Call { target: CallTarget::Instance(_), method, ty, .. } => {
            assert_eq!(method, "Substring");
            assert_eq!(*ty, *types::STRING);
        }
        other => panic!("expected a call, got {:?}", other),
    }
}

#[test]
fn test_object_methods_via_base_walk() {
    let expr = parse_with_it(types::INT32.clone(), "it.ToString()");
    assert_eq!(expr.ty(), &*types::STRING);
}

#[test]
fn test_static_utility_calls() {
    let expr = parse_with_it(types::INT32.clone(), "Math.Abs(it)");
    match &expr {
        Expr::Call { target: CallTarget::Static(owner), method, ty, .. } => {
            assert_eq!(owner.name(), "Math");
            assert_eq!(method, "Abs");
            assert_eq!(*ty, *types::INT32);
        }
        other => panic!("expected a static call, got {:?}", other),
    }

    assert_eq!(parse_with_it(types::STRING.clone(), "Convert.ToInt32(it)").ty(), &*types::INT32);
}

#[test]
fn test_methods_on_unlisted_types_are_inaccessible() {
    let widget = ClassDef::new("Widget")
        .with_method(MethodDef::instance("Frob", vec![types::INT32.clone()], types::INT32.clone()))
        .into_type();
    let params = [Parameter::new("w", widget.clone())];

    let err = Parser::with_context("w.Frob(1)", &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MethodsAreInaccessible(_)));

    // Listing the type as allowed unlocks its methods
    let expr = Parser::with_context("w.Frob(1)", &params, vec![], &[widget])
        .and_then(|mut p| p.parse(None))
        .unwrap();
    assert_eq!(expr.ty(), &*types::INT32);
}

#[test]
fn test_void_methods_are_rejected() {
    let widget = ClassDef::new("Widget")
        .with_method(MethodDef::instance("Touch", vec![], types::VOID.clone()))
        .into_type();
    let params = [Parameter::new("w", widget.clone())];
    let err = Parser::with_context("w.Touch()", &params, vec![], &[widget])
        .and_then(|mut p| p.parse(None))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MethodIsVoid { .. }));
}

#[test]
fn test_ambiguous_method_invocation() {
    let widget = ClassDef::new("Widget")
        .with_method(MethodDef::instance("Fit", vec![types::SINGLE.clone()], types::INT32.clone()))
        .with_method(MethodDef::instance(
            "Fit",
            vec![types::DECIMAL.clone()],
            types::INT32.clone(),
        ))
        .into_type();
    let params =
        [Parameter::new("w", widget.clone()), Parameter::new("n", types::INT32.clone())];
    let err = Parser::with_context("w.Fit(n)", &params, vec![], &[widget])
        .and_then(|mut p| p.parse(None))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AmbiguousMethodInvocation { .. }));
}

#[test]
fn test_no_applicable_method() {
    let err = parse_with_err(types::STRING.clone(), "it.Substring(\"x\")");
    assert!(matches!(err.kind, ErrorKind::NoApplicableMethod { .. }));
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_string_relational_compiles_to_compare() {
    let params =
        [Parameter::new("a", types::STRING.clone()), Parameter::new("b", types::STRING.clone())];
    let expr = Parser::with_context("a < b", &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .unwrap();
    match expr {
        Expr::Binary { op: BinaryOp::LessThan, left, right, ty } => {
            assert_eq!(ty, *types::BOOL);
            match *left {
                Expr::Call { target: CallTarget::Static(ref owner), ref method, .. } => {
                    assert_eq!(owner.name(), "String");
                    assert_eq!(method, "Compare");
                }
                ref other => panic!("expected Compare call, got {:?}", other),
            }
            assert_eq!(*right, Expr::typed_constant(Value::Int32(0), types::INT32.clone()));
        }
        other => panic!("expected comparison, got {:?}", other),
    }
}

#[test]
fn test_string_equality_stays_direct() {
    let expr = parse_with_it(types::STRING.clone(), "it == \"x\"");
    assert!(matches!(expr, Expr::Binary { op: BinaryOp::Equal, .. }));
}

#[test]
fn test_concat_via_amp_and_plus() {
    for input in ["it & 1", "it + 1", "1 + it"] {
        let expr = parse_with_it(types::STRING.clone(), input);
        match expr {
            Expr::Call { target: CallTarget::Static(owner), method, ty, .. } => {
                assert_eq!(owner.name(), "String");
                assert_eq!(method, "Concat");
                assert_eq!(ty, *types::STRING);
            }
            other => panic!("expected Concat for {:?}, got {:?}", input, other),
        }
    }
}

// ============================================================================
// Type tests, casts, conversions
// ============================================================================

#[test]
fn test_is_and_as() {
    let params = [Parameter::new("resource", types::OBJECT.clone())];
    let expr = Parser::with_context("resource is System.String", &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .unwrap();
    match expr {
        Expr::TypeIs { target, .. } => assert_eq!(target, *types::STRING),
        other => panic!("expected a type test, got {:?}", other),
    }

    let expr = Parser::with_context("(resource as System.String).Length", &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .unwrap();
    assert_eq!(expr.ty(), &*types::INT32);
}

#[test]
fn test_as_requires_reference_or_nullable() {
    let params = [Parameter::new("resource", types::OBJECT.clone())];
    let err = Parser::with_context("resource as Int32", &params, vec![], &[])
        .and_then(|mut p| p.parse(None))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CannotConvertValue { .. }));
}

#[test]
fn test_conversion_style_calls() {
    let expr = parse_with_it(types::INT32.clone(), "Double(it)");
    match expr {
        Expr::Convert { ty, checked, .. } => {
            assert_eq!(ty, *types::DOUBLE);
            assert!(checked);
        }
        other => panic!("expected a conversion, got {:?}", other),
    }

    let err = parse_with_err(types::STRING.clone(), "Int32(it)");
    assert!(matches!(err.kind, ErrorKind::CannotConvertValue { .. }));
}

#[test]
fn test_nullable_type_syntax() {
    let expr = parse_with_it(types::INT32.clone(), "Int32?(it)");
    assert_eq!(expr.ty().name(), "Int32?");

    let err = parse_err("String?(\"x\")");
    assert!(matches!(err.kind, ErrorKind::TypeHasNoNullableForm(_)));
}

#[test]
fn test_constructor_resolution() {
    let point = ClassDef::new("Point")
        .with_constructor(vec![types::INT32.clone(), types::INT32.clone()])
        .into_type();
    let expr = parse(None, "Point(1, 2)", &[point.clone()], vec![]).unwrap();
    match expr {
        Expr::New { ty, args } => {
            assert_eq!(ty, point);
            assert_eq!(args.len(), 2);
        }
        other => panic!("expected a constructor call, got {:?}", other),
    }

    let err = parse(None, "Point(1, 2, 3)", &[point], vec![]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NoMatchingConstructor(_)));
}

// ============================================================================
// Enums
// ============================================================================

fn my_enum() -> TypeRef {
    EnumDef::new("MyEnum", vec![("Yes", 0), ("No", 1)])
}

#[test]
fn test_enum_member_access() {
    let expr = parse(None, "MyEnum.Yes", &[my_enum()], vec![]).unwrap();
    match expr {
        Expr::Constant { value: Value::Enum { member, value, .. }, .. } => {
            assert_eq!(member, "Yes");
            assert_eq!(value, 0);
        }
        other => panic!("expected an enum constant, got {:?}", other),
    }
}

#[test]
fn test_enum_member_lookup_is_case_insensitive() {
    let expr = parse(None, "MyEnum.yes", &[my_enum()], vec![]).unwrap();
    match expr {
        Expr::Constant { value: Value::Enum { member, .. }, .. } => assert_eq!(member, "Yes"),
        other => panic!("expected an enum constant, got {:?}", other),
    }
}

#[test]
fn test_enum_compares_against_numeric_scope() {
    for it_type in [types::INT32.clone(), types::INT64.clone()] {
        let params = [Parameter::anonymous(it_type.clone())];
        let expr = Parser::with_context("it == MyEnum.Yes", &params, vec![], &[my_enum()])
            .and_then(|mut p| p.parse(None))
            .unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Equal, right, ty, .. } => {
                assert_eq!(ty, *types::BOOL);
                // The enum constant converts toward the scope's type
                match *right {
                    Expr::Convert { ref ty, checked, .. } => {
                        assert_eq!(*ty, it_type);
                        assert!(checked);
                    }
                    ref other => panic!("expected a conversion, got {:?}", other),
                }
            }
            other => panic!("expected equality, got {:?}", other),
        }
    }
}

#[test]
fn test_string_literal_promotes_to_enum() {
    let params = [Parameter::anonymous(my_enum())];
    let expr = Parser::with_context("it == \"no\"", &params, vec![], &[my_enum()])
        .and_then(|mut p| p.parse(None))
        .unwrap();
    match expr {
        Expr::Binary { right, .. } => match *right {
            Expr::Constant { value: Value::Enum { ref member, value, .. }, .. } => {
                assert_eq!(member, "No");
                assert_eq!(value, 1);
            }
            ref other => panic!("expected an enum constant, got {:?}", other),
        },
        other => panic!("expected equality, got {:?}", other),
    }
}

// ============================================================================
// Iteration scopes and aggregates
// ============================================================================

#[test]
fn test_it_requires_scope() {
    let err = parse_err("it");
    assert_eq!(err.kind, ErrorKind::NoItInScope);
}

#[test]
fn test_where_aggregate() {
    let expr = parse_with_it(TypeRef::array_of(types::INT32.clone()), "it.Where(it > 2)");
    match &expr {
        Expr::Call { target: CallTarget::Sequence, method, type_args, args, ty } => {
            assert_eq!(method, "Where");
            assert_eq!(type_args.as_slice(), &[types::INT32.clone()]);
            assert_eq!(args.len(), 2);
            assert!(matches!(args[1], Expr::Lambda { .. }));
            assert_eq!(ty.name(), "Sequence<Int32>");
        }
        other => panic!("expected a sequence call, got {:?}", other),
    }
}

#[test]
fn test_aggregate_bodies_promote() {
    let xs = TypeRef::array_of(types::INT32.clone());
    assert_eq!(parse_with_it(xs.clone(), "it.Sum(it)").ty(), &*types::INT32);
    assert_eq!(parse_with_it(xs.clone(), "it.Average(it)").ty(), &*types::DOUBLE);
    assert_eq!(parse_with_it(xs.clone(), "it.Count()").ty(), &*types::INT32);
    assert_eq!(parse_with_it(xs.clone(), "it.First(it > 1)").ty(), &*types::INT32);
    assert_eq!(parse_with_it(xs, "it.Distinct()").ty().name(), "Sequence<Int32>");
}

#[test]
fn test_sum_over_nullable_elements() {
    let xs = TypeRef::array_of(TypeRef::nullable_of(types::INT32.clone()));
    assert_eq!(parse_with_it(xs, "it.Sum(it)").ty().name(), "Int32?");
}

#[test]
fn test_min_max_carry_selector_type() {
    let xs = TypeRef::array_of(types::STRING.clone());
    let expr = parse_with_it(xs, "it.Max(it.Length)");
    match &expr {
        Expr::Call { method, type_args, ty, .. } => {
            assert_eq!(method, "Max");
            assert_eq!(type_args.as_slice(), &[types::STRING.clone(), types::INT32.clone()]);
            assert_eq!(*ty, *types::INT32);
        }
        other => panic!("expected a sequence call, got {:?}", other),
    }
}

#[test]
fn test_select_and_group_by() {
    let xs = TypeRef::array_of(types::STRING.clone());
    assert_eq!(parse_with_it(xs.clone(), "it.Select(it.Length)").ty().name(), "Sequence<Int32>");
    assert_eq!(
        parse_with_it(xs.clone(), "it.GroupBy(it.Length)").ty().name(),
        "Sequence<Grouping<Int32, String>>"
    );
    // Aggregates chain over grouped sequences
    assert_eq!(parse_with_it(xs, "it.GroupBy(it.Length).Count()").ty(), &*types::INT32);
}

#[test]
fn test_select_many_flattens() {
    let xss = TypeRef::array_of(TypeRef::array_of(types::INT32.clone()));
    assert_eq!(parse_with_it(xss, "it.SelectMany(it)").ty().name(), "Sequence<Int32>");
}

#[test]
fn test_contains_takes_a_plain_argument() {
    let xs = TypeRef::array_of(types::STRING.clone());
    let expr = parse_with_it(xs, "it.Contains(\"a\")");
    match &expr {
        Expr::Call { method, args, ty, .. } => {
            assert_eq!(method, "Contains");
            assert_eq!(*ty, *types::BOOL);
            // No lambda wrapping for Contains
            assert!(matches!(args[1], Expr::Constant { .. }));
        }
        other => panic!("expected a sequence call, got {:?}", other),
    }
}

#[test]
fn test_aggregate_preempts_method_lookup() {
    // `Contains` exists on String instances, but on sequences the
    // aggregate form wins unconditionally
    let xs = TypeRef::sequence_of(types::STRING.clone());
    let expr = parse_with_it(xs, "it.Contains(\"a\")");
    assert!(matches!(expr, Expr::Call { target: CallTarget::Sequence, .. }));
}

#[test]
fn test_string_methods_are_not_aggregates() {
    let expr = parse_with_it(types::STRING.clone(), "it.Contains(\"a\")");
    assert!(matches!(expr, Expr::Call { target: CallTarget::Instance(_), .. }));
}

#[test]
fn test_no_applicable_aggregate() {
    let err = parse_with_err(TypeRef::array_of(types::INT32.clone()), "it.Where(it)");
    assert!(matches!(err.kind, ErrorKind::NoApplicableAggregate(_)));
}

#[test]
fn test_nested_scopes_and_parent_references() {
    let xs = TypeRef::array_of(TypeRef::array_of(types::STRING.clone()));
    // it_1 is the outer array element, it the inner string
    let expr = parse_with_it(xs, "it.Any(it.Any(it_1.Length == it.Length))");
    assert_eq!(expr.ty(), &*types::BOOL);
}

#[test]
fn test_parent_reference_beyond_depth() {
    let xs = TypeRef::array_of(types::STRING.clone());
    let err = parse_with_err(xs, "it.Any(it_2 == \"x\")");
    assert_eq!(err.kind, ErrorKind::NoItInScope);
}

// ============================================================================
// Record construction
// ============================================================================

#[test]
fn test_new_with_alias_and_inferred_names() {
    let params = [Parameter::new("resource", types::STRING.clone())];
    let expr =
        Parser::with_context("new(resource.Length alias Len, resource.Length)", &params, vec![], &[])
            .and_then(|mut p| p.parse(None))
            .unwrap();
    match &expr {
        Expr::MemberInit { bindings, .. } => {
            assert_eq!(bindings.len(), 2);
            assert_eq!(bindings[0].0, "Len");
            assert_eq!(bindings[1].0, "Length");
        }
        other => panic!("expected record construction, got {:?}", other),
    }
}

#[test]
fn test_new_requires_alias_for_computed_elements() {
    let err = parse_err("new(1 + 2)");
    assert_eq!(err.kind, ErrorKind::MissingAsClause);
}

#[test]
fn test_same_shape_yields_the_same_record_type() {
    let params = [Parameter::new("resource", types::STRING.clone())];
    let parse_record = || {
        Parser::with_context("new(resource.Length alias Len)", &params, vec![], &[])
            .and_then(|mut p| p.parse(None))
            .unwrap()
    };
    let first = parse_record();
    let second = parse_record();
    assert_eq!(first.ty(), second.ty());
}

// ============================================================================
// Orderings
// ============================================================================

#[test]
fn test_ordering_clauses() {
    let orderings =
        parse_ordering(types::STRING.clone(), "Length desc, it ascending, it", &[], vec![])
            .unwrap();
    assert_eq!(orderings.len(), 3);
    assert!(!orderings[0].ascending);
    assert!(orderings[1].ascending);
    assert!(orderings[2].ascending);
    assert_eq!(orderings[0].selector.ty(), &*types::INT32);
}

// ============================================================================
// Top-level result typing and trailing input
// ============================================================================

#[test]
fn test_result_type_promotion_is_exact() {
    let double = types::DOUBLE.clone();
    let expr = parse(Some(&double), "1 + 1", &[], vec![]).unwrap();
    assert_eq!(expr.ty(), &double);

    let err = parse(Some(&types::STRING.clone()), "1 + 1", &[], vec![]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ExpressionTypeMismatch(_)));
}

#[test]
fn test_trailing_tokens_are_a_syntax_error() {
    let err = parse_err("1 2");
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    assert_eq!(err.position, 2);
}

#[test]
fn test_missing_operand_position() {
    let err = parse_err("1 +");
    assert_eq!(err.kind, ErrorKind::ExpressionExpected);
    assert_eq!(err.position, 3);
}

#[test]
fn test_unbalanced_paren() {
    let err = parse_err("(1 + 2");
    assert_eq!(err.kind, ErrorKind::CloseParenOrOperatorExpected);
}

// ============================================================================
// Nullable operands
// ============================================================================

#[test]
fn test_nullable_equality_with_null() {
    let nullable = TypeRef::nullable_of(types::INT32.clone());
    let expr = parse_with_it(nullable.clone(), "it == null");
    match expr {
        Expr::Binary { op: BinaryOp::Equal, right, .. } => match *right {
            Expr::Constant { value: Value::Null, ref ty, .. } => assert_eq!(*ty, nullable),
            ref other => panic!("expected a typed null, got {:?}", other),
        },
        other => panic!("expected equality, got {:?}", other),
    }
}

#[test]
fn test_nullable_arithmetic_lifts_both_sides() {
    let nullable = TypeRef::nullable_of(types::INT32.clone());
    let expr = parse_with_it(nullable.clone(), "it + 1");
    assert_eq!(expr.ty(), &nullable);
}

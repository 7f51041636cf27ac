//! Overload resolution over candidate parameter lists.
//!
//! One machine serves methods, indexers, constructors, the aggregate table,
//! and the operator signature sets: a candidate is applicable when its
//! arity matches and every argument promotes (non-exactly) to its parameter
//! type; applicable candidates are then ranked by the better-conversion
//! rule, argument position by argument position.

use crate::ast::Expr;
use crate::promote::Promoter;
use crate::types::{is_compatible_with, TypeRef};

/// Outcome of resolving a call site.
#[derive(Debug)]
pub enum Resolution {
    /// Exactly one best candidate; `args` holds the promoted arguments
    Matched { index: usize, args: Vec<Expr> },
    NoMatch,
    Ambiguous,
}

struct Applicable<'a> {
    index: usize,
    params: &'a [TypeRef],
    promoted: Vec<Expr>,
}

/// Pick the single best candidate for `args`, if there is one.
pub fn resolve_overloads(
    promoter: &Promoter,
    candidates: &[&[TypeRef]],
    args: &[Expr],
) -> Resolution {
    let mut applicable: Vec<Applicable> = Vec::new();
    for (index, params) in candidates.iter().enumerate() {
        if let Some(promoted) = promote_args(promoter, params, args) {
            applicable.push(Applicable { index, params, promoted });
        }
    }

    if applicable.is_empty() {
        return Resolution::NoMatch;
    }
    if applicable.len() > 1 {
        // Keep candidates that no other candidate beats
        let kept: Vec<usize> = (0..applicable.len())
            .filter(|&m| {
                (0..applicable.len())
                    .all(|n| n == m || !is_better_than(args, &applicable[n], &applicable[m]))
            })
            .collect();
        if kept.len() != 1 {
            return Resolution::Ambiguous;
        }
        let winner = applicable.swap_remove(kept[0]);
        return Resolution::Matched { index: winner.index, args: winner.promoted };
    }

    let winner = applicable.pop().unwrap();
    Resolution::Matched { index: winner.index, args: winner.promoted }
}

fn promote_args(promoter: &Promoter, params: &[TypeRef], args: &[Expr]) -> Option<Vec<Expr>> {
    if params.len() != args.len() {
        return None;
    }
    args.iter()
        .zip(params)
        .map(|(arg, param)| promoter.promote(arg, param, false))
        .collect()
}

/// Is `m` a strictly better fit than `n` for these arguments?
fn is_better_than(args: &[Expr], m: &Applicable, n: &Applicable) -> bool {
    let mut better = false;
    for (i, arg) in args.iter().enumerate() {
        let c = compare_conversions(arg.ty(), &m.params[i], &n.params[i]);
        if c < 0 {
            return false;
        }
        if c > 0 {
            better = true;
        }
    }
    better
}

/// Rank two conversion targets for a source type: positive favors `t1`,
/// negative favors `t2`.
fn compare_conversions(source: &TypeRef, t1: &TypeRef, t2: &TypeRef) -> i32 {
    if t1 == t2 {
        return 0;
    }
    if source == t1 {
        return 1;
    }
    if source == t2 {
        return -1;
    }
    let t1_into_t2 = is_compatible_with(t1, t2);
    let t2_into_t1 = is_compatible_with(t2, t1);
    if t1_into_t2 && !t2_into_t1 {
        // t1 is the narrower target
        return 1;
    }
    if t2_into_t1 && !t1_into_t2 {
        return -1;
    }
    if t1.is_signed_integral() && t2.is_unsigned_integral() {
        return 1;
    }
    if t1.is_unsigned_integral() && t2.is_signed_integral() {
        return -1;
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Parameter;
    use crate::promote::LiteralTable;
    use crate::types;

    fn int_param(name: &str) -> Expr {
        Expr::parameter(Parameter::new(name, types::INT32.clone()))
    }

    #[test]
    fn exact_match_beats_widening() {
        let table = LiteralTable::new();
        let promoter = Promoter::new(&table);
        let int_int = vec![types::INT32.clone(), types::INT32.clone()];
        let dbl_dbl = vec![types::DOUBLE.clone(), types::DOUBLE.clone()];
        let candidates: Vec<&[TypeRef]> = vec![&dbl_dbl, &int_int];

        let args = [int_param("a"), int_param("b")];
        match resolve_overloads(&promoter, &candidates, &args) {
            Resolution::Matched { index, .. } => assert_eq!(index, 1),
            other => panic!("expected a single match, got {:?}", other),
        }
    }

    #[test]
    fn narrower_target_wins() {
        let table = LiteralTable::new();
        let promoter = Promoter::new(&table);
        let long_sig = vec![types::INT64.clone()];
        let dbl_sig = vec![types::DOUBLE.clone()];
        let candidates: Vec<&[TypeRef]> = vec![&dbl_sig, &long_sig];

        let args = [int_param("a")];
        match resolve_overloads(&promoter, &candidates, &args) {
            // Int64 converts into Double but not vice versa
            Resolution::Matched { index, .. } => assert_eq!(index, 1),
            other => panic!("expected a single match, got {:?}", other),
        }
    }

    #[test]
    fn arity_mismatch_is_no_match() {
        let table = LiteralTable::new();
        let promoter = Promoter::new(&table);
        let unary = vec![types::INT32.clone()];
        let candidates: Vec<&[TypeRef]> = vec![&unary];

        let args = [int_param("a"), int_param("b")];
        assert!(matches!(resolve_overloads(&promoter, &candidates, &args), Resolution::NoMatch));
    }
}

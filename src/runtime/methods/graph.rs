//! Graph built-ins: bounded fixpoint recursion and a generalized graph fold

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::runtime::args::Args;
use crate::runtime::coerce::as_i64;
use crate::runtime::environment::EvalContext;
use crate::runtime::error::EvalResult;
use crate::runtime::evaluator::apply_function;
use crate::runtime::methods::{Arity, Method, MethodRegistry};
use crate::runtime::values::Value;

pub fn register(registry: &mut MethodRegistry) {
    registry.register(Rc::new(Recursion));
    registry.register(Rc::new(Traverse));
}

/// `recursion(start, fn, min_depth?, max_depth?)` - repeatedly applies `fn`
/// to the frontier, collecting values whose depth lies in
/// `[min_depth, max_depth]` (`max_depth < 0` is unbounded; the defaults are
/// `0` and `-1`).
///
/// A global seen-set ensures each distinct value is expanded at most once and
/// appears in the result at most once, however many paths reach it, so the
/// walk terminates on cyclic relations.
#[derive(Debug)]
struct Recursion;

impl Method for Recursion {
    fn name(&self) -> &'static str {
        "recursion"
    }

    fn arity(&self) -> Arity {
        Arity::Range(2, 4)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let step = &args[1];
        let min_depth = match args.get(2) {
            Some(v) => as_i64(v)?,
            None => 0,
        };
        let max_depth = match args.get(3) {
            Some(v) => as_i64(v)?,
            None => -1,
        };

        let mut seen: HashSet<Value> = HashSet::new();
        let mut result = Vec::new();

        let mut frontier: Vec<Value> = Vec::new();
        for value in args[0].elements() {
            if !value.is_null() && seen.insert(value.clone()) {
                frontier.push(value);
            }
        }

        let mut depth: i64 = 0;
        while !frontier.is_empty() {
            if depth >= min_depth && (max_depth < 0 || depth <= max_depth) {
                result.extend(frontier.iter().cloned());
            }
            if max_depth >= 0 && depth >= max_depth {
                break;
            }

            let mut next = Vec::new();
            for value in &frontier {
                let expanded = apply_function(step, &Args::some(vec![value.clone()]))?;
                for successor in expanded.elements() {
                    if !successor.is_null() && seen.insert(successor.clone()) {
                        next.push(successor);
                    }
                }
            }
            frontier = next;
            depth += 1;
        }

        Ok(Value::List(result))
    }
}

/// `traverse(root, descend, mapping?, compose?)` - generalized graph fold.
///
/// Pre-order for `mapping(node, parent, last_result)` and
/// `descend(node, parent, last_result)`, post-order for
/// `compose(node_result, child_results, node, parent)`. Results are memoized
/// per node so a revisit (or a cycle) observes the previous result as
/// `last_result`; breaking cycles is the descend function's responsibility,
/// not automatic.
#[derive(Debug)]
struct Traverse;

impl Method for Traverse {
    fn name(&self) -> &'static str {
        "traverse"
    }

    fn arity(&self) -> Arity {
        Arity::Range(2, 4)
    }

    fn can_fold(&self) -> bool {
        false
    }

    fn apply(&self, args: &[Value], _ctx: &mut EvalContext) -> EvalResult<Value> {
        let descend = &args[1];
        let mapping = args.get(2);
        let compose = args.get(3);
        let mut memo: HashMap<Value, Value> = HashMap::new();
        traverse_node(
            args[0].clone(),
            Value::Null,
            descend,
            mapping,
            compose,
            &mut memo,
        )
    }
}

fn traverse_node(
    node: Value,
    parent: Value,
    descend: &Value,
    mapping: Option<&Value>,
    compose: Option<&Value>,
    memo: &mut HashMap<Value, Value>,
) -> EvalResult<Value> {
    let last_result = memo.get(&node).cloned().unwrap_or(Value::Null);

    let node_result = match mapping {
        Some(mapping) => apply_function(
            mapping,
            &Args::some(vec![node.clone(), parent.clone(), last_result.clone()]),
        )?,
        None => node.clone(),
    };
    // Memoize before descending, so a cyclic revisit sees a non-null
    // last_result and the descend function can stop expanding.
    memo.insert(node.clone(), node_result.clone());

    let children = apply_function(
        descend,
        &Args::some(vec![node.clone(), parent.clone(), last_result]),
    )?;

    let mut child_results = Vec::new();
    for child in children.elements() {
        if child.is_null() {
            continue;
        }
        child_results.push(traverse_node(
            child,
            node.clone(),
            descend,
            mapping,
            compose,
            memo,
        )?);
    }

    let final_result = match compose {
        Some(compose) => apply_function(
            compose,
            &Args::some(vec![
                node_result,
                Value::List(child_results),
                node.clone(),
                parent,
            ]),
        )?,
        None => node_result,
    };
    memo.insert(node, final_result.clone());
    Ok(final_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, VarKey};
    use crate::runtime::evaluator::eval;
    use crate::runtime::stubs::StubModel;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn context() -> EvalContext {
        let model = Rc::new(StubModel::new());
        EvalContext::new(model.clone(), model)
    }

    fn registry() -> MethodRegistry {
        MethodRegistry::with_builtins()
    }

    #[test]
    fn recursion_terminates_on_a_self_loop() {
        let mut ctx = context();
        let a = Value::Str("A".to_string());

        // fn(x) = [x]: every value expands to itself.
        let x = VarKey::new("x");
        let self_loop = registry()
            .node("list", vec![Expr::var(&x)])
            .unwrap_or_else(|| panic!("list not registered"));
        let step = Expr::lambda(&x, self_loop);

        let expr = registry()
            .node(
                "recursion",
                vec![Expr::literal(a.clone()), step],
            )
            .unwrap_or_else(|| panic!("recursion not registered"));

        assert_eq!(
            eval(&expr, &mut ctx).ok(),
            Some(Value::List(vec![a])),
        );
    }

    #[test]
    fn recursion_generates_bounded_sequences() {
        let mut ctx = context();
        // 0.recursion(x -> x + 1, 0, 5) = [0, 1, 2, 3, 4, 5]
        let x = VarKey::new("x");
        let step = Expr::lambda(&x, Expr::add(Expr::var(&x), Expr::literal(1i64)));
        let expr = registry()
            .node(
                "recursion",
                vec![
                    Expr::literal(0i64),
                    step,
                    Expr::literal(0i64),
                    Expr::literal(5i64),
                ],
            )
            .unwrap_or_else(|| panic!("recursion not registered"));

        assert_eq!(
            eval(&expr, &mut ctx).ok(),
            Some(Value::List(vec![
                Value::Int(0),
                Value::Float(1.0),
                Value::Float(2.0),
                Value::Float(3.0),
                Value::Float(4.0),
                Value::Float(5.0),
            ]))
        );
    }

    #[test]
    fn recursion_respects_min_depth() {
        let mut ctx = context();
        let x = VarKey::new("x");
        let step = Expr::lambda(&x, Expr::add(Expr::var(&x), Expr::literal(1i64)));
        let expr = registry()
            .node(
                "recursion",
                vec![
                    Expr::literal(0i64),
                    step,
                    Expr::literal(2i64),
                    Expr::literal(3i64),
                ],
            )
            .unwrap_or_else(|| panic!("recursion not registered"));

        assert_eq!(
            eval(&expr, &mut ctx).ok(),
            Some(Value::List(vec![Value::Float(2.0), Value::Float(3.0)]))
        );
    }

    fn tree_node(value: i64, children: Vec<Value>) -> Value {
        let mut map = IndexMap::new();
        map.insert(Value::Str("value".to_string()), Value::Int(value));
        map.insert(Value::Str("children".to_string()), Value::List(children));
        Value::Map(map)
    }

    /// `n -> at($n, key)`
    fn getter(key: &str) -> Expr {
        let n = VarKey::new("n");
        let body = registry()
            .node("at", vec![Expr::var(&n), Expr::literal(key)])
            .unwrap_or_else(|| panic!("at not registered"));
        Expr::lambda(&n, body)
    }

    #[test]
    fn traverse_without_compose_yields_the_root_mapping() {
        let mut ctx = context();

        // descend yields no children (null acts as a constant function), no
        // mapping, no compose: the overall result is the root itself.
        let leaf = tree_node(5, vec![]);
        let expr = registry()
            .node(
                "traverse",
                vec![Expr::literal(leaf.clone()), Expr::null()],
            )
            .unwrap_or_else(|| panic!("traverse not registered"));

        assert_eq!(eval(&expr, &mut ctx).ok(), Some(leaf));
    }

    #[test]
    fn traverse_folds_a_tree_post_order() {
        let mut ctx = context();

        // compose = node_result -> child_results -> node_result + sum(child_results)
        let nr = VarKey::new("nr");
        let cr = VarKey::new("cr");
        let sum_children = registry()
            .node("sum", vec![Expr::var(&cr)])
            .unwrap_or_else(|| panic!("sum not registered"));
        let compose = Expr::lambda(
            &nr,
            Expr::lambda(&cr, Expr::add(Expr::var(&nr), sum_children)),
        );

        let tree = tree_node(5, vec![tree_node(3, vec![]), tree_node(2, vec![tree_node(1, vec![])])]);
        let expr = registry()
            .node(
                "traverse",
                vec![
                    Expr::literal(tree),
                    getter("children"),
                    getter("value"),
                    compose,
                ],
            )
            .unwrap_or_else(|| panic!("traverse not registered"));

        assert_eq!(eval(&expr, &mut ctx).ok(), Some(Value::Float(11.0)));
    }

    #[test]
    fn traverse_revisits_observe_the_memoized_result() {
        let mut ctx = context();

        // descend = n -> last -> (last == null ? [n] : []): expands each
        // node once, then stops. On a self-loop this must terminate because
        // the revisit sees the memoized mapping result.
        let n = VarKey::new("n");
        let p = VarKey::new("p");
        let last = VarKey::new("last");
        let expand_once = Expr::if_else(
            Expr::is_equal(Expr::var(&last), Expr::null()),
            registry()
                .node("list", vec![Expr::var(&n)])
                .unwrap_or_else(|| panic!("list not registered")),
            registry()
                .node("list", vec![])
                .unwrap_or_else(|| panic!("list not registered")),
        );
        let descend = Expr::lambda(&n, Expr::lambda(&p, Expr::lambda(&last, expand_once)));

        let expr = registry()
            .node(
                "traverse",
                vec![Expr::literal("A"), descend],
            )
            .unwrap_or_else(|| panic!("traverse not registered"));

        assert_eq!(
            eval(&expr, &mut ctx).ok(),
            Some(Value::Str("A".to_string()))
        );
    }
}

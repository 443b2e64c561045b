//! End-to-end scenarios driving the [`rego_core::interpreter::Interpreter`]
//! facade the way an embedder would: load a module/data document, run a
//! query, and check the rendered result or error. Grounded on the
//! concrete S1-S10 walkthroughs in spec.md's TESTABLE PROPERTIES section
//! and its SPEC_FULL.md supplement, placed under `tests/` the way the
//! teacher keeps its own top-level integration suite separate from the
//! per-module `#[cfg(test)]` blocks.

use indoc::indoc;
use rego_core::error::ErrorCode;
use rego_core::interpreter::{Interpreter, InterpreterConfig};
use rego_core::pipeline::result::QueryResult;
use rego_core::registry::LookupPolicy;

fn new_interpreter() -> Interpreter {
    Interpreter::default()
}

// S1 -- complete rule with a default, input drives which branch wins.
#[test]
fn complete_rule_falls_back_to_its_default() {
    let module = indoc! {r#"
        package p

        default allow = false

        allow {
            input.role == "admin"
        }
    "#};

    let mut interp = new_interpreter();
    interp.add_module("p.rego", module).unwrap();

    interp.set_input(r#"{"role":"admin"}"#).unwrap();
    assert_eq!(interp.query("data.p.allow"), "{\"result\":[{\"expressions\":[true]}]}");

    interp.set_input(r#"{"role":"guest"}"#).unwrap();
    assert_eq!(interp.query("data.p.allow"), "{\"result\":[{\"expressions\":[false]}]}");
}

// S2 -- two definitions of the same object rule disagree on a shared
// key's value: an eval_conflict_error, not a silently-picked winner.
#[test]
fn object_rule_conflict_is_reported_as_an_error() {
    let module = indoc! {r#"
        package p

        r[k] = v { k := "a"; v := 1 }
        r[k] = v { k := "a"; v := 2 }
    "#};

    let mut interp = new_interpreter();
    interp.add_module("p.rego", module).unwrap();

    match interp.raw_query("data.p.r") {
        QueryResult::Errors(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].code, ErrorCode::EvalConflictError);
        }
        other => panic!("expected a conflict error, got {other:?}"),
    }
}

// S3 -- `some x in xs` enumerates: one sub-result per element, not just
// the first.
#[test]
fn enumeration_query_reports_one_sub_result_per_element() {
    let mut interp = new_interpreter();
    interp.add_data(r#"{"xs":[10,20,30]}"#).unwrap();

    match interp.raw_query("some x in data.xs") {
        QueryResult::Defined(subs) => {
            assert_eq!(subs.len(), 3);
            let values: Vec<_> = subs.iter().map(|s| s.bindings[0].1.clone()).collect();
            assert_eq!(
                values,
                vec![
                    rego_core::term::Term::int(10),
                    rego_core::term::Term::int(20),
                    rego_core::term::Term::int(30),
                ]
            );
        }
        other => panic!("expected three enumerated sub-results, got {other:?}"),
    }
}

// S4 -- a comprehension embedded in a complete rule's value.
#[test]
fn comprehension_rule_collects_transformed_elements() {
    let module = "package p\n\nq = [x * 2 | x := data.xs[_]]\n";
    let mut interp = new_interpreter();
    interp.add_module("p.rego", module).unwrap();
    interp.add_data(r#"{"xs":[1,2,3]}"#).unwrap();

    assert_eq!(interp.query("data.p.q"), "{\"result\":[{\"expressions\":[[2,4,6]]}]}");
}

// S5 -- `with input as ...` on a query overrides the value a referenced
// rule itself reads, not just the literal expression it's attached to.
#[test]
fn with_override_reaches_through_a_referenced_rule() {
    let module = "package p\n\na = input.x\n";
    let mut interp = new_interpreter();
    interp.add_module("p.rego", module).unwrap();
    interp.set_input(r#"{"x":1}"#).unwrap();

    assert_eq!(
        interp.query("data.p.a with input as {\"x\":42}"),
        "{\"result\":[{\"expressions\":[42]}]}"
    );
    // the override is scoped to this query; a plain re-run still sees the real input.
    assert_eq!(interp.query("data.p.a"), "{\"result\":[{\"expressions\":[1]}]}");
}

// S6 -- a built-in's error is fatal in strict mode, collapses to
// undefined in lenient mode.
#[test]
fn builtin_error_is_strict_or_lenient_per_config() {
    let mut strict = new_interpreter();
    match strict.raw_query("div(10, 0)") {
        QueryResult::Errors(errors) => assert_eq!(errors[0].code, ErrorCode::EvalBuiltinError),
        other => panic!("expected a strict builtin error, got {other:?}"),
    }

    let mut lenient = Interpreter::new(InterpreterConfig::default().with_strict_builtin_errors(false));
    assert_eq!(lenient.query("div(10, 0)"), "{}");
    // exercise the other add_module path too, for coverage of the lenient config end to end.
    lenient.add_module("p.rego", "package p\n\nok { true }\n").unwrap();
    assert_eq!(lenient.query("data.p.ok"), "{\"result\":[{\"expressions\":[true]}]}");
}

// S7 -- a function rule dispatches by arity and evaluates its body.
#[test]
fn function_rule_computes_from_its_argument() {
    let module = "package p\n\nf(x) = y { y := x * 2 }\n";
    let mut interp = new_interpreter();
    interp.add_module("p.rego", module).unwrap();

    assert_eq!(interp.query("data.p.f(21)"), "{\"result\":[{\"expressions\":[42]}]}");
}

// S8 -- a set rule collects distinct elements.
#[test]
fn set_rule_deduplicates_elements() {
    let module = "package p\n\ns[x] { x := data.xs[_] }\n";
    let mut interp = new_interpreter();
    interp.add_module("p.rego", module).unwrap();
    interp.add_data(r#"{"xs":[1,2,2,3]}"#).unwrap();

    assert_eq!(interp.query("data.p.s"), "{\"result\":[{\"expressions\":[[1,2,3]]}]}");
}

// S9 -- negation over an input field.
#[test]
fn negation_succeeds_when_the_inner_body_is_false() {
    let module = "package p\n\nok { not input.blocked }\n";
    let mut interp = new_interpreter();
    interp.add_module("p.rego", module).unwrap();
    interp.set_input(r#"{"blocked":false}"#).unwrap();

    assert_eq!(interp.query("data.p.ok"), "{\"result\":[{\"expressions\":[true]}]}");

    interp.set_input(r#"{"blocked":true}"#).unwrap();
    assert_eq!(interp.query("data.p.ok"), "{}");
}

// S10 -- a rule that calls itself with no comprehension boundary in
// between is a runtime error, not infinite recursion.
#[test]
fn self_referential_rule_is_a_runtime_error() {
    let module = "package p\n\na { a }\n";
    let mut interp = new_interpreter();
    interp.add_module("p.rego", module).unwrap();

    match interp.raw_query("data.p.a") {
        QueryResult::Errors(errors) => assert_eq!(errors[0].code, ErrorCode::RuntimeError),
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

// Boundary: an empty sequence never satisfies `some x in ...`.
#[test]
fn enumeration_over_an_empty_array_is_undefined() {
    let mut interp = new_interpreter();
    interp.add_data(r#"{"xs":[]}"#).unwrap();
    assert_eq!(interp.query("some x in data.xs"), "{}");
}

// Boundary: an out-of-range array index is a type error, not a panic.
#[test]
fn out_of_range_index_is_a_type_error() {
    let interp = new_interpreter();
    match interp.raw_query("[1, 2, 3][5]") {
        QueryResult::Errors(errors) => assert_eq!(errors[0].code, ErrorCode::EvalTypeError),
        other => panic!("expected a type error, got {other:?}"),
    }
}

// Boundary: a complete rule with no satisfying body and no default is
// undefined, not an error.
#[test]
fn complete_rule_without_a_default_is_undefined_when_its_body_fails() {
    let module = "package p\n\nallow { input.role == \"admin\" }\n";
    let mut interp = new_interpreter();
    interp.add_module("p.rego", module).unwrap();
    interp.set_input(r#"{"role":"guest"}"#).unwrap();

    assert_eq!(interp.query("data.p.allow"), "{}");
}

// A narrowed builtin lookup policy excludes even an otherwise-implemented
// name.
#[test]
fn whitelist_policy_blocks_builtins_outside_the_allowed_set() {
    let mut interp = new_interpreter();
    interp
        .builtins_mut()
        .set_policy(LookupPolicy::Whitelist(["count".to_string()].into_iter().collect()));

    match interp.raw_query("upper(\"x\")") {
        QueryResult::Errors(errors) => assert_eq!(errors[0].code, ErrorCode::EvalBuiltinError),
        other => panic!("expected the policy to block `upper`, got {other:?}"),
    }
    assert_eq!(interp.query("count([1, 2, 3])"), "{\"result\":[{\"expressions\":[3]}]}");
}

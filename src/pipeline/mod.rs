//! The compile pipeline: the fixed, ordered sequence of 28 named passes
//! (spec §4.4) that turns a parsed module/query forest into the final
//! unify-ready form.
//!
//! Grounded on `unify.hh`'s `Pass` ordering table and the individual
//! `src/passes/*.cc` / `src/unify/*.cc` files, each reworked onto the
//! [`crate::rewriter::Pass`] combinator. Each submodule owns one pass and
//! documents which schema it establishes.

pub mod absolute_refs;
pub mod assign;
pub mod compr;
pub mod datarule;
pub mod explicit_enums;
pub mod expand_imports;
pub mod functions;
pub mod implicit_enums;
pub mod infix;
pub mod init;
pub mod lift_query;
pub mod lift_refheads;
pub mod lift_to_rule;
pub mod locals;
pub mod merge_data;
pub mod merge_modules;
pub mod replace_argvals;
pub mod result;
pub mod rulebody;
pub mod rules_to_compr;
pub mod simple_refs;
pub mod skip_refs;
pub mod skips;
pub mod strings;
pub mod symbols;
pub mod varrefheads;

use crate::error::{ErrorCode, RegoError};
use crate::tree::wf::{validate, Schema};
use crate::tree::{Kind, Node};

/// One stage: a rewriter pass plus the schema its output must satisfy.
pub struct Stage {
    pub name: &'static str,
    pub pass: crate::rewriter::Pass,
    pub schema: Schema,
}

/// The ordered pipeline. Construction order here is the spec's 28-step
/// order minus `unifier` (invoked separately by the interpreter facade
/// once the tree reaches its final unify-ready shape, since unification
/// needs the data/input documents and the builtin registry which the
/// pipeline itself does not own).
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            stages: vec![
                Stage { name: "strings", pass: strings::pass(), schema: strings::schema() },
                Stage { name: "merge_data", pass: merge_data::pass(), schema: merge_data::schema() },
                Stage { name: "varrefheads", pass: varrefheads::pass(), schema: varrefheads::schema() },
                Stage { name: "lift_refheads", pass: lift_refheads::pass(), schema: lift_refheads::schema() },
                Stage { name: "symbols", pass: symbols::pass(), schema: symbols::schema() },
                Stage { name: "replace_argvals", pass: replace_argvals::pass(), schema: replace_argvals::schema() },
                Stage { name: "lift_query", pass: lift_query::pass(), schema: lift_query::schema() },
                Stage { name: "expand_imports", pass: expand_imports::pass(), schema: expand_imports::schema() },
                Stage { name: "explicit_enums", pass: explicit_enums::pass(), schema: explicit_enums::schema() },
                Stage { name: "body_locals", pass: locals::body_locals_pass(), schema: locals::schema() },
                Stage { name: "rules_to_compr", pass: rules_to_compr::pass(), schema: rules_to_compr::schema() },
                Stage { name: "compr", pass: compr::pass(), schema: compr::schema() },
                Stage { name: "absolute_refs", pass: absolute_refs::pass(), schema: absolute_refs::schema() },
                Stage { name: "merge_modules", pass: merge_modules::pass(), schema: merge_modules::schema() },
                Stage { name: "datarule", pass: datarule::pass(), schema: datarule::schema() },
                Stage { name: "skips", pass: skips::pass(), schema: skips::schema() },
                Stage { name: "infix", pass: infix::pass(), schema: infix::schema() },
                Stage { name: "assign", pass: assign::pass(), schema: assign::schema() },
                Stage { name: "skip_refs", pass: skip_refs::pass(), schema: skip_refs::schema() },
                Stage { name: "simple_refs", pass: simple_refs::pass(), schema: simple_refs::schema() },
                Stage { name: "init", pass: init::pass(), schema: init::schema() },
                Stage { name: "implicit_enums", pass: implicit_enums::pass(), schema: implicit_enums::schema() },
                Stage { name: "rulebody", pass: rulebody::pass(), schema: rulebody::schema() },
                Stage { name: "lift_to_rule", pass: lift_to_rule::pass(), schema: lift_to_rule::schema() },
                Stage { name: "functions", pass: functions::pass(), schema: functions::schema() },
            ],
        }
    }

    /// Runs every stage in order, validating the post-condition schema
    /// after each. A WF violation is attached as an `Error` node rooted
    /// at the tree (spec §4.3/§7); running continues into later stages
    /// regardless, so sibling diagnostics from later passes still
    /// surface -- actual unification on a tree carrying `Error` nodes is
    /// refused by the interpreter facade (see `src/interpreter.rs`).
    pub fn run(&self, mut tree: Node) -> (Node, Vec<RegoError>) {
        let mut errors = vec![];
        for stage in &self.stages {
            log::debug!("pipeline: running pass {}", stage.name);
            stage.pass.run(&mut tree);
            let violations = validate(&tree, &stage.schema);
            for violation in violations {
                log::warn!("pipeline: pass {} produced a WF violation: {violation}", stage.name);
                errors.push(
                    RegoError::new(violation.to_string(), ErrorCode::WellformedError)
                        .at(stage.name),
                );
            }
        }
        (tree, errors)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared helper: generates a compiler-temporary variable name. Temporaries
/// carry the `$` sigil so the `result` pass (spec §4.4 step 28) can filter
/// them out of user-visible bindings.
pub fn fresh_temp(counter: &mut usize, prefix: &str) -> String {
    *counter += 1;
    format!("$_{prefix}{counter}")
}

pub fn is_temp_name(name: &str) -> bool {
    name.starts_with("$_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn pipeline_runs_every_stage_without_panicking() {
        let tree = Node::with_children(
            Kind::Rego,
            vec![
                Node::with_children(Kind::DataSeq, vec![]),
                Node::with_children(Kind::Input, vec![Node::term(Term::null())]),
                Node::with_children(
                    Kind::ModuleSeq,
                    vec![Node::with_children(
                        Kind::Module,
                        vec![
                            Node::with_children(Kind::Package, vec![Node::var("p")]),
                            Node::with_children(Kind::Policy, vec![]),
                        ],
                    )],
                ),
                Node::with_children(Kind::Query, vec![Node::var("data")]),
            ],
        );
        let pipeline = Pipeline::new();
        let (_out, _errors) = pipeline.run(tree);
    }

    #[test]
    fn fresh_temp_names_are_recognized() {
        let mut counter = 0;
        let name = fresh_temp(&mut counter, "t");
        assert!(is_temp_name(&name));
    }
}

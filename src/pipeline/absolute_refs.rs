//! Pass 14: rewrite every rule reference to its absolute `data.pkg.…`
//! form (spec §4.4 step 14). Must precede `merge_modules` (spec §4.4
//! ordering rationale) since after merging, the originating module of a
//! bare reference can no longer be recovered from tree structure alone.
//!
//! Grounded on `src/unify/absolute_refs.cc`, which walks each module's
//! body looking up bare rule names against that module's own package and
//! rewriting them to the `data`-rooted path.

use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};

fn package_name(module: &Node) -> Option<String> {
    module.find(Kind::Package)?.child(0)?.var_name().map(str::to_string)
}

fn rule_names(policy: &Node) -> Vec<String> {
    policy
        .children
        .iter()
        .filter_map(|rule| rule.find(Kind::Var).and_then(|v| v.var_name()).map(str::to_string))
        .collect()
}

pub fn pass() -> Pass {
    Pass::new("absolute_refs", Strategy::TopDown).once().with_rule(Rule::new(
        "qualify-bare-rule-refs",
        Kind::Module,
        |module| {
            let Some(pkg) = package_name(module) else {
                return RewriteOutcome::NoChange;
            };
            if pkg.starts_with("$query") {
                // The synthetic query module references other packages by
                // their already-absolute `data.…` path; nothing to qualify.
                return RewriteOutcome::NoChange;
            }
            let Some(policy) = module.find(Kind::Policy) else {
                return RewriteOutcome::NoChange;
            };
            let names = rule_names(policy);
            if names.is_empty() {
                return RewriteOutcome::NoChange;
            }
            let mut rewritten = module.clone();
            if let Some(rewritten_policy) = rewritten.children.iter_mut().find(|c| c.kind == Kind::Policy) {
                for rule in rewritten_policy.children.iter_mut() {
                    // Skip the head (first child): it's the rule's own
                    // name being defined, not a reference to qualify.
                    for part in rule.children.iter_mut().skip(1) {
                        part.walk_mut(&mut |n| {
                            if n.kind == Kind::Var {
                                if let Some(name) = n.var_name() {
                                    if names.iter().any(|r| r == name) {
                                        *n = Node::var(format!("data.{pkg}.{name}"));
                                    }
                                }
                            }
                            true
                        });
                    }
                }
            }
            RewriteOutcome::Replace(rewritten)
        },
    ))
}

pub fn schema() -> Schema {
    Schema::new().rule(
        Kind::Rego,
        Shape(vec![
            Slot::One(Kind::DataSeq),
            Slot::One(Kind::Input),
            Slot::One(Kind::ModuleSeq),
            Slot::One(Kind::Query),
        ]),
    )
}

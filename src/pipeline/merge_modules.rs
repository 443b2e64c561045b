//! Pass 15: combine modules sharing a package path into one; flag a
//! rule-name collision across distinct rule kinds as an error
//! (spec §4.4 step 15, invariant 3).
//!
//! Grounded on `src/passes/merge_modules.cc`.

use crate::error::{ErrorCode, RegoError};
use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};
use indexmap::IndexMap;

fn package_name(module: &Node) -> Option<String> {
    module.find(Kind::Package)?.child(0)?.var_name().map(str::to_string)
}

pub fn pass() -> Pass {
    Pass::new("merge_modules", Strategy::TopDown).once().with_rule(Rule::new(
        "merge-same-package-modules",
        Kind::ModuleSeq,
        |seq| {
            let mut groups: IndexMap<String, Vec<Node>> = IndexMap::new();
            for module in &seq.children {
                let pkg = package_name(module).unwrap_or_default();
                groups.entry(pkg).or_default().push(module.clone());
            }
            if groups.values().all(|v| v.len() == 1) {
                return RewriteOutcome::NoChange;
            }
            let mut merged_modules = vec![];
            for (pkg, modules) in groups {
                let mut rule_kinds: IndexMap<String, Kind> = IndexMap::new();
                let mut rules = vec![];
                for module in &modules {
                    if let Some(policy) = module.find(Kind::Policy) {
                        for rule in &policy.children {
                            if let Some(name) = rule.find(Kind::Var).and_then(|v| v.var_name()) {
                                if let Some(prev_kind) = rule_kinds.get(name) {
                                    if *prev_kind != rule.kind {
                                        rules.push(
                                            RegoError::new(
                                                format!(
                                                    "rule {name} in package {pkg} redefined with a different kind"
                                                ),
                                                ErrorCode::RegoTypeError,
                                            )
                                            .into_node(),
                                        );
                                        continue;
                                    }
                                } else {
                                    rule_kinds.insert(name.to_string(), rule.kind);
                                }
                            }
                            rules.push(rule.clone());
                        }
                    }
                }
                merged_modules.push(Node::with_children(
                    Kind::Module,
                    vec![
                        Node::with_children(Kind::Package, vec![Node::var(pkg)]),
                        Node::with_children(Kind::Policy, rules),
                    ],
                ));
            }
            RewriteOutcome::Replace(Node::with_children(Kind::ModuleSeq, merged_modules))
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

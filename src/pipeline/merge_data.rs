//! Pass 2: fold the sequence of data documents into one hierarchical
//! `Data` tree, deep-merging objects by key (spec §4.4 step 2).
//!
//! Grounded on `src/passes/input_data.cc` and `Resolver::object`'s
//! conflict-on-differing-values contract (`include/rego/resolver.h`),
//! reused here via [`crate::term::Term::object`].

use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::term::Term;
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};

fn deep_merge(a: Term, b: Term) -> Term {
    match (a, b) {
        (Term::Object(left), Term::Object(right)) => {
            let mut merged: Vec<(Term, Term)> = left;
            for (k, v) in right {
                if let Some(existing) = merged.iter_mut().find(|(ek, _)| ek.canonical_key() == k.canonical_key()) {
                    let prev = std::mem::replace(&mut existing.1, Term::null());
                    existing.1 = deep_merge(prev, v);
                } else {
                    merged.push((k, v));
                }
            }
            Term::Object(merged)
        }
        (_, right) => right,
    }
}

pub fn pass() -> Pass {
    Pass::new("merge_data", Strategy::TopDown).once().with_rule(Rule::new(
        "fold-data-seq",
        Kind::DataSeq,
        |node| {
            if node.children.len() <= 1 {
                return RewriteOutcome::NoChange;
            }
            let mut merged = Term::Object(vec![]);
            for data in &node.children {
                if let Some(term) = data.find(Kind::Term).and_then(|n| n.as_term()) {
                    merged = deep_merge(merged, term.clone());
                }
            }
            let data_node = Node::with_children(Kind::Data, vec![Node::term(merged)]);
            RewriteOutcome::Replace(Node::with_children(Kind::DataSeq, vec![data_node]))
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
        .rule(Kind::DataSeq, Shape(vec![Slot::Repeat(Kind::Data)]))
        .rule(Kind::Data, Shape(vec![Slot::One(Kind::Term)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_two_objects_by_key() {
        let a = Term::object(vec![(Term::str("x"), Term::int(1))], false).unwrap();
        let b = Term::object(vec![(Term::str("y"), Term::int(2))], false).unwrap();
        let merged = deep_merge(a, b);
        assert_eq!(merged.canonical_key(), "{\"x\":n:1,\"y\":n:2}");
    }
}

//! The generic pass engine: applies a set of pattern→action rules to a
//! tree under a chosen traversal strategy, producing a new tree.
//!
//! Grounded on the pass/rule model implied throughout `unify.hh`/the
//! `src/passes/*.cc` and `src/unify/*.cc` files of the source -- each
//! compile stage there is a Trieste `PassDef` of `(pattern, effect)`
//! rewrite rules applied top-down or bottom-up over the tree. This module
//! is the Rust-idiomatic equivalent: rules are plain closures rather than
//! Trieste's token-algebra macros.

use crate::tree::{Kind, Node};

/// Which order a [`Pass`] walks the tree in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Visit a node before its children; a rewrite of a node is itself
    /// revisited under its replacement unless the pass is `once`.
    TopDown,
    /// Visit a node's children before the node itself (post-order).
    BottomUp,
}

/// The result of attempting to fire a rule's action against a matched
/// node.
pub enum RewriteOutcome {
    /// The rule declined to fire; try the next rule.
    NoChange,
    /// Replace the matched node with this subtree.
    Replace(Node),
    /// Replace the matched node with `replacement`, and additionally
    /// splice `lifted` in as a new child of the nearest enclosing
    /// ancestor of kind `target`. Mirrors the source's `Lift` node.
    Lift {
        replacement: Node,
        lifted: Node,
        target: Kind,
    },
}

type Predicate = Box<dyn Fn(&Node) -> bool>;
type Action = Box<dyn Fn(&Node) -> RewriteOutcome>;

/// A single `(pattern, action)` rewrite rule.
pub struct Rule {
    name: &'static str,
    kind: Kind,
    predicate: Option<Predicate>,
    action: Action,
}

impl Rule {
    pub fn new(name: &'static str, kind: Kind, action: impl Fn(&Node) -> RewriteOutcome + 'static) -> Self {
        Rule {
            name,
            kind,
            predicate: None,
            action: Box::new(action),
        }
    }

    pub fn with_predicate(
        name: &'static str,
        kind: Kind,
        predicate: impl Fn(&Node) -> bool + 'static,
        action: impl Fn(&Node) -> RewriteOutcome + 'static,
    ) -> Self {
        Rule {
            name,
            kind,
            predicate: Some(Box::new(predicate)),
            action: Box::new(action),
        }
    }

    fn matches(&self, node: &Node) -> bool {
        node.kind == self.kind && self.predicate.as_ref().is_none_or(|p| p(node))
    }
}

/// A named collection of rules sharing one traversal strategy.
pub struct Pass {
    pub name: &'static str,
    pub strategy: Strategy,
    /// Each node is matched against a rule at most once per pass run.
    pub once: bool,
    pub rules: Vec<Rule>,
}

impl Pass {
    pub fn new(name: &'static str, strategy: Strategy) -> Self {
        Pass {
            name,
            strategy,
            once: false,
            rules: vec![],
        }
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Runs the pass to a fixed point (no rule fires) and returns whether
    /// anything changed. Bounds iteration at `rules.len() * 64 + 256` so a
    /// buggy non-confluent rule set can't loop forever; exceeding the budget
    /// just stops at whatever fixed point has been reached so far and logs a
    /// warning -- a later WF check against the pass's target schema is what
    /// actually catches a pass that didn't converge (`runtime_error` stays
    /// reserved for unifier instability, not compiler bugs).
    pub fn run(&self, tree: &mut Node) -> bool {
        let mut any_changed = false;
        let budget = self.rules.len().max(1) * 64 + 256;
        let mut converged = false;
        for _ in 0..budget {
            let mut matched_once: Vec<bool> = vec![false; 0];
            let changed = self.run_once(tree, &mut matched_once);
            if changed {
                any_changed = true;
            }
            if !changed || self.once {
                converged = true;
                break;
            }
        }
        if !converged {
            log::warn!("pass {}: did not converge within iteration budget {budget}", self.name);
        }
        any_changed
    }

    fn run_once(&self, node: &mut Node, _matched: &mut Vec<bool>) -> bool {
        let mut ancestors: Vec<(Kind, Vec<Node>)> = vec![];
        self.walk(node, &mut ancestors)
    }

    fn fire(&self, node: &Node) -> Option<RewriteOutcome> {
        for rule in &self.rules {
            if rule.matches(node) {
                match (rule.action)(node) {
                    RewriteOutcome::NoChange => continue,
                    other => return Some(other),
                }
            }
        }
        None
    }

    fn walk(&self, node: &mut Node, ancestors: &mut Vec<(Kind, Vec<Node>)>) -> bool {
        let mut changed = false;

        if self.strategy == Strategy::TopDown {
            changed |= self.try_fire(node, ancestors);
        }

        ancestors.push((node.kind, vec![]));
        for child in node.children.iter_mut() {
            changed |= self.walk(child, ancestors);
        }
        let (_, lifted) = ancestors.pop().expect("frame pushed above");
        node.children.extend(lifted);

        if self.strategy == Strategy::BottomUp {
            changed |= self.try_fire(node, ancestors);
        }

        changed
    }

    fn try_fire(&self, node: &mut Node, ancestors: &mut [(Kind, Vec<Node>)]) -> bool {
        match self.fire(node) {
            Some(RewriteOutcome::Replace(new_node)) => {
                *node = new_node;
                true
            }
            Some(RewriteOutcome::Lift {
                replacement,
                lifted,
                target,
            }) => {
                *node = replacement;
                if let Some(frame) = ancestors.iter_mut().rev().find(|(k, _)| *k == target) {
                    frame.1.push(lifted);
                } else {
                    log::warn!(
                        "pass {}: no enclosing ancestor of kind {target:?} to lift into",
                        self.name
                    );
                }
                true
            }
            Some(RewriteOutcome::NoChange) | None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn top_down_replaces_matched_kind() {
        let mut tree = Node::with_children(
            Kind::Policy,
            vec![Node::with_children(Kind::Expr, vec![Node::term(Term::int(1))])],
        );
        let pass = Pass::new("bump", Strategy::TopDown).with_rule(Rule::new(
            "bump-int",
            Kind::Term,
            |n| match n.as_term().and_then(|t| t.as_scalar()) {
                Some(crate::term::Scalar::Int(_)) => RewriteOutcome::Replace(Node::term(Term::int(2))),
                _ => RewriteOutcome::NoChange,
            },
        ));
        pass.run(&mut tree);
        let bumped = &tree.children[0].children[0];
        assert_eq!(bumped.as_term(), Some(&Term::int(2)));
    }

    #[test]
    fn lift_inserts_into_named_ancestor() {
        let mut tree = Node::with_children(
            Kind::Module,
            vec![Node::with_children(
                Kind::Policy,
                vec![Node::with_children(Kind::Expr, vec![Node::var("x")])],
            )],
        );
        let pass = Pass::new("hoist", Strategy::BottomUp).once().with_rule(Rule::new(
            "hoist-var",
            Kind::Expr,
            |n| RewriteOutcome::Lift {
                replacement: Node::var("placeholder"),
                lifted: Node::with_children(Kind::RuleComp, vec![n.children[0].clone()]),
                target: Kind::Module,
            },
        ));
        pass.run(&mut tree);
        assert!(tree.children.iter().any(|c| c.kind == Kind::RuleComp));
    }
}

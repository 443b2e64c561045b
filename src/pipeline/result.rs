//! Pass 28: project the final binding sequence into user-visible form,
//! discarding compiler temporaries (spec §4.4 step 28, §6.2).
//!
//! Unlike the other pipeline stages, this one runs *after* the unifier
//! (spec §4.4 ordering: unifier is step 27), against the unify result
//! rather than the pre-unify tree, so it's invoked directly by
//! [`crate::interpreter::Interpreter`] rather than wired into
//! [`super::Pipeline`]. Grounded on `src/interpreter.cc`'s
//! `Interpreter::query`, which performs exactly this projection before
//! rendering JSON.

use crate::error::{collect_errors, RegoError};
use crate::pipeline::is_temp_name;
use crate::term::Term;

/// One sub-result: the query's expression value plus any user-visible
/// bindings produced alongside it (spec §6.2).
#[derive(Debug, Clone, PartialEq)]
pub struct SubResult {
    pub expressions: Vec<Term>,
    pub bindings: Vec<(String, Term)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Defined(Vec<SubResult>),
    Undefined,
    Errors(Vec<RegoError>),
}

/// Builds the final [`QueryResult`] from every solution the unifier
/// found for the query body (spec §6.2: a query with several satisfying
/// branches -- e.g. one that enumerates -- reports one sub-result per
/// branch, not just the first). Each entry is that branch's expression
/// value paired with every Local binding produced alongside it, before
/// compiler temporaries are filtered out.
pub fn project(
    solutions: Vec<(Term, Vec<(String, Term)>)>,
    error_root: Option<&crate::tree::Node>,
) -> QueryResult {
    if let Some(root) = error_root {
        let errors = collect_errors(root);
        if !errors.is_empty() {
            return QueryResult::Errors(errors);
        }
    }
    if solutions.is_empty() {
        return QueryResult::Undefined;
    }
    let sub_results = solutions
        .into_iter()
        .map(|(value, raw_bindings)| SubResult {
            expressions: vec![value],
            bindings: raw_bindings.into_iter().filter(|(name, _)| !is_temp_name(name)).collect(),
        })
        .collect();
    QueryResult::Defined(sub_results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_compiler_temporaries_from_bindings() {
        let result = project(
            vec![(
                Term::bool(true),
                vec![("$_assign1".to_string(), Term::int(1)), ("x".to_string(), Term::int(2))],
            )],
            None,
        );
        match result {
            QueryResult::Defined(subs) => {
                assert_eq!(subs[0].bindings.len(), 1);
                assert_eq!(subs[0].bindings[0].0, "x");
            }
            _ => panic!("expected defined result"),
        }
    }

    #[test]
    fn no_solutions_is_undefined() {
        assert_eq!(project(vec![], None), QueryResult::Undefined);
    }

    #[test]
    fn multiple_solutions_produce_one_sub_result_each() {
        let result = project(
            vec![
                (Term::int(10), vec![("x".to_string(), Term::int(10))]),
                (Term::int(20), vec![("x".to_string(), Term::int(20))]),
            ],
            None,
        );
        match result {
            QueryResult::Defined(subs) => assert_eq!(subs.len(), 2),
            _ => panic!("expected defined result"),
        }
    }
}

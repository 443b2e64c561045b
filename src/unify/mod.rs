//! The unification engine (spec §4.5): solves a compiled rule body
//! against input/data, producing the set of bindings and the rule's
//! projected output Term.
//!
//! Grounded on `src/unify/unify.cc` and `include/rego/unify.hh`'s
//! overall algorithm (bind -> dependency order -> execution pass ->
//! retry -> prune -> project), reworked from an iterative worklist over
//! a single mutable `Variable` table into a recursive list-of-solutions
//! evaluator: each statement maps one live environment branch to zero or
//! more successor branches, so a multi-valued bind (enumeration, a
//! multi-valued reference) is modeled as branching rather than as a
//! per-variable growing value-set mutated across passes. This trades
//! the source's explicit dependency-DAG scheduler for recursion
//! following each statement's position in program order, which this
//! crate's narrowed pipeline already keeps dependency-correct (`init`
//! only ever sees initializer assignments, per `pipeline::init`'s
//! design note) -- so an explicit reordering pass over live bindings has
//! no remaining cycles to break.

use crate::error::{ErrorCode, RegoError};
use crate::registry::{BuiltinOutcome, BuiltinRegistry};
use crate::resolver::{self, Access};
use crate::term::Term;
use crate::tree::{Kind, Node};
use indexmap::IndexMap;
use std::cell::RefCell;

pub type Env = IndexMap<String, Term>;
type RResult<T> = Result<T, RegoError>;

/// Per spec.md §4.5's "Open Questions" supplement (SPEC_FULL.md §4.5):
/// an internal three-way status needed to implement the prune rule (an
/// empty Value set is `Undefined`, not `Invalid`) precisely; collapsed
/// back to the binary valid/invalid vocabulary by [`QueryEngine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableStatus {
    Undefined,
    Invalid,
    Defined,
}

fn type_error(message: impl Into<String>) -> RegoError {
    RegoError::new(message, ErrorCode::EvalTypeError)
}

/// An index of every rule definition in the compiled tree, keyed by its
/// absolute `data.…` name (spec §4.6's `resolve_rule` dispatch target).
/// Built once after the compile pipeline finishes; the unifier looks
/// rules up here instead of walking `ModuleSeq` per reference.
pub struct Program {
    rules: IndexMap<String, Vec<Node>>,
}

impl Program {
    pub fn from_tree(root: &Node) -> Self {
        let mut rules: IndexMap<String, Vec<Node>> = IndexMap::new();
        if let Some(modules) = root.find(Kind::ModuleSeq) {
            for module in &modules.children {
                let Some(pkg) = module.find(Kind::Package).and_then(|p| p.child(0)).and_then(|v| v.var_name()) else {
                    continue;
                };
                let Some(policy) = module.find(Kind::Policy) else {
                    continue;
                };
                for rule in &policy.children {
                    let Some(name) = rule.child(0).and_then(|v| v.var_name()) else {
                        continue;
                    };
                    let absolute = format!("data.{pkg}.{name}");
                    rules.entry(absolute).or_default().push(rule.clone());
                }
            }
        }
        Program { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// RAII guard for a pushed `with`-override frame (spec §9's "Resource
/// scoping" design note: frames are strictly stacked and popped on every
/// exit path, including an early error return). Popped on drop rather
/// than by an explicit call, so a `?` inside the scoped evaluation still
/// unwinds the frame correctly.
struct OverrideGuard<'a> {
    stack: &'a RefCell<Vec<Env>>,
}

impl<'a> Drop for OverrideGuard<'a> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

/// Evaluates compiled rule bodies against a fixed data/input pair and a
/// built-in registry (spec §4.5's "Inputs").
pub struct QueryEngine<'a> {
    program: &'a Program,
    registry: &'a BuiltinRegistry,
    data: Term,
    input: Term,
    call_stack: RefCell<Vec<String>>,
    /// Stack of `with`-override scopes (spec §4.5's `with` semantics):
    /// the innermost frame shadows `input`/`data` lookups for every
    /// evaluation nested inside it, including a referenced rule's own
    /// body -- shared engine-level state rather than a threaded
    /// parameter, since a rule call doesn't otherwise carry its caller's
    /// lexical scope.
    overrides: RefCell<Vec<Env>>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(program: &'a Program, registry: &'a BuiltinRegistry, data: Term, input: Term) -> Self {
        QueryEngine {
            program,
            registry,
            data,
            input,
            call_stack: RefCell::new(vec![]),
            overrides: RefCell::new(vec![]),
        }
    }

    /// Resolves `entry` (an absolute rule name, typically
    /// `data.$query.$result`) to its projected value, or `None` if the
    /// rule is undefined. Errors raised mid-evaluation are returned
    /// alongside rather than discarded, matching spec §7's contract that
    /// a query can report both a value and errors only when the errors
    /// are non-fatal to every branch; here any `Err` aborts evaluation
    /// entirely, so `errors` is at most one entry (this crate does not
    /// attempt partial-result recovery after an internal error).
    pub fn run(&self, entry: &str) -> (Option<Term>, Vec<RegoError>) {
        match self.resolve_rule_value(entry) {
            Ok(value) => (value, vec![]),
            Err(err) => (None, vec![err]),
        }
    }

    fn enter(&self, name: &str) -> RResult<()> {
        let mut stack = self.call_stack.borrow_mut();
        if stack.iter().any(|n| n == name) {
            return Err(RegoError::new(
                format!("recursion detected resolving {name} without a comprehension boundary"),
                ErrorCode::RuntimeError,
            ));
        }
        stack.push(name.to_string());
        Ok(())
    }

    fn exit(&self) {
        self.call_stack.borrow_mut().pop();
    }

    fn overrides_get(&self, name: &str) -> Option<Term> {
        self.overrides.borrow().last().and_then(|scope| scope.get(name).cloned())
    }

    fn push_overrides(&self, scoped: Env) -> OverrideGuard<'_> {
        self.overrides.borrow_mut().push(scoped);
        OverrideGuard { stack: &self.overrides }
    }

    /// Resolves the synthetic query rule `lift_query` installs
    /// (`data.$query.$result`, a bare `RuleComp(name, body)` with no
    /// value expression -- a query's value is just whether its body is
    /// satisfied). Unlike [`Self::resolve_rule_value`], this returns
    /// every solution branch's bindings, one per satisfying combination
    /// of enumerations/`some` the body ran through -- `result::project`
    /// turns each into its own [`crate::pipeline::result::SubResult`].
    pub fn run_query(&self, entry: &str) -> (Vec<(Term, Vec<(String, Term)>)>, Vec<RegoError>) {
        match self.resolve_query(entry) {
            Ok(solutions) => (solutions, vec![]),
            Err(err) => (vec![], vec![err]),
        }
    }

    fn resolve_query(&self, name: &str) -> RResult<Vec<(Term, Vec<(String, Term)>)>> {
        let Some(defs) = self.program.rules.get(name) else {
            return Ok(vec![]);
        };
        let Some(def) = defs.first() else {
            return Ok(vec![]);
        };
        let body = def.child(1).ok_or_else(|| type_error("malformed query rule"))?;
        self.enter(name)?;
        let result = self.resolve_query_body(body, Env::new());
        self.exit();
        result
    }

    /// A query body is either a single bare expression -- `lift_query`
    /// + `assign::wrap-naked-expr` turn it into one `UnifyExpr($_assignN,
    /// expr)` statement -- or a statement sequence / `some` enumeration.
    /// Only the former has a real value to report: spec §6.2 projects
    /// that expression's own value (even when falsy), not a hardcoded
    /// `true`, and must not apply the in-rule falsy-pruning rule to it.
    /// A sequence (or an enumeration) instead reports `true` plus
    /// whatever bindings its statements produced, each satisfying branch
    /// as its own entry. A `with` override wrapping a single bare
    /// expression is transparent to this distinction.
    fn resolve_query_body(&self, body: &Node, env: Env) -> RResult<Vec<(Term, Vec<(String, Term)>)>> {
        if let [stmt] = body.children.as_slice() {
            match stmt.kind {
                Kind::UnifyExpr => {
                    let var = stmt.child(0).and_then(|v| v.var_name()).unwrap_or("_");
                    if crate::pipeline::is_temp_name(var) {
                        let expr = stmt.child(1).ok_or_else(|| type_error("malformed unify expression"))?;
                        let values = self.evaluate_expr(expr, &env)?;
                        return Ok(values.into_iter().map(|v| (v, vec![])).collect());
                    }
                }
                Kind::UnifyExprWith => {
                    let inner = stmt.child(0).ok_or_else(|| type_error("malformed with"))?;
                    let withseq = stmt.child(1).ok_or_else(|| type_error("malformed with"))?;
                    let mut scoped = self.overrides.borrow().last().cloned().unwrap_or_default();
                    for entry in &withseq.children {
                        let Some(path) = entry.child(0).and_then(|v| v.var_name()) else { continue };
                        let Some(value_expr) = entry.child(1) else { continue };
                        if let Some(value) = self.evaluate_expr(value_expr, &env)?.into_iter().next() {
                            scoped.insert(path.to_string(), value);
                        }
                    }
                    let _guard = self.push_overrides(scoped);
                    return self.resolve_query_body(inner, env);
                }
                _ => {}
            }
        }
        let (status, envs) = self.solve_body(body, env)?;
        if status != VariableStatus::Defined {
            return Ok(vec![]);
        }
        Ok(envs.into_iter().map(|env| (Term::bool(true), env.into_iter().collect())).collect())
    }

    /// `resolve_rulecomp` / `resolve_ruleset` / `resolve_ruleobj` (spec
    /// §4.6): merges every definition sharing `name`, applying default
    /// rank when every definition is undefined.
    fn resolve_rule_value(&self, name: &str) -> RResult<Option<Term>> {
        let Some(defs) = self.program.rules.get(name) else {
            return Ok(None);
        };
        self.enter(name)?;
        let result = self.resolve_rule_defs(defs);
        self.exit();
        result
    }

    fn resolve_rule_defs(&self, defs: &[Node]) -> RResult<Option<Term>> {
        let (defaults, live): (Vec<&Node>, Vec<&Node>) = defs.iter().partition(|d| d.kind == Kind::DefaultRule);

        let mut set_elements = vec![];
        let mut obj_pairs = vec![];
        let mut complete_values: Vec<Term> = vec![];
        let mut any_set_or_obj = false;

        for def in &live {
            match def.kind {
                Kind::RuleComp if def.children.len() == 2 => {
                    any_set_or_obj = true;
                    let compr = def.child(1).ok_or_else(|| type_error("malformed set/object rule"))?;
                    match compr.kind {
                        Kind::SetCompr => set_elements.extend(self.evaluate_expr(compr, &Env::new())?),
                        Kind::ObjectCompr => {
                            for pair in self.evaluate_object_compr(compr, &Env::new())? {
                                obj_pairs.push(pair);
                            }
                        }
                        _ => return Err(type_error("malformed set/object rule")),
                    }
                }
                Kind::RuleComp => {
                    let value_expr = def.child(1).ok_or_else(|| type_error("rule missing value"))?;
                    let body = def.child(2).ok_or_else(|| type_error("rule missing body"))?;
                    let (status, envs) = self.solve_body(body, Env::new())?;
                    if status == VariableStatus::Defined {
                        for env in envs {
                            for value in self.evaluate_expr(value_expr, &env)? {
                                complete_values.push(value);
                            }
                        }
                    }
                }
                _ => return Err(type_error("unsupported rule kind for bare reference")),
            }
        }

        if any_set_or_obj {
            if !obj_pairs.is_empty() {
                return Term::object(obj_pairs, true).map(Some).map_err(|e| {
                    RegoError::new(e.to_string(), ErrorCode::EvalConflictError)
                });
            }
            return Ok(Some(Term::set(set_elements)));
        }

        if !complete_values.is_empty() {
            let first = &complete_values[0];
            if complete_values.iter().any(|v| v != first) {
                return Err(RegoError::new(
                    "complete rule produced conflicting values",
                    ErrorCode::EvalConflictError,
                ));
            }
            return Ok(Some(first.clone()));
        }

        for default in defaults {
            let value_expr = default.child(1).ok_or_else(|| type_error("default rule missing value"))?;
            if let Some(value) = self.evaluate_expr(value_expr, &Env::new())?.into_iter().next() {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// `resolve_rulefunc` (spec §4.6): binds `ArgVar`s to the call
    /// tuple, solves the body, and evaluates the return expression.
    fn call_function(&self, name: &str, args: &[Term]) -> RResult<Option<Term>> {
        let Some(defs) = self.program.rules.get(name) else {
            return Ok(None);
        };
        self.enter(name)?;
        let result = self.call_function_defs(defs, args);
        self.exit();
        result
    }

    fn call_function_defs(&self, defs: &[Node], args: &[Term]) -> RResult<Option<Term>> {
        let mut results = vec![];
        for def in defs {
            if def.kind != Kind::RuleFunc {
                continue;
            }
            let params = def.child(1).ok_or_else(|| type_error("function missing arguments"))?;
            if params.children.len() != args.len() {
                continue;
            }
            let value_expr = def.child(2).ok_or_else(|| type_error("function missing value"))?;
            let body = def.child(3).ok_or_else(|| type_error("function missing body"))?;

            let mut env = Env::new();
            for (param, arg) in params.children.iter().zip(args) {
                if let Some(name) = param.var_name() {
                    env.insert(name.to_string(), arg.clone());
                }
            }

            let (status, envs) = self.solve_body(body, env)?;
            if status == VariableStatus::Defined {
                for env in envs {
                    results.extend(self.evaluate_expr(value_expr, &env)?);
                }
            }
        }
        if results.is_empty() {
            return Ok(None);
        }
        let first = &results[0];
        if results.iter().any(|v| v != first) {
            return Err(RegoError::new("function produced conflicting values", ErrorCode::EvalConflictError));
        }
        Ok(Some(first.clone()))
    }

    /// Executes every statement of `body` against the branches already
    /// live in `env`, per spec §4.5 step 3's per-statement case list.
    fn solve_body(&self, body: &Node, env: Env) -> RResult<(VariableStatus, Vec<Env>)> {
        let mut branches = vec![env];
        let mut invalidated = false;

        for stmt in &body.children {
            if branches.is_empty() {
                break;
            }
            let mut next = vec![];
            for branch in branches {
                match stmt.kind {
                    Kind::UnifyExpr => {
                        let var = stmt.child(0).and_then(|v| v.var_name()).unwrap_or("_").to_string();
                        let expr = stmt.child(1).ok_or_else(|| type_error("malformed unify expression"))?;
                        // `assign::wrap-naked-expr` (pipeline pass 19) binds every
                        // statement written as a bare expression -- `1 == 1`,
                        // `input.blocked`, a built-in call used for its truth value
                        // -- to a fresh compiler temporary. Real Rego semantics
                        // prune the branch there if the value is falsy; a named
                        // assignment (`x := ...`) never does, so the distinction
                        // is exactly `pipeline::is_temp_name`.
                        let is_truth_test = crate::pipeline::is_temp_name(&var);
                        for value in self.evaluate_expr(expr, &branch)? {
                            if is_truth_test && !value.is_truthy() {
                                continue;
                            }
                            next.push(bind(&branch, &var, value));
                        }
                    }
                    Kind::UnifyExprNot => {
                        let inner = stmt.child(0).ok_or_else(|| type_error("malformed negation"))?;
                        let (inner_status, _) = self.solve_body(inner, branch.clone())?;
                        if inner_status == VariableStatus::Defined {
                            invalidated = true;
                        } else {
                            next.push(branch);
                        }
                    }
                    Kind::UnifyExprWith => {
                        let inner = stmt.child(0).ok_or_else(|| type_error("malformed with"))?;
                        let withseq = stmt.child(1).ok_or_else(|| type_error("malformed with"))?;
                        let mut scoped = self.overrides.borrow().last().cloned().unwrap_or_default();
                        for entry in &withseq.children {
                            let Some(path) = entry.child(0).and_then(|v| v.var_name()) else { continue };
                            let Some(value_expr) = entry.child(1) else { continue };
                            if let Some(value) = self.evaluate_expr(value_expr, &branch)?.into_iter().next() {
                                scoped.insert(path.to_string(), value);
                            }
                        }
                        let (status, envs) = {
                            let _guard = self.push_overrides(scoped);
                            self.solve_body(inner, branch)?
                        };
                        if status == VariableStatus::Defined {
                            next.extend(envs);
                        }
                    }
                    Kind::UnifyExprEnum => {
                        let item_var = stmt.child(1).and_then(|v| v.var_name()).unwrap_or("_").to_string();
                        let seq_expr = stmt.child(2).ok_or_else(|| type_error("malformed enumeration"))?;
                        let inner_body = stmt.child(3).ok_or_else(|| type_error("malformed enumeration"))?;
                        for container in self.evaluate_expr(seq_expr, &branch)? {
                            let items = match resolver::apply_access(&container, None)? {
                                Access::Many(items) => items,
                                Access::One(item) => vec![item],
                            };
                            for item in items {
                                let seeded = bind(&branch, &item_var, item);
                                let (status, envs) = self.solve_body(inner_body, seeded)?;
                                if status == VariableStatus::Defined {
                                    next.extend(envs);
                                }
                            }
                        }
                    }
                    _ => next.push(branch),
                }
            }
            branches = next;
        }

        let status = if !branches.is_empty() {
            VariableStatus::Defined
        } else if invalidated {
            VariableStatus::Invalid
        } else {
            VariableStatus::Undefined
        };
        Ok((status, branches))
    }

    /// The general expression evaluator: every syntactic expression form
    /// produces a multiset of candidate Values (spec §4.5 step 3's
    /// "result is a multiset of Values").
    fn evaluate_expr(&self, node: &Node, env: &Env) -> RResult<Vec<Term>> {
        match node.kind {
            Kind::Expr => {
                let Some(inner) = node.child(0) else {
                    return Ok(vec![]);
                };
                self.evaluate_expr(inner, env)
            }
            Kind::Term => Ok(node.as_term().cloned().into_iter().collect()),
            Kind::Var => self.evaluate_var(node.var_name().unwrap_or(""), env),
            Kind::Ref => self.evaluate_ref(node, env),
            Kind::ArithInfix => {
                let op = node.child(0).map(|n| n.kind).ok_or_else(|| type_error("malformed arithmetic"))?;
                let lhs = self.evaluate_expr(node.child(1).ok_or_else(|| type_error("malformed arithmetic"))?, env)?;
                let rhs = self.evaluate_expr(node.child(2).ok_or_else(|| type_error("malformed arithmetic"))?, env)?;
                let mut out = vec![];
                for l in &lhs {
                    for r in &rhs {
                        out.push(resolver::arithinfix(op, l, r)?);
                    }
                }
                Ok(out)
            }
            Kind::BoolInfix => {
                let op = node.child(0).map(|n| n.kind).ok_or_else(|| type_error("malformed comparison"))?;
                let lhs = self.evaluate_expr(node.child(1).ok_or_else(|| type_error("malformed comparison"))?, env)?;
                let rhs = self.evaluate_expr(node.child(2).ok_or_else(|| type_error("malformed comparison"))?, env)?;
                let mut out = vec![];
                for l in &lhs {
                    for r in &rhs {
                        out.push(Term::bool(resolver::boolinfix(op, l, r)?));
                    }
                }
                Ok(out)
            }
            Kind::UnaryExpr => {
                let inner = self.evaluate_expr(node.child(1).ok_or_else(|| type_error("malformed unary expression"))?, env)?;
                inner
                    .into_iter()
                    .map(|v| resolver::arithinfix(Kind::OpSubtract, &Term::int(0), &v))
                    .collect()
            }
            Kind::Function => self.evaluate_function_call(node, env),
            Kind::Array => {
                let lists: Vec<Vec<Term>> =
                    node.children.iter().map(|c| self.evaluate_expr(c, env)).collect::<RResult<_>>()?;
                Ok(cartesian(&lists).into_iter().map(Term::array).collect())
            }
            Kind::Set => {
                let lists: Vec<Vec<Term>> =
                    node.children.iter().map(|c| self.evaluate_expr(c, env)).collect::<RResult<_>>()?;
                Ok(cartesian(&lists).into_iter().map(Term::set).collect())
            }
            Kind::Object => {
                let mut pair_lists = vec![];
                for item in &node.children {
                    let k_expr = item.child(0).ok_or_else(|| type_error("malformed object item"))?;
                    let v_expr = item.child(1).ok_or_else(|| type_error("malformed object item"))?;
                    let ks = self.evaluate_expr(k_expr, env)?;
                    let vs = self.evaluate_expr(v_expr, env)?;
                    let mut pairs = vec![];
                    for k in &ks {
                        for v in &vs {
                            pairs.push((k.clone(), v.clone()));
                        }
                    }
                    pair_lists.push(pairs);
                }
                Ok(cartesian(&pair_lists)
                    .into_iter()
                    .map(|items| Term::object(items, false).unwrap_or(Term::Object(vec![])))
                    .collect())
            }
            Kind::ArrayCompr => {
                let elem_expr = node.child(0).ok_or_else(|| type_error("malformed comprehension"))?;
                let body = node.child(1).ok_or_else(|| type_error("malformed comprehension"))?;
                let (status, envs) = self.solve_body(body, env.clone())?;
                let mut collected = vec![];
                if status == VariableStatus::Defined {
                    for e in envs {
                        collected.extend(self.evaluate_expr(elem_expr, &e)?);
                    }
                }
                Ok(vec![Term::array(collected)])
            }
            Kind::SetCompr => {
                let elem_expr = node.child(0).ok_or_else(|| type_error("malformed comprehension"))?;
                let body = node.child(1).ok_or_else(|| type_error("malformed comprehension"))?;
                let (status, envs) = self.solve_body(body, env.clone())?;
                let mut collected = vec![];
                if status == VariableStatus::Defined {
                    for e in envs {
                        collected.extend(self.evaluate_expr(elem_expr, &e)?);
                    }
                }
                Ok(vec![Term::set(collected)])
            }
            Kind::ObjectCompr => Ok(vec![Term::object(self.evaluate_object_compr(node, env)?, true)
                .map_err(|e| RegoError::new(e.to_string(), ErrorCode::EvalConflictError))?]),
            other => Err(type_error(format!("unsupported expression node {other:?}"))),
        }
    }

    fn evaluate_object_compr(&self, node: &Node, env: &Env) -> RResult<Vec<(Term, Term)>> {
        let key_expr = node.child(0).ok_or_else(|| type_error("malformed comprehension"))?;
        let val_expr = node.child(1).ok_or_else(|| type_error("malformed comprehension"))?;
        let body = node.child(2).ok_or_else(|| type_error("malformed comprehension"))?;
        let (status, envs) = self.solve_body(body, env.clone())?;
        let mut pairs = vec![];
        if status == VariableStatus::Defined {
            for e in envs {
                let keys = self.evaluate_expr(key_expr, &e)?;
                let vals = self.evaluate_expr(val_expr, &e)?;
                for k in &keys {
                    for v in &vals {
                        pairs.push((k.clone(), v.clone()));
                    }
                }
            }
        }
        Ok(pairs)
    }

    fn evaluate_var(&self, name: &str, env: &Env) -> RResult<Vec<Term>> {
        if let Some(value) = self.overrides_get(name) {
            return Ok(vec![value]);
        }
        if name == "input" {
            return Ok(vec![self.input.clone()]);
        }
        if name == "data" {
            return Ok(vec![self.data.clone()]);
        }
        if name == "_" {
            return Ok(vec![]);
        }
        if let Some(value) = env.get(name) {
            return Ok(vec![value.clone()]);
        }
        if name.starts_with("data.") {
            if self.program.rules.contains_key(name) {
                return Ok(self.resolve_rule_value(name)?.into_iter().collect());
            }
            let path: Vec<&str> = name.strip_prefix("data.").unwrap().split('.').collect();
            let mut current = self.data.clone();
            for segment in path {
                match resolver::apply_access(&current, Some(&Term::str(segment)))? {
                    Access::One(v) => current = v,
                    Access::Many(_) => return Err(type_error("wildcard segment in a dotted rule reference")),
                }
            }
            return Ok(vec![current]);
        }
        Ok(vec![])
    }

    fn evaluate_ref(&self, node: &Node, env: &Env) -> RResult<Vec<Term>> {
        // A reference made entirely of dot steps off `data` (no bracket,
        // no wildcard) may name a rule rather than a literal data field
        // -- `data.p.allow` and a JSON document's `data.cfg.limit` share
        // the same namespace, so the rule table takes priority over
        // indexing into the literal data document (see `evaluate_var`).
        if let Some(path) = ref_chain_to_path(node) {
            if path == "data" || path.starts_with("data.") {
                return self.evaluate_var(&path, env);
            }
        }

        let base = node.child(0).ok_or_else(|| type_error("malformed reference"))?;
        let mut bag = self.evaluate_expr(base, env)?;

        for arg in &node.children[1..] {
            let mut next = vec![];
            match arg.kind {
                Kind::RefArgDot => {
                    let field = arg.child(0).and_then(|v| v.var_name()).unwrap_or("");
                    for container in &bag {
                        match resolver::apply_access(container, Some(&Term::str(field)))? {
                            Access::One(v) => next.push(v),
                            Access::Many(items) => next.extend(items),
                        }
                    }
                }
                Kind::RefArgBrack => {
                    let index_expr = arg.child(0).ok_or_else(|| type_error("malformed index"))?;
                    let is_wildcard = index_expr
                        .child(0)
                        .map(|n| n.kind == Kind::Var && n.var_name() == Some("_"))
                        .unwrap_or(false);
                    for container in &bag {
                        if is_wildcard {
                            match resolver::apply_access(container, None)? {
                                Access::Many(items) => next.extend(items),
                                Access::One(v) => next.push(v),
                            }
                        } else {
                            for index in self.evaluate_expr(index_expr, env)? {
                                match resolver::apply_access(container, Some(&index))? {
                                    Access::One(v) => next.push(v),
                                    Access::Many(items) => next.extend(items),
                                }
                            }
                        }
                    }
                }
                _ => return Err(type_error("malformed reference chain")),
            }
            bag = next;
        }
        Ok(bag)
    }

    fn evaluate_function_call(&self, node: &Node, env: &Env) -> RResult<Vec<Term>> {
        let callee = node.child(0).ok_or_else(|| type_error("malformed call"))?;
        let name = callee
            .var_name()
            .map(str::to_string)
            .or_else(|| ref_chain_to_path(callee))
            .ok_or_else(|| type_error("malformed call"))?;
        let name = name.as_str();
        let argseq = node.child(1).ok_or_else(|| type_error("malformed call"))?;
        let arg_lists: Vec<Vec<Term>> =
            argseq.children.iter().map(|c| self.evaluate_expr(c, env)).collect::<RResult<_>>()?;
        let tuples = cartesian(&arg_lists);

        let mut out = vec![];
        for tuple in tuples {
            if name.starts_with("data.") {
                if let Some(value) = self.call_function(name, &tuple)? {
                    out.push(value);
                }
                continue;
            }
            match self.registry.call(name, &tuple) {
                BuiltinOutcome::Value(v) => out.push(v),
                BuiltinOutcome::Undefined => {}
                BuiltinOutcome::Error(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

fn bind(env: &Env, var: &str, value: Term) -> Env {
    if var == "_" {
        return env.clone();
    }
    if let Some(existing) = env.get(var) {
        if existing == &value {
            return env.clone();
        }
        // Conflicting rebind: this parser's surface grammar never
        // produces two `UnifyExpr` statements targeting the same name
        // within one body (`init`'s single-assignment guarantee), so
        // this path is unreached in practice; documented in DESIGN.md
        // rather than silently assumed away.
        return env.clone();
    }
    let mut next = env.clone();
    next.insert(var.to_string(), value);
    next
}

/// Flattens a chain of plain `.field` steps (no brackets) down to a
/// single dotted name, e.g. `Ref(Ref(Var(data), .p), .allow)` ->
/// `"data.p.allow"`. Returns `None` as soon as a bracket step appears,
/// since those can't be folded into a static rule name.
fn ref_chain_to_path(node: &Node) -> Option<String> {
    match node.kind {
        Kind::Var => node.var_name().map(str::to_string),
        Kind::Ref => {
            let base = node.child(0)?;
            let arg = node.child(1)?;
            if arg.kind != Kind::RefArgDot {
                return None;
            }
            let field = arg.child(0)?.var_name()?;
            let base_path = ref_chain_to_path(base)?;
            Some(format!("{base_path}.{field}"))
        }
        _ => None,
    }
}

fn cartesian(lists: &[Vec<Term>]) -> Vec<Vec<Term>> {
    let mut result = vec![vec![]];
    for list in lists {
        let mut next = vec![];
        for prefix in &result {
            for item in list {
                let mut combined = prefix.clone();
                combined.push(item.clone());
                next.push(combined);
            }
        }
        result = next;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BuiltinRegistry;

    fn expr_term(term: Term) -> Node {
        Node::with_children(Kind::Expr, vec![Node::term(term)])
    }

    fn unify_expr(var: &str, expr: Node) -> Node {
        Node::with_children(Kind::UnifyExpr, vec![Node::var(var), expr])
    }

    #[test]
    fn solves_a_single_assignment() {
        let program = Program { rules: IndexMap::new() };
        let registry = BuiltinRegistry::new();
        let engine = QueryEngine::new(&program, &registry, Term::null(), Term::null());
        let body = Node::with_children(Kind::UnifyBody, vec![unify_expr("x", expr_term(Term::int(42)))]);
        let (status, envs) = engine.solve_body(&body, Env::new()).unwrap();
        assert_eq!(status, VariableStatus::Defined);
        assert_eq!(envs[0].get("x"), Some(&Term::int(42)));
    }

    #[test]
    fn negation_invalidates_when_inner_body_succeeds() {
        let program = Program { rules: IndexMap::new() };
        let registry = BuiltinRegistry::new();
        let engine = QueryEngine::new(&program, &registry, Term::null(), Term::null());
        let inner = Node::with_children(Kind::UnifyBody, vec![unify_expr("y", expr_term(Term::bool(true)))]);
        let body = Node::with_children(Kind::UnifyBody, vec![Node::with_children(Kind::UnifyExprNot, vec![inner])]);
        let (status, envs) = engine.solve_body(&body, Env::new()).unwrap();
        assert_eq!(status, VariableStatus::Invalid);
        assert!(envs.is_empty());
    }

    #[test]
    fn negation_succeeds_when_inner_body_is_undefined() {
        let program = Program { rules: IndexMap::new() };
        let registry = BuiltinRegistry::new();
        let engine = QueryEngine::new(&program, &registry, Term::null(), Term::null());
        let enum_body = Node::with_children(
            Kind::UnifyBody,
            vec![Node::with_children(
                Kind::UnifyExprEnum,
                vec![
                    Node::var("x"),
                    Node::var("x"),
                    expr_term(Term::array(vec![])),
                    Node::with_children(Kind::UnifyBody, vec![]),
                ],
            )],
        );
        let (enum_status, _) = engine.solve_body(&enum_body, Env::new()).unwrap();
        assert_eq!(enum_status, VariableStatus::Undefined);

        let body = Node::with_children(
            Kind::UnifyBody,
            vec![Node::with_children(Kind::UnifyExprNot, vec![enum_body])],
        );
        let (status, envs) = engine.solve_body(&body, Env::new()).unwrap();
        assert_eq!(status, VariableStatus::Defined);
        assert_eq!(envs.len(), 1);
    }

    #[test]
    fn enumeration_binds_each_element() {
        let program = Program { rules: IndexMap::new() };
        let registry = BuiltinRegistry::new();
        let engine = QueryEngine::new(&program, &registry, Term::null(), Term::null());
        let body = Node::with_children(
            Kind::UnifyBody,
            vec![Node::with_children(
                Kind::UnifyExprEnum,
                vec![
                    Node::var("x"),
                    Node::var("x"),
                    expr_term(Term::array(vec![Term::int(1), Term::int(2)])),
                    Node::with_children(Kind::UnifyBody, vec![]),
                ],
            )],
        );
        let (status, envs) = engine.solve_body(&body, Env::new()).unwrap();
        assert_eq!(status, VariableStatus::Defined);
        assert_eq!(envs.len(), 2);
    }

    #[test]
    fn arithmetic_expression_evaluates_through_locals() {
        let program = Program { rules: IndexMap::new() };
        let registry = BuiltinRegistry::new();
        let engine = QueryEngine::new(&program, &registry, Term::null(), Term::null());
        let mut env = Env::new();
        env.insert("x".to_string(), Term::int(21));
        let expr = Node::with_children(
            Kind::ArithInfix,
            vec![Node::new(Kind::OpMultiply), expr_term(Term::int(2)), Node::with_children(Kind::Expr, vec![Node::var("x")])],
        );
        let result = engine.evaluate_expr(&expr, &env).unwrap();
        assert_eq!(result, vec![Term::int(42)]);
    }

    #[test]
    fn wildcard_ref_enumerates_array_elements() {
        let program = Program { rules: IndexMap::new() };
        let registry = BuiltinRegistry::new();
        let engine = QueryEngine::new(&program, &registry, Term::null(), Term::null());
        let ref_node = Node::with_children(
            Kind::Ref,
            vec![
                Node::term(Term::array(vec![Term::int(1), Term::int(2), Term::int(3)])),
                Node::with_children(
                    Kind::RefArgBrack,
                    vec![Node::with_children(Kind::Expr, vec![Node::var("_")])],
                ),
            ],
        );
        let result = engine.evaluate_expr(&ref_node, &Env::new()).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn function_call_resolves_user_rule() {
        let func = Node::with_children(
            Kind::RuleFunc,
            vec![
                Node::var("f"),
                Node::with_children(Kind::RuleArgs, vec![Node::var("x")]),
                Node::with_children(
                    Kind::Expr,
                    vec![Node::with_children(
                        Kind::ArithInfix,
                        vec![Node::new(Kind::OpMultiply), Node::with_children(Kind::Expr, vec![Node::var("x")]), expr_term(Term::int(2))],
                    )],
                ),
                Node::with_children(Kind::UnifyBody, vec![]),
            ],
        );
        let mut rules = IndexMap::new();
        rules.insert("data.p.f".to_string(), vec![func]);
        let program = Program { rules };
        let registry = BuiltinRegistry::new();
        let engine = QueryEngine::new(&program, &registry, Term::null(), Term::null());
        let result = engine.call_function("data.p.f", &[Term::int(21)]).unwrap();
        assert_eq!(result, Some(Term::int(42)));
    }

    #[test]
    fn builtin_call_routes_through_registry() {
        let program = Program { rules: IndexMap::new() };
        let registry = BuiltinRegistry::new();
        let engine = QueryEngine::new(&program, &registry, Term::null(), Term::null());
        let call = Node::with_children(
            Kind::Function,
            vec![
                Node::var("count"),
                Node::with_children(Kind::ArgSeq, vec![expr_term(Term::array(vec![Term::int(1), Term::int(2)]))]),
            ],
        );
        let result = engine.evaluate_expr(&call, &Env::new()).unwrap();
        assert_eq!(result, vec![Term::int(2)]);
    }

    #[test]
    fn with_override_shadows_input_for_nested_rule_resolution() {
        let rule = Node::with_children(
            Kind::RuleComp,
            vec![
                Node::var("a"),
                Node::with_children(
                    Kind::Expr,
                    vec![Node::with_children(
                        Kind::Ref,
                        vec![Node::var("input"), Node::with_children(Kind::RefArgDot, vec![Node::var("x")])],
                    )],
                ),
                Node::with_children(Kind::UnifyBody, vec![]),
            ],
        );
        let mut rules = IndexMap::new();
        rules.insert("data.p.a".to_string(), vec![rule]);
        let program = Program { rules };
        let registry = BuiltinRegistry::new();
        let input = Term::object(vec![(Term::str("x"), Term::int(1))], false).unwrap();
        let engine = QueryEngine::new(&program, &registry, Term::null(), input);

        let withseq = Node::with_children(
            Kind::WithSeq,
            vec![Node::with_children(
                Kind::With,
                vec![
                    Node::var("input"),
                    expr_term(Term::object(vec![(Term::str("x"), Term::int(42))], false).unwrap()),
                ],
            )],
        );
        let reference = Node::with_children(Kind::Ref, vec![Node::var("data.p.a")]);
        let body_with = Node::with_children(
            Kind::UnifyBody,
            vec![unify_expr("result", Node::with_children(Kind::Expr, vec![reference]))],
        );
        let stmt = Node::with_children(Kind::UnifyExprWith, vec![body_with, withseq]);
        let body = Node::with_children(Kind::UnifyBody, vec![stmt]);

        let (status, envs) = engine.solve_body(&body, Env::new()).unwrap();
        assert_eq!(status, VariableStatus::Defined);
        assert_eq!(envs[0].get("result"), Some(&Term::int(42)));
    }
}

//! The interpreter facade (spec §6.1): the single entry point an embedder
//! drives -- accumulate modules/data/input, then run a query through the
//! [`crate::pipeline::Pipeline`] and the [`crate::unify`] engine.
//!
//! Grounded on `src/interpreter.cc`'s `Interpreter` class, which owns the
//! exact same four pieces of state (modules, data, input, builtins) and
//! performs this same compile-then-unify-then-project sequence per query.
//! The config surface mirrors the teacher's `GlobalContext`
//! (`src/runtime/global_context.rs`): a plain data struct with `Default`
//! plus consuming `with_*` builder methods, constructed once and handed
//! to `new`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{collect_errors, ErrorCode, RegoError};
use crate::pipeline::result::{project, QueryResult, SubResult};
use crate::pipeline::Pipeline;
use crate::registry::{from_json, to_json, BuiltinRegistry, LookupPolicy};
use crate::parser::Parser;
use crate::term::Term;
use crate::tree::{Kind, Node};
use crate::unify::{Program, QueryEngine};

/// Construction-time knobs (spec §6.1). `v1_compatible` is accepted for
/// interface parity with the original's parser-variant switch, but this
/// crate implements only the one grammar `parser` describes, so it
/// is currently inert.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    pub debug_path: Option<PathBuf>,
    pub wf_check_enabled: bool,
    pub debug_enabled: bool,
    pub v1_compatible: bool,
    pub builtins_policy: LookupPolicy,
    pub strict_builtin_errors: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            debug_path: None,
            wf_check_enabled: true,
            debug_enabled: false,
            v1_compatible: true,
            builtins_policy: LookupPolicy::AllowAll,
            strict_builtin_errors: true,
        }
    }
}

impl InterpreterConfig {
    pub fn with_debug_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn with_wf_check_enabled(mut self, enabled: bool) -> Self {
        self.wf_check_enabled = enabled;
        self
    }

    pub fn with_debug_enabled(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    pub fn with_v1_compatible(mut self, enabled: bool) -> Self {
        self.v1_compatible = enabled;
        self
    }

    pub fn with_builtins_policy(mut self, policy: LookupPolicy) -> Self {
        self.builtins_policy = policy;
        self
    }

    pub fn with_strict_builtin_errors(mut self, strict: bool) -> Self {
        self.strict_builtin_errors = strict;
        self
    }
}

fn io_error(err: std::io::Error) -> RegoError {
    RegoError::new(err.to_string(), ErrorCode::RuntimeError)
}

fn json_error(err: serde_json::Error) -> RegoError {
    RegoError::new(format!("invalid json: {err}"), ErrorCode::RegoParseError)
}

/// Holds every module, data document, and the input accumulated so far,
/// plus the builtin registry a query runs against (spec §6.1).
pub struct Interpreter {
    config: InterpreterConfig,
    modules: Vec<Node>,
    data_docs: Vec<Term>,
    input: Term,
    registry: BuiltinRegistry,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new(InterpreterConfig::default())
    }
}

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        crate::logger::init();
        let mut registry = BuiltinRegistry::new();
        registry.set_policy(config.builtins_policy.clone());
        registry.set_strict_errors(config.strict_builtin_errors);
        Interpreter {
            config,
            modules: vec![],
            data_docs: vec![],
            input: Term::null(),
            registry,
        }
    }

    /// Mutable handle to the builtin registry (spec §6.1), so an embedder
    /// can register additional built-ins or narrow the lookup policy after
    /// construction.
    pub fn builtins_mut(&mut self) -> &mut BuiltinRegistry {
        &mut self.registry
    }

    pub fn add_module(&mut self, name: &str, source: &str) -> Result<(), RegoError> {
        let module = Parser::parse_module(source).map_err(|e| e.at(name.to_string()))?;
        self.modules.push(module);
        Ok(())
    }

    pub fn add_module_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), RegoError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(io_error)?;
        self.add_module(&path.display().to_string(), &source)
    }

    pub fn add_data(&mut self, json_text: &str) -> Result<(), RegoError> {
        let value: serde_json::Value = serde_json::from_str(json_text).map_err(json_error)?;
        self.data_docs.push(from_json(&value));
        Ok(())
    }

    pub fn add_data_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), RegoError> {
        let json_text = fs::read_to_string(path).map_err(io_error)?;
        self.add_data(&json_text)
    }

    /// Appends an already-constructed data [`Term`] (spec §6.1's `addDataAst`).
    pub fn add_data_ast(&mut self, term: Term) {
        self.data_docs.push(term);
    }

    /// Replaces the input document. Passing the literal string `"undefined"`
    /// leaves the current input unset, matching spec §6.1.
    pub fn set_input(&mut self, json_text: &str) -> Result<(), RegoError> {
        if json_text == "undefined" {
            return Ok(());
        }
        let value: serde_json::Value = serde_json::from_str(json_text).map_err(json_error)?;
        self.input = from_json(&value);
        Ok(())
    }

    pub fn set_input_term(&mut self, term: Term) {
        self.input = term;
    }

    fn data_seq_node(&self) -> Node {
        if self.data_docs.is_empty() {
            return Node::with_children(
                Kind::DataSeq,
                vec![Node::with_children(Kind::Data, vec![Node::term(Term::Object(vec![]))])],
            );
        }
        let docs = self
            .data_docs
            .iter()
            .map(|term| Node::with_children(Kind::Data, vec![Node::term(term.clone())]))
            .collect();
        Node::with_children(Kind::DataSeq, docs)
    }

    fn dump_debug_tree(&self, label: &str, tree: &Node) {
        if self.config.debug_enabled {
            log::debug!("interpreter: {label}:\n{tree}");
        }
        if let Some(path) = &self.config.debug_path {
            let file = path.join(format!("{label}.tree"));
            let _ = fs::write(file, tree.to_string());
        }
    }

    /// Compiles and unifies `query_text`, returning the result tree form
    /// (spec §6.1's `rawQuery`).
    pub fn raw_query(&self, query_text: &str) -> QueryResult {
        let query = match Parser::parse_query(query_text) {
            Ok(query) => query,
            Err(e) => return QueryResult::Errors(vec![e]),
        };

        let root = Node::with_children(
            Kind::Rego,
            vec![
                self.data_seq_node(),
                Node::with_children(Kind::Input, vec![Node::term(self.input.clone())]),
                Node::with_children(Kind::ModuleSeq, self.modules.clone()),
                query,
            ],
        );
        self.dump_debug_tree("pre-pipeline", &root);

        let pipeline = Pipeline::new();
        let (compiled, wf_errors) = pipeline.run(root);
        self.dump_debug_tree("post-pipeline", &compiled);

        let mut errors = if self.config.wf_check_enabled { wf_errors } else { vec![] };
        errors.extend(collect_errors(&compiled));
        if !errors.is_empty() {
            return QueryResult::Errors(errors);
        }

        let data = extract_data(&compiled);
        let input = extract_input(&compiled);
        let program = Program::from_tree(&compiled);
        let engine = QueryEngine::new(&program, &self.registry, data, input);
        let (solutions, unify_errors) = engine.run_query("data.$query.$result");
        if !unify_errors.is_empty() {
            return QueryResult::Errors(unify_errors);
        }

        project(solutions, None)
    }

    /// Compiles and unifies `query_text`, rendering the result per the
    /// textual format of spec §6.2.
    pub fn query(&self, query_text: &str) -> String {
        render_result(&self.raw_query(query_text))
    }
}

fn extract_data(tree: &Node) -> Term {
    tree.find(Kind::DataSeq)
        .and_then(|seq| seq.find(Kind::Data))
        .and_then(|data| data.as_term())
        .cloned()
        .unwrap_or_else(|| Term::Object(vec![]))
}

fn extract_input(tree: &Node) -> Term {
    tree.find(Kind::Input)
        .and_then(|input| input.child(0))
        .and_then(|node| node.as_term())
        .cloned()
        .unwrap_or_else(Term::null)
}

fn render_result(result: &QueryResult) -> String {
    match result {
        QueryResult::Undefined => "{}".to_string(),
        QueryResult::Errors(errors) => {
            let body = errors.iter().map(render_error).collect::<Vec<_>>().join(",");
            format!("{{\"errors\":[{body}]}}")
        }
        QueryResult::Defined(sub_results) => {
            let body = sub_results.iter().map(render_sub_result).collect::<Vec<_>>().join(",");
            format!("{{\"result\":[{body}]}}")
        }
    }
}

fn render_sub_result(sub: &SubResult) -> String {
    let expressions = sub.expressions.iter().map(to_json).collect::<Vec<_>>().join(",");
    if sub.bindings.is_empty() {
        format!("{{\"expressions\":[{expressions}]}}")
    } else {
        let bindings = sub
            .bindings
            .iter()
            .map(|(name, value)| format!("{}:{}", json_string(name), to_json(value)))
            .collect::<Vec<_>>()
            .join(",");
        format!("{{\"expressions\":[{expressions}],\"bindings\":{{{bindings}}}}}")
    }
}

fn render_error(error: &RegoError) -> String {
    format!(
        "{{\"message\":{},\"code\":{},\"location\":{}}}",
        json_string(&error.message),
        json_string(error.code.as_str()),
        json_string(&error.location),
    )
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_with_no_modules_resolves_undefined() {
        let interp = Interpreter::default();
        assert_eq!(interp.query("data.p.allow"), "{}");
    }

    #[test]
    fn complete_rule_query_returns_true() {
        let mut interp = Interpreter::default();
        interp.add_module("p.rego", "package p\n\nallow { 1 == 1 }").unwrap();
        assert_eq!(interp.query("data.p.allow"), "{\"result\":[{\"expressions\":[true]}]}");
    }

    #[test]
    fn negation_over_input_scenario() {
        let mut interp = Interpreter::default();
        interp.add_module("p.rego", "package p\n\nok { not input.blocked }").unwrap();
        interp.set_input("{\"blocked\":false}").unwrap();
        assert_eq!(interp.query("data.p.ok"), "{\"result\":[{\"expressions\":[true]}]}");
    }

    #[test]
    fn function_rule_with_arity() {
        let mut interp = Interpreter::default();
        interp.add_module("p.rego", "package p\n\nf(x) = y { y := x * 2 }").unwrap();
        assert_eq!(interp.query("data.p.f(21)"), "{\"result\":[{\"expressions\":[42]}]}");
    }

    #[test]
    fn set_rule_collects_distinct_sorted_elements() {
        let mut interp = Interpreter::default();
        interp.add_module("p.rego", "package p\n\ns[x] { x := data.xs[_] }").unwrap();
        interp.add_data("{\"xs\":[1,2,2,3]}").unwrap();
        assert_eq!(interp.query("data.p.s"), "{\"result\":[{\"expressions\":[[1,2,3]]}]}");
    }

    #[test]
    fn invalid_json_data_is_a_parse_error() {
        let mut interp = Interpreter::default();
        assert!(interp.add_data("{not json}").is_err());
    }

    #[test]
    fn builtins_mut_registers_additional_lookups() {
        let mut interp = Interpreter::default();
        assert!(!interp.builtins_mut().contains("totally.custom"));
    }
}

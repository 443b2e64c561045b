//! The built-in registry (spec §4.7): fully-qualified name to
//! definition record, lookup policy, and the strict/lenient error
//! convention.
//!
//! Grounded on `include/rego/register.h`'s `BuiltIns` map (name ->
//! behavior closure grouped by category) and `include/rego/args.h`'s
//! arity/argument-tuple handling. The source ships concrete bodies for
//! ~100 built-ins across `aggregates`, `arrays`, `bits`, `encoding`,
//! `glob`, `graph`, `http`, `json`, `numbers`, `objects`, `regex`,
//! `sets`, `strings`, `time`, `types`, `units`, `uuid`; this crate
//! implements a representative slice (see `register_stdlib`) and
//! declares the rest by signature only, per SPEC_FULL.md §4.7.

use crate::bigint::BigInt;
use crate::error::{ErrorCode, RegoError};
use crate::term::scalar::Scalar;
use crate::term::Term;
use indexmap::IndexMap;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    VarArgs,
}

impl Arity {
    fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => *k == n,
            Arity::VarArgs => true,
        }
    }
}

type Invoke = dyn Fn(&[Term]) -> Result<Term, RegoError> + Send + Sync;

pub struct BuiltinDef {
    pub name: String,
    pub arity: Arity,
    pub available: bool,
    invoke: Box<Invoke>,
}

/// Which names `resolve` is permitted to return a live definition for;
/// names excluded by policy resolve to the same "not available" stub as
/// an unimplemented built-in (spec §4.7).
#[derive(Debug, Clone)]
pub enum LookupPolicy {
    AllowAll,
    Whitelist(HashSet<String>),
    Blacklist(HashSet<String>),
}

impl LookupPolicy {
    fn permits(&self, name: &str) -> bool {
        match self {
            LookupPolicy::AllowAll => true,
            LookupPolicy::Whitelist(names) => names.contains(name),
            LookupPolicy::Blacklist(names) => !names.contains(name),
        }
    }
}

/// Outcome of a built-in invocation, already folded through the
/// strict-errors policy (spec §4.7's last bullet): in lenient mode an
/// error collapses to `Undefined` rather than propagating.
pub enum BuiltinOutcome {
    Value(Term),
    Undefined,
    Error(RegoError),
}

pub struct BuiltinRegistry {
    defs: IndexMap<String, BuiltinDef>,
    policy: LookupPolicy,
    strict_errors: bool,
}

fn not_available(name: &str) -> RegoError {
    RegoError::new(format!("built-in {name} is not available"), ErrorCode::EvalBuiltinError)
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut registry = BuiltinRegistry {
            defs: IndexMap::new(),
            policy: LookupPolicy::AllowAll,
            strict_errors: true,
        };
        register_stdlib(&mut registry);
        registry
    }

    pub fn set_policy(&mut self, policy: LookupPolicy) {
        self.policy = policy;
    }

    pub fn set_strict_errors(&mut self, strict: bool) {
        self.strict_errors = strict;
    }

    /// Declares a built-in with no implementation, matching the source's
    /// convention of listing every name in the declaration table even
    /// when only a subset has a concrete body (spec §4.7 / SPEC_FULL §4.7).
    pub fn declare_stub(&mut self, name: &str, arity: Arity) {
        self.defs.insert(
            name.to_string(),
            BuiltinDef {
                name: name.to_string(),
                arity,
                available: false,
                invoke: Box::new(|_| Err(not_available(name))),
            },
        );
    }

    pub fn register(
        &mut self,
        name: &str,
        arity: Arity,
        invoke: impl Fn(&[Term]) -> Result<Term, RegoError> + Send + Sync + 'static,
    ) {
        self.defs.insert(
            name.to_string(),
            BuiltinDef {
                name: name.to_string(),
                arity,
                available: true,
                invoke: Box::new(invoke),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Resolves and invokes `name(args)`, enforcing arity and the lookup
    /// policy, then folding the result through the strict-errors flag
    /// (spec §4.7).
    pub fn call(&self, name: &str, args: &[Term]) -> BuiltinOutcome {
        let fold = |result: Result<Term, RegoError>| match result {
            Ok(term) => BuiltinOutcome::Value(term),
            Err(err) if self.strict_errors => BuiltinOutcome::Error(err),
            Err(_) => BuiltinOutcome::Undefined,
        };

        if !self.policy.permits(name) {
            return fold(Err(not_available(name)));
        }
        let Some(def) = self.defs.get(name) else {
            return fold(Err(not_available(name)));
        };
        if !def.available {
            return fold(Err(not_available(name)));
        }
        if !def.arity.accepts(args.len()) {
            return fold(Err(RegoError::new(
                format!("{name} takes {:?} arguments, got {}", def.arity, args.len()),
                ErrorCode::EvalTypeError,
            )));
        }
        fold((def.invoke)(args))
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn eval_type_error(message: impl Into<String>) -> RegoError {
    RegoError::new(message, ErrorCode::EvalTypeError)
}

fn as_str(term: &Term) -> Result<&str, RegoError> {
    match term.as_scalar() {
        Some(Scalar::Str(s)) => Ok(s),
        _ => Err(eval_type_error("expected a string")),
    }
}

fn as_array_items(term: &Term) -> Result<&[Term], RegoError> {
    match term {
        Term::Array(items) => Ok(items),
        Term::Set(items) => Ok(items),
        _ => Err(eval_type_error("expected an array or set")),
    }
}

fn as_f64(term: &Term) -> Result<f64, RegoError> {
    term.as_scalar()
        .and_then(Scalar::to_f64)
        .ok_or_else(|| eval_type_error("expected a number"))
}

/// Registers the representative built-in set SPEC_FULL.md §4.7 names;
/// everything in `STUB_NAMES` is declared by signature only.
fn register_stdlib(registry: &mut BuiltinRegistry) {
    registry.register("count", Arity::Exact(1), |args| {
        let items = as_array_items(&args[0])?;
        Ok(Term::int(items.len() as u64))
    });

    registry.register("sum", Arity::Exact(1), |args| {
        let items = as_array_items(&args[0])?;
        let mut total = 0.0f64;
        let mut all_int = true;
        let mut int_total = BigInt::zero();
        for item in items {
            match item.as_scalar() {
                Some(Scalar::Int(i)) => {
                    int_total = &int_total + i;
                    total += i.to_f64().unwrap_or(0.0);
                }
                Some(Scalar::Float(f)) => {
                    all_int = false;
                    total += f.0;
                }
                _ => return Err(eval_type_error("sum requires an array of numbers")),
            }
        }
        if all_int {
            Ok(Term::int(int_total))
        } else {
            Term::float(total).map_err(|e| eval_type_error(e.to_string()))
        }
    });

    registry.register("max", Arity::Exact(1), |args| {
        let items = as_array_items(&args[0])?;
        items.iter().max().cloned().ok_or_else(|| eval_type_error("max of empty collection is undefined"))
    });

    registry.register("min", Arity::Exact(1), |args| {
        let items = as_array_items(&args[0])?;
        items.iter().min().cloned().ok_or_else(|| eval_type_error("min of empty collection is undefined"))
    });

    registry.register("sort", Arity::Exact(1), |args| {
        let items = as_array_items(&args[0])?;
        let mut sorted = items.to_vec();
        sorted.sort();
        Ok(Term::array(sorted))
    });

    registry.register("type_name", Arity::Exact(1), |args| {
        let name = match &args[0] {
            Term::Scalar(Scalar::Null) => "null",
            Term::Scalar(Scalar::Bool(_)) => "boolean",
            Term::Scalar(Scalar::Int(_)) | Term::Scalar(Scalar::Float(_)) => "number",
            Term::Scalar(Scalar::Str(_)) => "string",
            Term::Array(_) => "array",
            Term::Set(_) => "set",
            Term::Object(_) => "object",
        };
        Ok(Term::str(name))
    });

    registry.register("to_number", Arity::Exact(1), |args| match &args[0] {
        Term::Scalar(Scalar::Str(s)) => s
            .parse::<f64>()
            .ok()
            .and_then(|f| Term::float(f).ok())
            .ok_or_else(|| eval_type_error(format!("cannot convert {s:?} to a number"))),
        Term::Scalar(Scalar::Int(_)) | Term::Scalar(Scalar::Float(_)) => Ok(args[0].clone()),
        _ => Err(eval_type_error("to_number requires a string or number")),
    });

    registry.register("contains", Arity::Exact(2), |args| {
        Ok(Term::bool(as_str(&args[0])?.contains(as_str(&args[1])?)))
    });
    registry.register("startswith", Arity::Exact(2), |args| {
        Ok(Term::bool(as_str(&args[0])?.starts_with(as_str(&args[1])?)))
    });
    registry.register("endswith", Arity::Exact(2), |args| {
        Ok(Term::bool(as_str(&args[0])?.ends_with(as_str(&args[1])?)))
    });
    registry.register("upper", Arity::Exact(1), |args| Ok(Term::str(as_str(&args[0])?.to_uppercase())));
    registry.register("lower", Arity::Exact(1), |args| Ok(Term::str(as_str(&args[0])?.to_lowercase())));
    registry.register("trim", Arity::Exact(2), |args| {
        Ok(Term::str(as_str(&args[0])?.trim_matches(|c| as_str(&args[1]).unwrap_or("").contains(c)).to_string()))
    });

    registry.register("concat", Arity::Exact(2), |args| {
        let sep = as_str(&args[0])?;
        let items = as_array_items(&args[1])?;
        let parts: Result<Vec<&str>, RegoError> = items.iter().map(as_str).collect();
        Ok(Term::str(parts?.join(sep)))
    });

    registry.register("split", Arity::Exact(2), |args| {
        let s = as_str(&args[0])?;
        let sep = as_str(&args[1])?;
        Ok(Term::array(s.split(sep).map(Term::str).collect()))
    });

    registry.register("format_int", Arity::Exact(2), |args| {
        let n = match args[0].as_scalar() {
            Some(Scalar::Int(i)) => i.clone(),
            _ => return Err(eval_type_error("format_int requires an integer")),
        };
        let base = as_f64(&args[1])? as u32;
        match base {
            2 | 8 | 16 => {
                let magnitude = n.to_i64().ok_or_else(|| eval_type_error("format_int value too large"))?;
                let text = match base {
                    2 => format!("{:b}", magnitude),
                    8 => format!("{:o}", magnitude),
                    _ => format!("{:x}", magnitude),
                };
                Ok(Term::str(text))
            }
            10 => Ok(Term::str(n.to_string())),
            _ => Err(eval_type_error("format_int supports base 2, 8, 10, or 16")),
        }
    });

    registry.register("object.get", Arity::Exact(3), |args| match &args[0] {
        Term::Object(items) => {
            let key = args[1].canonical_key();
            Ok(items
                .iter()
                .find(|(k, _)| k.canonical_key() == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| args[2].clone()))
        }
        _ => Err(eval_type_error("object.get requires an object")),
    });

    registry.register("object.union", Arity::Exact(2), |args| {
        let (Term::Object(a), Term::Object(b)) = (&args[0], &args[1]) else {
            return Err(eval_type_error("object.union requires two objects"));
        };
        Term::object(a.iter().chain(b.iter()).cloned().collect(), false).map_err(|e| eval_type_error(e.to_string()))
    });

    registry.register("json.marshal", Arity::Exact(1), |args| Ok(Term::str(to_json(&args[0]))));
    registry.register("json.unmarshal", Arity::Exact(1), |args| {
        let s = as_str(&args[0])?;
        let value: serde_json::Value =
            serde_json::from_str(s).map_err(|e| eval_type_error(format!("invalid json: {e}")))?;
        Ok(from_json(&value))
    });

    for (name, predicate) in [
        ("is_number", (|t: &Term| matches!(t.as_scalar(), Some(Scalar::Int(_)) | Some(Scalar::Float(_)))) as fn(&Term) -> bool),
        ("is_string", |t| matches!(t.as_scalar(), Some(Scalar::Str(_)))),
        ("is_boolean", |t| matches!(t.as_scalar(), Some(Scalar::Bool(_)))),
        ("is_null", |t| matches!(t.as_scalar(), Some(Scalar::Null))),
        ("is_array", |t| t.is_array()),
        ("is_set", |t| t.is_set()),
        ("is_object", |t| t.is_object()),
    ] {
        registry.register(name, Arity::Exact(1), move |args| Ok(Term::bool(predicate(&args[0]))));
    }

    registry.register("div", Arity::Exact(2), |args| {
        let (Some(Scalar::Int(a)), Some(Scalar::Int(b))) = (args[0].as_scalar(), args[1].as_scalar()) else {
            return Err(eval_type_error("div requires two integers"));
        };
        let (q, _) = a.checked_div_rem(b).map_err(|e| RegoError::new(e.to_string(), ErrorCode::EvalBuiltinError))?;
        Ok(Term::int(q.to_i64().unwrap_or_default()))
    });

    for name in STUB_NAMES {
        if !registry.contains(name) {
            registry.declare_stub(name, Arity::VarArgs);
        }
    }
}

/// Declared-only names: real bodies exist in the source across `bits`,
/// `encoding`, `glob`, `graph`, `http`, `regex`, `time`, `units`, `uuid`
/// and a handful more array/object/string helpers spec.md §1 places out
/// of scope for this crate (see SPEC_FULL.md §4.7).
const STUB_NAMES: &[&str] = &[
    "all",
    "any",
    "array.concat",
    "array.reverse",
    "array.slice",
    "base64.decode",
    "base64.encode",
    "bits.and",
    "bits.or",
    "bits.xor",
    "glob.match",
    "graph.reachable",
    "http.send",
    "json.marshal_with_options",
    "numbers.range",
    "object.remove",
    "regex.match",
    "regex.replace",
    "time.now_ns",
    "units.parse",
    "uuid.rfc4122",
];

pub(crate) fn to_json(term: &Term) -> String {
    match term {
        Term::Scalar(Scalar::Null) => "null".to_string(),
        Term::Scalar(Scalar::Bool(b)) => b.to_string(),
        Term::Scalar(Scalar::Int(i)) => i.to_string(),
        Term::Scalar(Scalar::Float(f)) => f.0.to_string(),
        Term::Scalar(Scalar::Str(s)) => serde_json::to_string(s).unwrap_or_default(),
        Term::Array(items) | Term::Set(items) => {
            format!("[{}]", items.iter().map(to_json).collect::<Vec<_>>().join(","))
        }
        Term::Object(items) => {
            let mut sorted: Vec<&(Term, Term)> = items.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            let body = sorted
                .iter()
                .map(|(k, v)| format!("{}:{}", to_json(k), to_json(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{body}}}")
        }
    }
}

pub(crate) fn from_json(value: &serde_json::Value) -> Term {
    match value {
        serde_json::Value::Null => Term::null(),
        serde_json::Value::Bool(b) => Term::bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Term::int(i)
            } else {
                Term::float(n.as_f64().unwrap_or(0.0)).unwrap_or_else(|_| Term::int(0))
            }
        }
        serde_json::Value::String(s) => Term::str(s.clone()),
        serde_json::Value::Array(items) => Term::array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Term::object(
            map.iter().map(|(k, v)| (Term::str(k.clone()), from_json(v))).collect(),
            false,
        )
        .unwrap_or_else(|_| Term::Object(vec![])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_value(outcome: BuiltinOutcome) -> Term {
        match outcome {
            BuiltinOutcome::Value(t) => t,
            BuiltinOutcome::Undefined => panic!("expected a value, got undefined"),
            BuiltinOutcome::Error(e) => panic!("expected a value, got error: {e}"),
        }
    }

    #[test]
    fn count_counts_array_elements() {
        let registry = BuiltinRegistry::new();
        let arr = Term::array(vec![Term::int(1), Term::int(2), Term::int(3)]);
        let result = expect_value(registry.call("count", &[arr]));
        assert_eq!(result, Term::int(3));
    }

    #[test]
    fn unknown_builtin_is_not_available() {
        let registry = BuiltinRegistry::new();
        match registry.call("totally.unknown", &[]) {
            BuiltinOutcome::Error(e) => assert_eq!(e.code, ErrorCode::EvalBuiltinError),
            _ => panic!("expected an error"),
        }
    }

    #[test]
    fn lenient_mode_collapses_errors_to_undefined() {
        let mut registry = BuiltinRegistry::new();
        registry.set_strict_errors(false);
        match registry.call("totally.unknown", &[]) {
            BuiltinOutcome::Undefined => {}
            _ => panic!("expected undefined"),
        }
    }

    #[test]
    fn whitelist_policy_excludes_unlisted_names() {
        let mut registry = BuiltinRegistry::new();
        registry.set_policy(LookupPolicy::Whitelist(["count".to_string()].into_iter().collect()));
        let arr = Term::array(vec![Term::int(1)]);
        assert!(matches!(registry.call("count", &[arr]), BuiltinOutcome::Value(_)));
        assert!(matches!(registry.call("sum", &[Term::array(vec![])]), BuiltinOutcome::Error(_)));
    }

    #[test]
    fn stub_names_are_declared_but_unavailable() {
        let registry = BuiltinRegistry::new();
        assert!(registry.contains("regex.match"));
        assert!(matches!(registry.call("regex.match", &[]), BuiltinOutcome::Error(_)));
    }

    #[test]
    fn json_roundtrip_preserves_object_shape() {
        let registry = BuiltinRegistry::new();
        let obj = Term::object(vec![(Term::str("a"), Term::int(1))], false).unwrap();
        let marshaled = expect_value(registry.call("json.marshal", &[obj.clone()]));
        let unmarshaled = expect_value(registry.call("json.unmarshal", &[marshaled]));
        assert_eq!(unmarshaled, obj);
    }
}

//! Canonical key rendering: the deterministic string identity used for set
//! membership, object lookup, and Term ordering (spec §3, "Canonical key").

use super::Term;
use itertools::Itertools;

/// `scalars by lexical form; arrays [k1,k2,…]; sets sorted and rendered
/// {k1,k2,…}; objects sorted by key then {k1:v1,…}`.
pub fn canonical_key(term: &Term) -> String {
    match term {
        Term::Scalar(s) => s.canonical_key(),
        Term::Array(items) => {
            let inner = items.iter().map(canonical_key).join(",");
            format!("[{inner}]")
        }
        Term::Set(set) => {
            let mut keys: Vec<String> = set.iter().map(canonical_key).collect();
            keys.sort();
            format!("{{{}}}", keys.join(","))
        }
        Term::Object(obj) => {
            let mut pairs: Vec<(String, String)> = obj
                .iter()
                .map(|(k, v)| (canonical_key(k), canonical_key(v)))
                .collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            let inner = pairs
                .into_iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .join(",");
            format!("{{{inner}}}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn round_trips_through_ordering() {
        let a = Term::array(vec![Term::int(1), Term::int(2)]);
        let b = Term::array(vec![Term::int(1), Term::int(2)]);
        assert_eq!(canonical_key(&a), canonical_key(&b));
    }

    #[test]
    fn sets_are_order_independent() {
        let a = Term::set(vec![Term::int(1), Term::int(2)]);
        let b = Term::set(vec![Term::int(2), Term::int(1)]);
        assert_eq!(canonical_key(&a), canonical_key(&b));
    }

    #[test]
    fn objects_sort_by_key() {
        let a = Term::object(
            vec![
                (Term::str("b"), Term::int(2)),
                (Term::str("a"), Term::int(1)),
            ],
            false,
        )
        .unwrap();
        assert_eq!(canonical_key(&a), "{\"a\":n:1,\"b\":n:2}");
    }
}

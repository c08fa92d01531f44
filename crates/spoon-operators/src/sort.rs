//! Materializing, stable multi-key sort.
//!
//! Keys compare as plain strings, or as pseudo-numbers with `numeric`: the
//! longest leading substring that parses as a float, then the unparsed rest.
//! A value without a numeric prefix behaves as `(+inf, value)`. With `random`
//! a per-row random tiebreak is appended, shuffling rows inside equal keys.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spoon_core::value::parse_float;
use spoon_core::{Row, Schema};
use tracing::debug;

use crate::plan::{Buffering, Footprint, OpPlan};
use crate::stream::RowStream;
use crate::traits::{expect_inputs, require_columns, OpError, Operator};

#[derive(Debug, Default, Clone)]
pub struct Sort {
    pub keys: Vec<String>,
    pub numeric: bool,
    pub reverse: bool,
    pub random: bool,
    /// Seed for the random tiebreak; `None` draws one from the OS.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
enum KeyPart {
    Text(String),
    Numeric(f64, String),
}

impl KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
            (KeyPart::Numeric(x, a), KeyPart::Numeric(y, b)) => {
                x.total_cmp(y).then_with(|| a.cmp(b))
            }
            // A sort builds every part the same way.
            (KeyPart::Text(_), KeyPart::Numeric(..)) => Ordering::Greater,
            (KeyPart::Numeric(..), KeyPart::Text(_)) => Ordering::Less,
        }
    }
}

/// Split `value` into its longest float-parsable prefix and the remainder.
pub fn pseudo_numeric(value: &str) -> (f64, &str) {
    let mut ends: Vec<usize> = value.char_indices().map(|(i, c)| i + c.len_utf8()).collect();
    ends.reverse();
    for end in ends {
        if let Some(x) = parse_float(&value[..end]) {
            return (x, &value[end..]);
        }
    }
    (f64::INFINITY, value)
}

struct Keyed {
    parts: Vec<KeyPart>,
    tiebreak: f64,
    row: Row,
}

impl Keyed {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.parts.iter().zip(&other.parts) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                o => return o,
            }
        }
        self.tiebreak.total_cmp(&other.tiebreak)
    }
}

impl Sort {
    pub fn by<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn key_of(&self, row: &Row) -> Vec<KeyPart> {
        self.keys
            .iter()
            .map(|k| {
                let v = row.get(k).map(String::as_str).unwrap_or("");
                if self.numeric {
                    let (x, rest) = pseudo_numeric(v);
                    KeyPart::Numeric(x, rest.to_string())
                } else {
                    KeyPart::Text(v.to_string())
                }
            })
            .collect()
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}

impl Operator for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn memory_need(&self) -> Footprint {
        Footprint {
            buffering: Buffering::Full,
            overhead_per_row: 24 * (self.keys.len() as u64 + 1),
        }
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        expect_inputs(self.name(), input_schemas.len(), 1)?;
        require_columns(&input_schemas[0], &self.keys)?;
        Ok(OpPlan::new(input_schemas[0].clone(), self.memory_need()))
    }

    fn execute(&self, inputs: Vec<RowStream>) -> Result<RowStream, OpError> {
        expect_inputs(self.name(), inputs.len(), 1)?;
        let Some(mut input) = inputs.into_iter().next() else {
            return Err(OpError::Plan("sort expects one input".into()));
        };
        let plan = self
            .plan(&[input.schema().clone()])
            .map_err(|e| e.in_source(input.origin()))?;

        let mut rng = self.random.then(|| self.rng());
        let mut keyed = Vec::new();
        let mut field_bytes = 0u64;
        for row in input.rows()? {
            let row = row?;
            field_bytes += row.values().map(|v| v.len() as u64).sum::<u64>();
            keyed.push(Keyed {
                parts: self.key_of(&row),
                tiebreak: rng.as_mut().map_or(0.0, |r| r.random::<f64>()),
                row,
            });
        }
        let held = keyed.len() as u64;
        debug!(
            rows = held,
            keys = ?self.keys,
            numeric = self.numeric,
            live_bytes = self.memory_need().estimate_live(held, field_bytes / held.max(1)),
            "sorting"
        );

        // Stable in both directions: equal keys keep their input order.
        if self.reverse {
            keyed.sort_by(|a, b| b.cmp(a));
        } else {
            keyed.sort_by(|a, b| a.cmp(b));
        }

        let rows = keyed.into_iter().map(|k| Ok(k.row));
        Ok(RowStream::new(plan.output_schema, rows)
            .with_origin(format!("sort({})", input.origin())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spoon_core::row::row_from_fields;
    use spoon_core::Error;

    fn stream(cols: &[&str], rows: &[&[&str]]) -> RowStream {
        let schema = Schema::new(cols.iter().copied());
        let rows = rows
            .iter()
            .map(|r| row_from_fields(&schema, r.iter().copied()))
            .collect();
        RowStream::from_rows(schema, rows)
    }

    fn sorted(input: RowStream, sort: &Sort, col: &str) -> Vec<String> {
        input
            .sort(sort)
            .unwrap()
            .collect_rows()
            .unwrap()
            .into_iter()
            .map(|r| r[col].clone())
            .collect()
    }

    fn values(vs: &[&str]) -> RowStream {
        let rows: Vec<&[&str]> = vs.iter().map(std::slice::from_ref).collect();
        stream(&["v"], &rows)
    }

    #[test]
    fn pseudo_numeric_split() {
        assert_eq!(pseudo_numeric("12.5kg"), (12.5, "kg"));
        assert_eq!(pseudo_numeric("9x"), (9.0, "x"));
        assert_eq!(pseudo_numeric("-3"), (-3.0, ""));
        assert_eq!(pseudo_numeric("abc"), (f64::INFINITY, "abc"));
        assert_eq!(pseudo_numeric(""), (f64::INFINITY, ""));
        assert_eq!(pseudo_numeric("1é"), (1.0, "é"));
    }

    #[test]
    fn lexical_sort_by_default() {
        let out = sorted(values(&["10", "2", "9x"]), &Sort::by(["v"]), "v");
        assert_eq!(out, ["10", "2", "9x"]);
    }

    #[test]
    fn numeric_sort_uses_prefixes() {
        let sort = Sort {
            numeric: true,
            ..Sort::by(["v"])
        };
        let out = sorted(values(&["10", "2", "abc", "9x", "9"]), &sort, "v");
        assert_eq!(out, ["2", "9", "9x", "10", "abc"]);
    }

    #[test]
    fn reverse_keeps_ties_in_input_order() {
        let input = stream(&["k", "id"], &[&["a", "1"], &["b", "2"], &["a", "3"]]);
        let sort = Sort {
            reverse: true,
            ..Sort::by(["k"])
        };
        assert_eq!(sorted(input, &sort, "id"), ["2", "1", "3"]);
    }

    #[test]
    fn multi_key_sort() {
        let input = stream(
            &["a", "b"],
            &[&["x", "2"], &["y", "1"], &["x", "1"]],
        );
        let out = input
            .sort(&Sort::by(["a", "b"]))
            .unwrap()
            .collect_rows()
            .unwrap();
        let pairs: Vec<(String, String)> = out
            .into_iter()
            .map(|r| (r["a"].clone(), r["b"].clone()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("x".to_string(), "1".to_string()),
                ("x".to_string(), "2".to_string()),
                ("y".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn random_sort_keeps_key_groups_contiguous() {
        let rows: Vec<[&str; 2]> = (0..40)
            .map(|i| [if i % 2 == 0 { "even" } else { "odd" }, "x"])
            .collect();
        let refs: Vec<&[&str]> = rows.iter().map(|r| &r[..]).collect();
        let sort = Sort {
            random: true,
            seed: Some(7),
            ..Sort::by(["k"])
        };
        let out = sorted(stream(&["k", "v"], &refs), &sort, "k");
        assert!(out[..20].iter().all(|k| k == "even"));
        assert!(out[20..].iter().all(|k| k == "odd"));
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let ids: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        let make = || values(&ids.iter().map(String::as_str).collect::<Vec<_>>());
        let sort = Sort {
            random: true,
            seed: Some(42),
            ..Sort::default()
        };
        let first = sorted(make(), &sort, "v");
        let second = sorted(make(), &sort, "v");
        assert_eq!(first, second);
        assert_ne!(first, ids, "a 30-row shuffle should move something");
    }

    #[test]
    fn missing_key_is_rejected_before_reading() {
        let err = Sort::by(["nope"]).plan(&[Schema::new(["v"])]).unwrap_err();
        assert!(matches!(err, OpError::Core(Error::ColumnNotFound(ref c)) if c == "nope"));
        let err = values(&["1"])
            .with_origin("v.csv")
            .sort(&Sort::by(["nope"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Columns {'nope'} are not found in v.csv.");
    }
}

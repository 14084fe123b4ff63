//! Value synthesis from parameter domains.
//!
//! [`boundary_values`] enumerates the edges of a domain (plus off-by-one
//! neighbours of literals found in precondition texts) in a fixed order.
//! [`random_value`] draws one member from a seeded RNG, weighting the edges
//! into the mix.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use dbc_core::{Domain, Value};

fn push_unique(out: &mut Vec<Value>, value: Value) {
    if !out.contains(&value) {
        out.push(value);
    }
}

/// Edge values of `domain`, deduplicated, in a deterministic order.
///
/// `literals` are integer constants compared against this parameter in its
/// preconditions; each contributes `literal - 1`, `literal`, `literal + 1`
/// when they fall inside the domain.
pub fn boundary_values(domain: &Domain, literals: &[i64]) -> Vec<Value> {
    let mut out = Vec::new();
    match domain {
        Domain::Bool => {
            out.push(Value::Bool(false));
            out.push(Value::Bool(true));
        }
        Domain::Int { min, max } => {
            let (min, max) = (*min, *max);
            let mut candidates = vec![
                Some(min),
                Some(max),
                Some(0),
                min.checked_add(1),
                max.checked_sub(1),
                Some(-1),
                Some(1),
            ];
            for &lit in literals {
                candidates.extend([lit.checked_sub(1), Some(lit), lit.checked_add(1)]);
            }
            for v in candidates.into_iter().flatten() {
                if min <= v && v <= max {
                    push_unique(&mut out, Value::Int(v));
                }
            }
        }
        Domain::Float { min, max } => {
            let (min, max) = (*min, *max);
            let mut candidates = vec![min, max, 0.0, 1.0, -1.0];
            for &lit in literals {
                let lit = lit as f64;
                candidates.extend([lit - 1.0, lit, lit + 1.0]);
            }
            for v in candidates {
                if min <= v && v <= max {
                    push_unique(&mut out, Value::Float(v));
                }
            }
        }
        Domain::Str { alphabet, max_len } => {
            out.push(Value::Str(String::new()));
            if *max_len > 0 {
                let mut chars = alphabet.chars();
                if let Some(first) = chars.next() {
                    push_unique(&mut out, Value::Str(first.to_string()));
                    push_unique(&mut out, Value::Str(first.to_string().repeat(*max_len)));
                    if let Some(last) = chars.last() {
                        push_unique(&mut out, Value::Str(last.to_string()));
                    }
                }
            }
        }
        Domain::Seq { element, max_len } => {
            out.push(Value::Seq(Vec::new()));
            if *max_len > 0 {
                if let Some(first) = boundary_values(element, &[]).into_iter().next() {
                    push_unique(&mut out, Value::Seq(vec![first.clone()]));
                    push_unique(&mut out, Value::Seq(vec![first; *max_len]));
                }
            }
        }
        Domain::OneOf(values) => {
            for v in values {
                push_unique(&mut out, v.clone());
            }
        }
    }
    out
}

/// Draws one member of `domain`.
///
/// Numeric domains pick an edge value about 30% of the time and a uniform
/// member otherwise.
pub fn random_value(domain: &Domain, rng: &mut ChaCha8Rng) -> Value {
    match domain {
        Domain::Bool => Value::Bool(rng.gen_bool(0.5)),

        Domain::Int { min, max } => {
            if rng.gen_ratio(3, 10) {
                let edges = boundary_values(domain, &[]);
                edges[rng.gen_range(0..edges.len())].clone()
            } else {
                Value::Int(rng.gen_range(*min..=*max))
            }
        }

        Domain::Float { min, max } => {
            if rng.gen_ratio(3, 10) {
                let edges = boundary_values(domain, &[]);
                edges[rng.gen_range(0..edges.len())].clone()
            } else {
                Value::Float(rng.gen_range(*min..=*max))
            }
        }

        Domain::Str { alphabet, max_len } => {
            let chars: Vec<char> = alphabet.chars().collect();
            if chars.is_empty() {
                return Value::Str(String::new());
            }
            let len = rng.gen_range(0..=*max_len);
            Value::Str((0..len).map(|_| chars[rng.gen_range(0..chars.len())]).collect())
        }

        Domain::Seq { element, max_len } => {
            let len = rng.gen_range(0..=*max_len);
            Value::Seq((0..len).map(|_| random_value(element, rng)).collect())
        }

        Domain::OneOf(values) => values[rng.gen_range(0..values.len())].clone(),
    }
}

/// Cartesian product of `lists`, last list varying fastest, capped at
/// `limit` tuples. A zero-length `lists` yields the single empty tuple.
pub fn product(lists: &[Vec<Value>], limit: usize) -> Vec<Vec<Value>> {
    let mut out = Vec::new();
    if limit == 0 || lists.iter().any(Vec::is_empty) {
        return out;
    }
    let mut index = vec![0usize; lists.len()];
    loop {
        out.push(
            index
                .iter()
                .zip(lists)
                .map(|(&i, list)| list[i].clone())
                .collect(),
        );
        if out.len() == limit {
            return out;
        }
        // mixed-radix increment
        let mut pos = lists.len();
        loop {
            if pos == 0 {
                return out;
            }
            pos -= 1;
            index[pos] += 1;
            if index[pos] < lists[pos].len() {
                break;
            }
            index[pos] = 0;
        }
    }
}

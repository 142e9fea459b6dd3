//! Element recipes for in-process array backing.
//!
//! A generator yields the value of any element from its flat C-order index,
//! so a block can be computed without materializing the rest of the array.

use serde::{Deserialize, Serialize};

fn default_step() -> f64 { 1.0 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Generator {
    Zeros,
    Ones,
    Arange {
        #[serde(default)]
        start: f64,
        #[serde(default = "default_step")]
        step: f64,
    },
    Linspace { start: f64, stop: f64 },
    Literal { values: Vec<f64> },
}

impl Default for Generator {
    fn default() -> Self { Generator::Arange { start: 0.0, step: 1.0 } }
}

impl Generator {
    /// Value at flat index `i` of an array holding `total` elements.
    pub fn value_at(&self, i: usize, total: usize) -> f64 {
        match self {
            Generator::Zeros => 0.0,
            Generator::Ones => 1.0,
            Generator::Arange { start, step } => start + step * i as f64,
            Generator::Linspace { start, stop } => {
                if total <= 1 {
                    *start
                } else {
                    start + (stop - start) * (i as f64) / ((total - 1) as f64)
                }
            }
            Generator::Literal { values } => values.get(i).copied().unwrap_or(f64::NAN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_hits_both_ends() {
        let g = Generator::Linspace { start: -90.0, stop: 90.0 };
        assert_eq!(g.value_at(0, 5), -90.0);
        assert_eq!(g.value_at(2, 5), 0.0);
        assert_eq!(g.value_at(4, 5), 90.0);
    }

    #[test]
    fn arange_defaults_from_json() {
        let g: Generator = serde_json::from_str(r#"{"kind":"arange"}"#).unwrap();
        assert_eq!(g, Generator::Arange { start: 0.0, step: 1.0 });
        assert_eq!(g.value_at(7, 10), 7.0);
    }
}

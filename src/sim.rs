//! Seeded candidate simulator.
//!
//! Generates arrivals whose marginals match the scenario priors and whose
//! pairwise correlations follow the correlation table along a dependency
//! tree: each attribute is conditioned on its most-correlated earlier
//! attribute.  For a parent `i` and child `j` the joint probability comes
//! from the phi coefficient,
//!
//! ```text
//!   P(i ∧ j) = p_i p_j + rho * sqrt(p_i (1 - p_i) p_j (1 - p_j))
//! ```
//!
//! clamped into the Fréchet bounds so both conditionals are valid
//! probabilities.  Pairs that are not parent/child only get the correlation
//! implied through the tree.
//!
//! Same config and seed → same stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Candidate, CandidateSource, Combo, Result, ScenarioConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Link {
    /// Marginal, used when there is no parent.
    p: f64,
    parent: Option<usize>,
    /// `P(child | parent)`.
    p_with: f64,
    /// `P(child | !parent)`.
    p_without: f64,
}

/// Correlated Bernoulli candidate stream.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    rng: StdRng,
    links: Vec<Link>,
    limit: u64,
    emitted: u64,
}

impl SimulatedSource {
    /// A stream of at most `limit` candidates for `cfg`, seeded with `seed`.
    pub fn new(cfg: &ScenarioConfig, seed: u64, limit: u64) -> Result<Self> {
        let schema = cfg.validate()?;
        let k = schema.len();
        let corr = cfg.correlation_matrix(&schema);
        let priors: Vec<f64> = cfg.priors();

        let links = (0..k)
            .map(|j| {
                let pj = priors[j];
                let parent = (0..j)
                    .filter(|&i| corr[i * k + j] != 0.0)
                    .max_by(|&x, &y| corr[x * k + j].abs().total_cmp(&corr[y * k + j].abs()));
                let Some(i) = parent else {
                    return Link {
                        p: pj,
                        parent: None,
                        p_with: pj,
                        p_without: pj,
                    };
                };
                let pi = priors[i];
                let rho = corr[i * k + j];
                let spread = (pi * (1.0 - pi) * pj * (1.0 - pj)).sqrt();
                let lo = (pi + pj - 1.0).max(0.0);
                let hi = pi.min(pj);
                let joint = (pi * pj + rho * spread).clamp(lo, hi);
                let p_with = if pi > 0.0 { joint / pi } else { pj };
                let p_without = if pi < 1.0 { (pj - joint) / (1.0 - pi) } else { pj };
                Link {
                    p: pj,
                    parent: Some(i),
                    p_with: p_with.clamp(0.0, 1.0),
                    p_without: p_without.clamp(0.0, 1.0),
                }
            })
            .collect();

        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            links,
            limit,
            emitted: 0,
        })
    }

    /// Candidates produced so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Draw one attribute combination.
    pub fn sample_combo(&mut self) -> Combo {
        let mut c = Combo::EMPTY;
        for (j, link) in self.links.iter().enumerate() {
            let p = match link.parent {
                Some(i) if c.has(i) => link.p_with,
                Some(_) => link.p_without,
                None => link.p,
            };
            if self.rng.random::<f64>() < p {
                c = c.with(j);
            }
        }
        c
    }
}

impl Iterator for SimulatedSource {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        if self.emitted >= self.limit {
            return None;
        }
        let id = self.emitted;
        self.emitted += 1;
        Some(Candidate::new(self.sample_combo()).with_id(id))
    }
}

impl CandidateSource for SimulatedSource {
    fn next_candidate(&mut self) -> Result<Option<Candidate>> {
        Ok(self.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scenario;

    fn frequencies(src: &mut SimulatedSource, k: usize, n: usize) -> (Vec<f64>, Vec<Combo>) {
        let combos: Vec<Combo> = (0..n).map(|_| src.sample_combo()).collect();
        let f = (0..k)
            .map(|a| combos.iter().filter(|c| c.has(a)).count() as f64 / n as f64)
            .collect();
        (f, combos)
    }

    fn phi(combos: &[Combo], a: usize, b: usize) -> f64 {
        let n = combos.len() as f64;
        let pa = combos.iter().filter(|c| c.has(a)).count() as f64 / n;
        let pb = combos.iter().filter(|c| c.has(b)).count() as f64 / n;
        let pab = combos.iter().filter(|c| c.has(a) && c.has(b)).count() as f64 / n;
        (pab - pa * pb) / (pa * (1.0 - pa) * pb * (1.0 - pb)).sqrt()
    }

    #[test]
    fn marginals_track_priors() {
        let cfg = ScenarioConfig::preset(Scenario::SixAttributes);
        let mut src = SimulatedSource::new(&cfg, 7, 0).unwrap();
        let (f, _) = frequencies(&mut src, 6, 40_000);
        for (a, spec) in cfg.attributes.iter().enumerate() {
            assert!(
                (f[a] - spec.prior).abs() < 0.02,
                "{}: {} vs {}",
                spec.name,
                f[a],
                spec.prior
            );
        }
    }

    #[test]
    fn parent_child_correlation_is_reproduced() {
        let cfg = ScenarioConfig::preset(Scenario::SixAttributes);
        let mut src = SimulatedSource::new(&cfg, 11, 0).unwrap();
        let (_, combos) = frequencies(&mut src, 6, 40_000);
        // international / german_speaker, rho = -0.717.
        let r = phi(&combos, 1, 5);
        assert!((r + 0.717).abs() < 0.05, "phi={r}");
    }

    #[test]
    fn same_seed_same_stream() {
        let cfg = ScenarioConfig::preset(Scenario::FourAttributes);
        let a: Vec<_> = SimulatedSource::new(&cfg, 3, 200).unwrap().collect();
        let b: Vec<_> = SimulatedSource::new(&cfg, 3, 200).unwrap().collect();
        assert_eq!(a, b);
        let c: Vec<_> = SimulatedSource::new(&cfg, 4, 200).unwrap().collect();
        assert_ne!(a, c);
    }

    #[test]
    fn limit_is_honored_and_ids_are_sequential() {
        let cfg = ScenarioConfig::preset(Scenario::TwoAttributes);
        let mut src = SimulatedSource::new(&cfg, 0, 3).unwrap();
        let ids: Vec<_> = std::iter::from_fn(|| src.next_candidate().unwrap())
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(src.emitted(), 3);
    }

    #[test]
    fn degenerate_priors_are_respected() {
        let cfg = ScenarioConfig::new(
            vec![
                crate::AttributeSpec::new("never", 0, 0.0),
                crate::AttributeSpec::new("always", 0, 1.0),
            ],
            10,
        )
        .with_correlation("never", "always", 0.9);
        let mut src = SimulatedSource::new(&cfg, 1, 0).unwrap();
        for _ in 0..500 {
            let c = src.sample_combo();
            assert!(!c.has(0));
            assert!(c.has(1));
        }
    }
}

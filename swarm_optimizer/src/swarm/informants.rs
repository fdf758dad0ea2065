use rand::{Rng, seq::index};

use crate::prelude::*;

/// Indices of the particles that inform `particle`, not counting itself.
///
/// `count` must be at most `population - 1`; settings validation guarantees it.
/// Only the random topology consumes random draws.
pub(crate) fn select_informants<R: Rng + ?Sized>(
    topology: Topology,
    particle: usize,
    population: usize,
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    debug_assert!(particle < population);
    debug_assert!(count < population.max(1));
    match topology {
        Topology::Full => (0..population).filter(|&j| j != particle).collect(),
        Topology::Ring => (1..=count)
            .map(|k| {
                let offset = k.div_ceil(2);
                if k % 2 == 1 {
                    (particle + offset) % population
                } else {
                    (particle + population - offset) % population
                }
            })
            .collect(),
        Topology::Random if count == 0 => Vec::new(),
        Topology::Random => index::sample(rng, population - 1, count)
            .into_iter()
            // skip over the particle itself
            .map(|j| if j >= particle { j + 1 } else { j })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::{SeedableRng, rngs::StdRng};
    use test_case::test_case;

    use super::*;

    #[test_case(0, 5, 2, vec![1, 4]; "first particle")]
    #[test_case(4, 5, 4, vec![0, 3, 1, 2]; "wraps around")]
    #[test_case(2, 6, 3, vec![3, 1, 4]; "middle particle")]
    #[test_case(0, 1, 0, vec![]; "single particle")]
    fn test_ring_neighbours(particle: usize, population: usize, count: usize, expected: Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(0);
        let got = select_informants(Topology::Ring, particle, population, count, &mut rng);
        assert_eq!(got, expected);
    }

    #[test]
    fn test_full_topology_is_everyone_else() {
        let mut rng = StdRng::seed_from_u64(0);
        let got = select_informants(Topology::Full, 2, 5, 1, &mut rng);
        assert_eq!(got, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_random_informants_distinct_and_exclude_self() {
        let mut rng = StdRng::seed_from_u64(11);
        for particle in 0..10 {
            let mut got = select_informants(Topology::Random, particle, 10, 9, &mut rng);
            assert_eq!(got.len(), 9);
            assert!(!got.contains(&particle));
            got.sort_unstable();
            got.dedup();
            assert_eq!(got.len(), 9);
        }
    }
}

use crate::{errors::InvalidRange, Error};
use rand::Rng;

/// How the layers to optimize are picked for every image pair
#[derive(Clone, Debug, PartialEq)]
pub enum LayerSelection {
    /// Always the same layers, in this order
    Fixed(Vec<usize>),
    /// A fresh random sequence for every pair. The number of layers is drawn
    /// from `min_operations..max_operations`, and the layers themselves are
    /// distinct indices drawn from `min_layer..max_layer`.
    Random {
        min_operations: usize,
        max_operations: usize,
        min_layer: usize,
        max_layer: usize,
    },
}

impl Default for LayerSelection {
    fn default() -> Self {
        Self::Random {
            min_operations: 2,
            max_operations: 5,
            min_layer: 2,
            max_layer: 10,
        }
    }
}

fn invalid(name: &'static str, value: usize, min: usize, max: usize) -> Error {
    Error::InvalidRange(InvalidRange {
        min: min as f32,
        max: max as f32,
        value: value as f32,
        name,
    })
}

impl LayerSelection {
    /// Checks the selection against a provider with `layer_count` layers
    pub fn validate(&self, layer_count: usize) -> Result<(), Error> {
        match self {
            Self::Fixed(indices) => {
                if let Some(&index) = indices.iter().find(|&&i| i >= layer_count) {
                    return Err(Error::LayerOutOfRange {
                        index,
                        count: layer_count,
                    });
                }
            }
            Self::Random {
                min_operations,
                max_operations,
                min_layer,
                max_layer,
            } => {
                let (min_operations, max_operations) = (*min_operations, *max_operations);
                let (min_layer, max_layer) = (*min_layer, *max_layer);

                if max_layer > layer_count {
                    return Err(Error::LayerOutOfRange {
                        index: max_layer - 1,
                        count: layer_count,
                    });
                }

                if min_layer >= max_layer {
                    return Err(invalid("min-layer", min_layer, 0, max_layer.saturating_sub(1)));
                }

                if min_operations == 0 {
                    return Err(invalid("min-operations", min_operations, 1, max_operations));
                }

                // the operation count is drawn from a half open range, and
                // can never exceed the number of distinct layers available
                let available = max_layer - min_layer;
                if max_operations <= min_operations || max_operations - 1 > available {
                    return Err(invalid(
                        "max-operations",
                        max_operations,
                        min_operations + 1,
                        available + 1,
                    ));
                }
            }
        }

        Ok(())
    }

    /// Picks the sequence of layer indices for one pair. The selection must
    /// have been validated first.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        match self {
            Self::Fixed(indices) => indices.clone(),
            Self::Random {
                min_operations,
                max_operations,
                min_layer,
                max_layer,
            } => {
                let count = rng.gen_range(*min_operations..*max_operations);
                rand::seq::index::sample(rng, max_layer - min_layer, count)
                    .into_iter()
                    .map(|i| min_layer + i)
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn fixed_is_returned_as_is() {
        let sel = LayerSelection::Fixed(vec![3, 5, 9]);
        sel.validate(12).unwrap();
        assert_eq!(sel.choose(&mut Pcg32::seed_from_u64(0)), vec![3, 5, 9]);
    }

    #[test]
    fn random_stays_in_bounds() {
        let sel = LayerSelection::default();
        sel.validate(12).unwrap();
        let mut rng = Pcg32::seed_from_u64(42);

        for _ in 0..200 {
            let mut layers = sel.choose(&mut rng);
            assert!(layers.len() >= 2 && layers.len() < 5, "{:?}", layers);
            assert!(layers.iter().all(|&l| (2..10).contains(&l)));

            layers.sort_unstable();
            layers.dedup();
            assert!(layers.len() >= 2, "layers must be distinct");
        }
    }

    #[test]
    fn random_uses_every_count() {
        let sel = LayerSelection::default();
        let mut rng = Pcg32::seed_from_u64(7);

        let mut seen = [false; 5];
        for _ in 0..200 {
            seen[sel.choose(&mut rng).len()] = true;
        }
        assert_eq!(seen, [false, false, true, true, true]);
    }

    #[test]
    fn invalid_selections() {
        assert!(LayerSelection::Fixed(vec![1, 12]).validate(12).is_err());
        assert!(LayerSelection::default().validate(9).is_err());

        let random = |min_operations, max_operations, min_layer, max_layer| {
            LayerSelection::Random {
                min_operations,
                max_operations,
                min_layer,
                max_layer,
            }
        };

        assert!(random(2, 2, 0, 5).validate(12).is_err());
        assert!(random(0, 2, 0, 5).validate(12).is_err());
        assert!(random(1, 2, 5, 5).validate(12).is_err());
        assert!(random(1, 7, 0, 5).validate(12).is_err());
        assert!(random(1, 6, 0, 5).validate(12).is_ok());
    }
}

//! Gradient evaluation of arbitrarily large images by splitting them into
//! fixed size tiles.
//!
//! Each call rolls the image by a random offset before tiling, so tile seams
//! land in a different place every iteration instead of accumulating into a
//! visible grid. Every tile's gradient is normalized by its own standard
//! deviation, which bounds the memory needed per provider call at the cost
//! of the tiles no longer sharing a common gradient magnitude.

use crate::{
    provider::{GradientProvider, Layer},
    utils::{roll, std_dev},
    Error, Image,
};
use ndarray::s;
use rand::Rng;

pub(crate) const NORMALIZE_EPSILON: f64 = 1e-8;

/// Start offsets of the tiles along one axis of `len` samples.
///
/// Tiles start every `tile` samples while the start is below
/// `max(len - tile / 2, tile)`, so an axis shorter than a tile gets a single
/// tile covering all of it.
pub fn tile_origins(len: usize, tile: usize) -> impl Iterator<Item = usize> {
    let end = len.saturating_sub(tile / 2).max(tile);
    (0..end).step_by(tile.max(1))
}

pub struct TiledGradient<'a, P: ?Sized> {
    provider: &'a P,
    tile_size: usize,
}

impl<'a, P: GradientProvider + ?Sized> TiledGradient<'a, P> {
    pub fn new(provider: &'a P, tile_size: usize) -> Self {
        Self {
            provider,
            tile_size,
        }
    }

    /// Computes the gradient of `layer` for the whole `image`. The output has
    /// the same shape as the input.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        layer: &Layer,
        image: &Image,
        rng: &mut R,
    ) -> Result<Image, Error> {
        let tile = self.tile_size;
        let shift_x = rng.gen_range(0..tile) as isize;
        let shift_y = rng.gen_range(0..tile) as isize;

        let shifted = roll(image, shift_y, shift_x);
        let (height, width, _) = shifted.dim();
        let mut gradient = Image::zeros(shifted.raw_dim());

        for y in tile_origins(height, tile) {
            let y_end = (y + tile).min(height);

            for x in tile_origins(width, tile) {
                let x_end = (x + tile).min(width);

                let sub = shifted.slice(s![y..y_end, x..x_end, ..]);
                let mut tile_gradient = self.provider.gradient(layer, sub)?;

                if tile_gradient.dim() != sub.dim() {
                    return Err(Error::GradientShape {
                        expected: sub.dim(),
                        actual: tile_gradient.dim(),
                    });
                }

                let denom = std_dev(&tile_gradient) + NORMALIZE_EPSILON;
                tile_gradient.mapv_inplace(|g| (f64::from(g) / denom) as f32);

                gradient
                    .slice_mut(s![y..y_end, x..x_end, ..])
                    .assign(&tile_gradient);
            }
        }

        Ok(roll(&gradient, -shift_y, -shift_x))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::ArrayView3;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::sync::Mutex;

    struct Recorder {
        layers: Vec<Layer>,
        shapes: Mutex<Vec<(usize, usize, usize)>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                layers: vec![Layer::new(0, "identity")],
                shapes: Mutex::new(Vec::new()),
            }
        }
    }

    impl GradientProvider for Recorder {
        fn layers(&self) -> &[Layer] {
            &self.layers
        }

        fn gradient(&self, _layer: &Layer, image: ArrayView3<'_, f32>) -> Result<Image, Error> {
            self.shapes.lock().unwrap().push(image.dim());
            Ok(image.to_owned())
        }
    }

    struct Broken;

    impl GradientProvider for Broken {
        fn layers(&self) -> &[Layer] {
            &[]
        }

        fn gradient(&self, _layer: &Layer, image: ArrayView3<'_, f32>) -> Result<Image, Error> {
            let (h, w, _) = image.dim();
            Ok(Image::zeros((h + 1, w, 3)))
        }
    }

    fn noise(height: usize, width: usize, seed: u64) -> Image {
        let mut rng = Pcg32::seed_from_u64(seed);
        Image::from_shape_fn((height, width, 3), |_| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn origins() {
        assert_eq!(tile_origins(10, 256).collect::<Vec<_>>(), vec![0]);
        assert_eq!(tile_origins(300, 256).collect::<Vec<_>>(), vec![0]);
        assert_eq!(tile_origins(400, 256).collect::<Vec<_>>(), vec![0, 256]);
        assert_eq!(tile_origins(512, 256).collect::<Vec<_>>(), vec![0, 256]);
        assert_eq!(tile_origins(700, 256).collect::<Vec<_>>(), vec![0, 256, 512]);
    }

    #[test]
    fn output_matches_input_shape() {
        let provider = Recorder::new();
        let tiled = TiledGradient::new(&provider, 16);
        let layer = provider.layers[0].clone();
        let mut rng = Pcg32::seed_from_u64(7);

        for &(h, w) in &[(1, 1), (5, 40), (16, 16), (33, 17), (50, 71)] {
            let img = noise(h, w, (h * w) as u64);
            let grad = tiled.evaluate(&layer, &img, &mut rng).unwrap();
            assert_eq!(grad.dim(), img.dim());
            assert!(grad.iter().all(|g| g.is_finite()));
        }
    }

    #[test]
    fn small_images_are_a_single_tile() {
        let provider = Recorder::new();
        let tiled = TiledGradient::new(&provider, 64);
        let layer = provider.layers[0].clone();

        tiled
            .evaluate(&layer, &noise(20, 30, 1), &mut Pcg32::seed_from_u64(2))
            .unwrap();

        assert_eq!(*provider.shapes.lock().unwrap(), vec![(20, 30, 3)]);
    }

    #[test]
    fn tiles_follow_the_grid() {
        let provider = Recorder::new();
        let tiled = TiledGradient::new(&provider, 16);
        let layer = provider.layers[0].clone();

        tiled
            .evaluate(&layer, &noise(45, 30, 3), &mut Pcg32::seed_from_u64(4))
            .unwrap();

        assert_eq!(
            *provider.shapes.lock().unwrap(),
            vec![
                (16, 16, 3),
                (16, 14, 3),
                (16, 16, 3),
                (16, 14, 3),
                (13, 16, 3),
                (13, 14, 3)
            ]
        );
    }

    #[test]
    fn single_tile_gradient_is_normalized() {
        let provider = Recorder::new();
        let tiled = TiledGradient::new(&provider, 64);
        let layer = provider.layers[0].clone();
        let img = noise(32, 48, 9).mapv(|v| v * 250.0);

        let grad = tiled
            .evaluate(&layer, &img, &mut Pcg32::seed_from_u64(10))
            .unwrap();

        assert!((std_dev(&grad) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn constant_tiles_stay_finite() {
        let provider = Recorder::new();
        let tiled = TiledGradient::new(&provider, 8);
        let layer = provider.layers[0].clone();
        let img = Image::zeros((20, 20, 3));

        let grad = tiled
            .evaluate(&layer, &img, &mut Pcg32::seed_from_u64(11))
            .unwrap();

        assert!(grad.iter().all(|&g| g == 0.0));
    }

    #[test]
    fn malformed_gradients_are_rejected() {
        let tiled = TiledGradient::new(&Broken, 8);
        let res = tiled.evaluate(
            &Layer::new(0, "broken"),
            &Image::zeros((4, 4, 3)),
            &mut Pcg32::seed_from_u64(0),
        );

        match res {
            Err(Error::GradientShape { expected, actual }) => {
                assert_eq!(expected, (4, 4, 3));
                assert_eq!(actual, (5, 4, 3));
            }
            _ => panic!("expected a gradient shape error"),
        }
    }
}

use log::debug;
use ndarray::Zip;
use rand::Rng;

use crate::{
    errors::SizeMismatch,
    img_pyramid::OctavePyramid,
    provider::{GradientProvider, Layer},
    tiling::{TiledGradient, NORMALIZE_EPSILON},
    utils::{blur, resize_to, spatial_dims, std_dev},
    Error, Image, ProgressStat,
};

/// Parameters of a single gradient ascent pass over an image pair
#[derive(Clone, Debug)]
pub struct DreamParams {
    /// Number of ascent steps taken at every octave
    pub iterations: u32,
    /// Size of each ascent step, relative to the gradient's standard deviation
    pub step_size: f32,
    /// Scale applied between two consecutive octaves, in (0, 1)
    pub rescale_factor: f32,
    /// Number of times the image is downscaled before ascent starts
    pub levels: u32,
    /// Weight of the original image when blending in an upscaled octave
    pub blend: f32,
    /// Sigma of the Gaussian blur applied to gradients and before downscaling
    pub blur_sigma: f32,
    /// Edge length of the square tiles handed to the gradient provider
    pub tile_size: usize,
}

impl Default for DreamParams {
    fn default() -> Self {
        Self {
            iterations: 15,
            step_size: 2.0,
            rescale_factor: 0.7,
            levels: 5,
            blend: 0.25,
            blur_sigma: 0.5,
            tile_size: 256,
        }
    }
}

/// Progress of an ascent pass, `octave` counts from the coarsest level
#[derive(Clone, Copy, Debug)]
pub struct StepUpdate {
    pub octave: ProgressStat,
    pub iteration: ProgressStat,
}

fn check_pair(primary: &Image, companion: &Image) -> Result<(), Error> {
    if primary.dim() != companion.dim() {
        return Err(Error::SizeMismatch(SizeMismatch {
            primary: spatial_dims(primary),
            companion: spatial_dims(companion),
        }));
    }

    Ok(())
}

fn blend(original: &Image, upscaled: &Image, weight: f32) -> Image {
    Zip::from(original)
        .and(upscaled)
        .map_collect(|&o, &u| weight * o + (1.0 - weight) * u)
}

/// Runs gradient ascent on an image pair. The primary image drives the
/// gradient, the companion receives exactly the same updates.
pub struct Dreamer<'a, P: ?Sized> {
    tiled: TiledGradient<'a, P>,
    params: &'a DreamParams,
}

impl<'a, P: GradientProvider + ?Sized> Dreamer<'a, P> {
    pub fn new(provider: &'a P, params: &'a DreamParams) -> Self {
        Self {
            tiled: TiledGradient::new(provider, params.tile_size),
            params,
        }
    }

    /// Takes `iterations` ascent steps at the current resolution and returns
    /// the updated copies of `image` and `companion`.
    pub fn optimize<R, F>(
        &self,
        layer: &Layer,
        image: &Image,
        companion: &Image,
        rng: &mut R,
        mut on_iteration: F,
    ) -> Result<(Image, Image), Error>
    where
        R: Rng + ?Sized,
        F: FnMut(ProgressStat),
    {
        check_pair(image, companion)?;

        let mut image = image.clone();
        let mut companion = companion.clone();
        let iterations = self.params.iterations as usize;

        for i in 0..iterations {
            let gradient = self.tiled.evaluate(layer, &image, rng)?;
            let gradient = blur(&gradient, self.params.blur_sigma);

            let scale = f64::from(self.params.step_size) / (std_dev(&gradient) + NORMALIZE_EPSILON);
            let delta = gradient.mapv(|g| (f64::from(g) * scale) as f32);

            image += &delta;
            companion += &delta;

            on_iteration(ProgressStat {
                current: i + 1,
                total: iterations,
            });
        }

        Ok((image, companion))
    }

    /// Optimizes the pair coarse to fine over `levels + 1` octaves.
    ///
    /// The coarsest octave is optimized first. Each result is then upscaled
    /// to the next finer octave, blended with that octave's original pixels
    /// and optimized again, until the full resolution is reached.
    pub fn recurse<R, F>(
        &self,
        layer: &Layer,
        image: &Image,
        companion: &Image,
        rng: &mut R,
        mut on_step: F,
    ) -> Result<(Image, Image), Error>
    where
        R: Rng + ?Sized,
        F: FnMut(StepUpdate),
    {
        check_pair(image, companion)?;

        let params = self.params;
        let pyramid = OctavePyramid::new(
            image.clone(),
            companion.clone(),
            params.levels,
            params.rescale_factor,
            params.blur_sigma,
        );

        let total = pyramid.pyramid.len();
        let octave = |level: usize| ProgressStat {
            current: total - level,
            total,
        };

        let top = pyramid.top();
        debug!("octave {} of {} at {:?}", 1, total, top.dims());
        let (mut primary, mut companion) =
            self.optimize(layer, &top.primary, &top.companion, rng, |iteration| {
                on_step(StepUpdate {
                    octave: octave(pyramid.levels()),
                    iteration,
                })
            })?;

        for level in (0..pyramid.levels()).rev() {
            let original = &pyramid.pyramid[level];
            let dims = original.dims();
            debug!("octave {} of {} at {:?}", total - level, total, dims);

            let blended_primary = blend(&original.primary, &resize_to(&primary, dims), params.blend);
            let blended_companion =
                blend(&original.companion, &resize_to(&companion, dims), params.blend);

            let (p, c) = self.optimize(
                layer,
                &blended_primary,
                &blended_companion,
                rng,
                |iteration| {
                    on_step(StepUpdate {
                        octave: octave(level),
                        iteration,
                    })
                },
            )?;
            primary = p;
            companion = c;
        }

        Ok((primary, companion))
    }
}

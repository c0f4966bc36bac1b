//! A gradient provider built from a fixed bank of oriented Gabor filters.
//!
//! Every layer projects the color channels onto a single color axis and
//! filters the result with two perpendicular zero-mean Gabor kernels at one
//! scale. The layer's activation is the mean squared filter response, whose
//! gradient with respect to the input pixels is computed analytically. Later
//! layers use larger kernels, so like a convolutional network they respond to
//! coarser structure.

use crate::{
    provider::{GradientProvider, Layer},
    Error, Image,
};
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use std::f32::consts::PI;

const COLOR_AXES: [[f32; 3]; 4] = [
    [0.577, 0.577, 0.577],
    [0.707, -0.707, 0.0],
    [0.0, 0.707, -0.707],
    [0.707, 0.0, -0.707],
];

#[derive(Clone)]
struct Kernel {
    radius: usize,
    weights: Array2<f32>,
}

impl Kernel {
    fn gabor(sigma: f32, wavelength: f32, theta: f32) -> Self {
        let radius = (2.5 * sigma).ceil() as usize;
        let size = 2 * radius + 1;
        let (sin, cos) = theta.sin_cos();

        let mut weights = Array2::from_shape_fn((size, size), |(y, x)| {
            let dy = y as f32 - radius as f32;
            let dx = x as f32 - radius as f32;
            let along = dx * cos + dy * sin;
            let across = -dx * sin + dy * cos;

            let envelope = (-(along * along + across * across) / (2.0 * sigma * sigma)).exp();
            envelope * (2.0 * PI * along / wavelength).cos()
        });

        // zero mean, so flat regions don't respond
        let mean = weights.mean().unwrap_or(0.0);
        weights.mapv_inplace(|w| w - mean);
        let norm = weights.iter().map(|w| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            weights.mapv_inplace(|w| w / norm);
        }

        Self { radius, weights }
    }

    fn flipped(&self) -> Self {
        let mut weights = self.weights.clone();
        weights.invert_axis(Axis(0));
        weights.invert_axis(Axis(1));

        Self {
            radius: self.radius,
            weights,
        }
    }

    /// Cross-correlation with zero padding, the output has the input's shape
    fn correlate(&self, src: ArrayView2<'_, f32>) -> Array2<f32> {
        let (height, width) = src.dim();
        let r = self.radius as isize;

        Array2::from_shape_fn((height, width), |(y, x)| {
            let mut acc = 0.0;
            for ((ky, kx), w) in self.weights.indexed_iter() {
                let sy = y as isize + ky as isize - r;
                let sx = x as isize + kx as isize - r;
                if sy >= 0 && sx >= 0 && (sy as usize) < height && (sx as usize) < width {
                    acc += w * src[[sy as usize, sx as usize]];
                }
            }
            acc
        })
    }
}

struct LayerFilters {
    color: [f32; 3],
    kernels: Vec<(Kernel, Kernel)>,
}

impl LayerFilters {
    fn project(&self, image: &ArrayView3<'_, f32>) -> Array2<f32> {
        let (height, width, _) = image.dim();
        Array2::from_shape_fn((height, width), |(y, x)| {
            (0..3).map(|c| self.color[c] * image[[y, x, c]]).sum::<f32>()
        })
    }
}

/// A `GradientProvider` made of hand built filters instead of a trained
/// network
pub struct FilterBank {
    layers: Vec<Layer>,
    filters: Vec<LayerFilters>,
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new(12)
    }
}

impl FilterBank {
    /// Creates a bank with `count` layers, ordered from fine to coarse
    pub fn new(count: usize) -> Self {
        let mut layers = Vec::with_capacity(count);
        let mut filters = Vec::with_capacity(count);

        for i in 0..count {
            let sigma = 0.8 + 0.2 * i as f32;
            let wavelength = 3.0 * sigma;
            // spread the orientations out so neighbouring layers differ
            let theta = (i as f32 * 0.6) % PI;

            let first = Kernel::gabor(sigma, wavelength, theta);
            let second = Kernel::gabor(sigma, wavelength, theta + PI / 2.0);

            layers.push(Layer::new(
                i,
                format!("gabor_s{:.1}_{:03}", sigma, theta.to_degrees().round() as u32),
            ));
            filters.push(LayerFilters {
                color: COLOR_AXES[i % COLOR_AXES.len()],
                kernels: vec![
                    (first.flipped(), first),
                    (second.flipped(), second),
                ],
            });
        }

        Self { layers, filters }
    }

    fn filters(&self, layer: &Layer) -> Result<&LayerFilters, Error> {
        self.filters.get(layer.index).ok_or(Error::LayerOutOfRange {
            index: layer.index,
            count: self.filters.len(),
        })
    }

    /// The mean squared filter response of `layer` for `image`
    pub fn activation(&self, layer: &Layer, image: ArrayView3<'_, f32>) -> Result<f64, Error> {
        let filters = self.filters(layer)?;
        let projected = filters.project(&image);
        let count = (projected.len() * filters.kernels.len()) as f64;

        let total: f64 = filters
            .kernels
            .iter()
            .map(|(_, kernel)| {
                kernel
                    .correlate(projected.view())
                    .iter()
                    .map(|&r| f64::from(r) * f64::from(r))
                    .sum::<f64>()
            })
            .sum();

        Ok(total / count)
    }
}

impl GradientProvider for FilterBank {
    fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn gradient(&self, layer: &Layer, image: ArrayView3<'_, f32>) -> Result<Image, Error> {
        if image.dim().2 != 3 {
            return Err(Error::Provider(format!(
                "expected 3 channels, got {}",
                image.dim().2
            )));
        }

        let filters = self.filters(layer)?;
        let projected = filters.project(&image);
        let (height, width) = projected.dim();

        let mut back = Array2::<f32>::zeros((height, width));
        for (flipped, kernel) in &filters.kernels {
            let response = kernel.correlate(projected.view());
            // correlating with the flipped kernel applies the transpose
            back += &flipped.correlate(response.view());
        }

        let scale = 2.0 / (projected.len() * filters.kernels.len()) as f32;
        Ok(Image::from_shape_fn((height, width, 3), |(y, x, c)| {
            scale * filters.color[c] * back[[y, x]]
        }))
    }
}

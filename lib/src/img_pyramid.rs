use crate::{
    utils::{blur, resize_to, scaled_dims, spatial_dims},
    Image,
};

/// A primary image and its companion at one resolution
#[derive(Clone)]
pub struct Octave {
    pub primary: Image,
    pub companion: Image,
}

impl Octave {
    pub fn dims(&self) -> (usize, usize) {
        spatial_dims(&self.primary)
    }
}

/// Snapshots of an image pair at successively coarser resolutions.
///
/// Level 0 is the pair as given, every following level is the previous one
/// blurred and then downscaled by the rescale factor. Both images of a level
/// always share the same dimensions.
#[derive(Clone)]
pub struct OctavePyramid {
    pub pyramid: Vec<Octave>,
}

impl OctavePyramid {
    pub fn new(
        primary: Image,
        companion: Image,
        levels: u32,
        rescale_factor: f32,
        blur_sigma: f32,
    ) -> Self {
        Self {
            pyramid: Self::build_gaussian(
                levels,
                Octave { primary, companion },
                rescale_factor,
                blur_sigma,
            ),
        }
    }

    fn build_gaussian(
        levels: u32,
        original: Octave,
        rescale_factor: f32,
        blur_sigma: f32,
    ) -> Vec<Octave> {
        let mut octaves = Vec::with_capacity(levels as usize + 1);
        octaves.push(original);

        for _ in 0..levels {
            let finer = &octaves[octaves.len() - 1];
            let dims = scaled_dims(finer.dims(), rescale_factor);

            let coarser = Octave {
                primary: resize_to(&blur(&finer.primary, blur_sigma), dims),
                companion: resize_to(&blur(&finer.companion, blur_sigma), dims),
            };
            octaves.push(coarser);
        }

        octaves
    }

    /// The number of times the original pair was downscaled
    pub fn levels(&self) -> usize {
        self.pyramid.len() - 1
    }

    /// The full resolution pair
    pub fn bottom(&self) -> &Octave {
        &self.pyramid[0]
    }

    /// The coarsest pair
    pub fn top(&self) -> &Octave {
        &self.pyramid[self.pyramid.len() - 1]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn pair(height: usize, width: usize) -> (Image, Image) {
        let primary = Image::from_shape_fn((height, width, 3), |(y, x, c)| (y + x + c) as f32);
        let companion = primary.mapv(|v| v * 0.5);
        (primary, companion)
    }

    #[test]
    fn level_zero_is_the_input() {
        let (p, c) = pair(10, 12);
        let pyr = OctavePyramid::new(p.clone(), c.clone(), 0, 0.7, 0.5);

        assert_eq!(pyr.levels(), 0);
        assert_eq!(pyr.top().primary, p);
        assert_eq!(pyr.bottom().companion, c);
    }

    #[test]
    fn levels_shrink_by_the_factor() {
        let (p, c) = pair(100, 60);
        let pyr = OctavePyramid::new(p, c, 3, 0.5, 0.5);

        let dims: Vec<_> = pyr.pyramid.iter().map(Octave::dims).collect();
        assert_eq!(dims, vec![(100, 60), (50, 30), (25, 15), (13, 8)]);

        for octave in &pyr.pyramid {
            assert_eq!(octave.primary.dim(), octave.companion.dim());
        }
    }

    proptest! {
        #[test]
        fn upscaling_restores_every_level(
            height in 1usize..48,
            width in 1usize..48,
            levels in 0u32..=5,
            factor in 0.05f32..0.99,
        ) {
            let (p, c) = pair(height, width);
            let pyr = OctavePyramid::new(p, c, levels, factor, 0.5);
            prop_assert_eq!(pyr.levels(), levels as usize);

            for w in pyr.pyramid.windows(2) {
                let restored = resize_to(&w[1].primary, w[0].dims());
                prop_assert_eq!(restored.dim(), w[0].primary.dim());
            }
        }
    }
}

use crate::{Error, Image};
use image::imageops::{self, FilterType};
use ndarray::{s, ArrayBase, Data, Dimension};
use std::path::Path;

/// Helper type used to define the source of an input image's data
#[derive(Clone)]
pub enum ImageSource<'a> {
    /// A raw buffer of image data, see `image::load_from_memory` for details
    /// on what is supported
    Memory(&'a [u8]),
    /// The path to an image to load from disk. The image format is inferred
    /// from the file extension, see `image::open` for details
    Path(&'a Path),
    /// An already loaded image
    Image(image::DynamicImage),
}

impl<'a> ImageSource<'a> {
    pub fn from_path(path: &'a Path) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<image::DynamicImage> for ImageSource<'a> {
    fn from(img: image::DynamicImage) -> Self {
        Self::Image(img)
    }
}

impl<'a, S> From<&'a S> for ImageSource<'a>
where
    S: AsRef<Path> + 'a,
{
    fn from(path: &'a S) -> Self {
        Self::Path(path.as_ref())
    }
}

pub fn load_dynamic_image(src: ImageSource<'_>) -> Result<image::DynamicImage, image::ImageError> {
    match src {
        ImageSource::Memory(data) => image::load_from_memory(data),
        ImageSource::Path(path) => image::open(path),
        ImageSource::Image(img) => Ok(img),
    }
}

/// Loads an image as a `height x width x 3` array of floating point samples
/// in the 0-255 range. Any alpha channel is dropped.
pub fn load_image(src: ImageSource<'_>) -> Result<Image, Error> {
    let rgb = load_dynamic_image(src)?.to_rgb();
    let (width, height) = rgb.dimensions();

    Ok(Image::from_shape_fn(
        (height as usize, width as usize, 3),
        |(y, x, c)| f32::from(rgb.get_pixel(x as u32, y as u32)[c]),
    ))
}

/// Quantizes an image to 8 bits per channel. Samples are clamped to 0-255
/// and truncated, values outside that range are only ever lost here.
pub fn to_rgb_image(image: &Image) -> image::RgbImage {
    let (height, width, _) = image.dim();
    let quantize = |v: f32| v.max(0.0).min(255.0) as u8;

    image::RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        image::Rgb([
            quantize(image[[y, x, 0]]),
            quantize(image[[y, x, 1]]),
            quantize(image[[y, x, 2]]),
        ])
    })
}

/// Saves an image, the format is inferred from the extension of the path.
/// Parent directories are created if they don't exist.
pub fn save_image<P: AsRef<Path>>(image: &Image, path: P) -> Result<(), Error> {
    let path = path.as_ref();
    if let Some(parent_path) = path.parent() {
        std::fs::create_dir_all(parent_path)?;
    }

    to_rgb_image(image).save(path)?;
    Ok(())
}

/// Toroidal shift of the two spatial axes, contents that fall off one edge
/// wrap around to the opposite edge. Shifts may be negative or exceed the
/// dimensions.
pub fn roll<S>(image: &ArrayBase<S, ndarray::Ix3>, shift_y: isize, shift_x: isize) -> Image
where
    S: Data<Elem = f32>,
{
    let (height, width, _) = image.dim();
    let mut out = Image::zeros(image.raw_dim());
    if height == 0 || width == 0 {
        return out;
    }

    let sy = shift_y.rem_euclid(height as isize) as usize;
    let sx = shift_x.rem_euclid(width as isize) as usize;
    let (ry, rx) = (height - sy, width - sx);

    out.slice_mut(s![sy.., sx.., ..])
        .assign(&image.slice(s![..ry, ..rx, ..]));
    out.slice_mut(s![sy.., ..sx, ..])
        .assign(&image.slice(s![..ry, rx.., ..]));
    out.slice_mut(s![..sy, sx.., ..])
        .assign(&image.slice(s![ry.., ..rx, ..]));
    out.slice_mut(s![..sy, ..sx, ..])
        .assign(&image.slice(s![ry.., rx.., ..]));

    out
}

/// Population standard deviation over every element
pub fn std_dev<S, D>(array: &ArrayBase<S, D>) -> f64
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    if array.is_empty() {
        return 0.0;
    }

    f64::from(array.std(0.0))
}

type FloatImage = image::ImageBuffer<image::Rgb<f32>, Vec<f32>>;

fn to_float_image(image: &Image, offset: f32) -> FloatImage {
    let (height, width, _) = image.dim();
    FloatImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        image::Rgb([
            image[[y, x, 0]] - offset,
            image[[y, x, 1]] - offset,
            image[[y, x, 2]] - offset,
        ])
    })
}

fn from_float_image(buffer: &FloatImage, offset: f32) -> Image {
    let (width, height) = buffer.dimensions();
    Image::from_shape_fn((height as usize, width as usize, 3), |(y, x, c)| {
        buffer.get_pixel(x as u32, y as u32)[c] + offset
    })
}

// The samplers of `image::imageops` clamp every sample to `0..=MAX`, so
// negative arrays are shifted up for the duration of the filter. Both filters
// are weighted averages, which makes the shift exact to undo.
fn resample<F>(image: &Image, filter: F) -> Image
where
    F: FnOnce(&FloatImage) -> FloatImage,
{
    let min = image.iter().cloned().fold(f32::INFINITY, f32::min);
    let offset = if min.is_finite() { min.min(0.0) } else { 0.0 };

    from_float_image(&filter(&to_float_image(image, offset)), offset)
}

/// Gaussian blur along the height and width axes only, each channel is
/// smoothed independently. A `sigma` of 0 returns the image unchanged.
pub fn blur(image: &Image, sigma: f32) -> Image {
    if sigma <= 0.0 {
        return image.clone();
    }

    resample(image, |buffer| imageops::blur(buffer, sigma))
}

/// Linear resize to exactly `(height, width)`
pub fn resize_to(image: &Image, (height, width): (usize, usize)) -> Image {
    if spatial_dims(image) == (height, width) {
        return image.clone();
    }

    resample(image, |buffer| {
        imageops::resize(buffer, width as u32, height as u32, FilterType::Triangle)
    })
}

/// The `(height, width)` of an image scaled by `factor`, never smaller than 1x1
pub fn scaled_dims((height, width): (usize, usize), factor: f32) -> (usize, usize) {
    let scale = |d: usize| ((d as f32 * factor).round() as usize).max(1);
    (scale(height), scale(width))
}

#[inline]
pub(crate) fn spatial_dims(image: &Image) -> (usize, usize) {
    let (height, width, _) = image.dim();
    (height, width)
}

use crate::{Error, Image};
use ndarray::ArrayView3;

/// A handle to one of the activations a `GradientProvider` can maximize.
///
/// The index is stable for the lifetime of the provider, and is what layer
/// selections refer to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    pub index: usize,
    pub name: String,
}

impl Layer {
    pub fn new<S: Into<String>>(index: usize, name: S) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

/// Computes the gradient of a layer's mean activation with respect to the
/// pixels of an input image.
///
/// Implementations are only ever asked about tiles no larger than the
/// configured tile size, and must return a gradient with exactly the same
/// shape as the image they were given. They may be called concurrently from
/// several threads when a session processes multiple pairs in parallel.
pub trait GradientProvider: Sync {
    /// The ordered list of layers this provider can evaluate
    fn layers(&self) -> &[Layer];

    /// The gradient of `layer`'s mean activation for `image`, which is
    /// `height x width x 3`
    fn gradient(&self, layer: &Layer, image: ArrayView3<'_, f32>) -> Result<Image, Error>;

    /// Looks up a layer by its index
    fn layer(&self, index: usize) -> Result<&Layer, Error> {
        let layers = self.layers();
        layers.get(index).ok_or(Error::LayerOutOfRange {
            index,
            count: layers.len(),
        })
    }
}

impl<'a, P: GradientProvider + ?Sized> GradientProvider for &'a P {
    fn layers(&self) -> &[Layer] {
        (**self).layers()
    }

    fn gradient(&self, layer: &Layer, image: ArrayView3<'_, f32>) -> Result<Image, Error> {
        (**self).gradient(layer, image)
    }
}

impl<P: GradientProvider + ?Sized> GradientProvider for Box<P> {
    fn layers(&self) -> &[Layer] {
        (**self).layers()
    }

    fn gradient(&self, layer: &Layer, image: ArrayView3<'_, f32>) -> Result<Image, Error> {
        (**self).gradient(layer, image)
    }
}

use std::fmt;

#[derive(Debug)]
pub struct InvalidRange {
    pub(crate) min: f32,
    pub(crate) max: f32,
    pub(crate) value: f32,
    pub(crate) name: &'static str,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' - value '{}' is outside the range of {}-{}",
            self.name, self.value, self.min, self.max
        )
    }
}

#[derive(Debug)]
pub struct SizeMismatch {
    pub(crate) primary: (usize, usize),
    pub(crate) companion: (usize, usize),
}

impl fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the primary image size ({}x{}) must match the companion image size ({}x{})",
            self.primary.1, self.primary.0, self.companion.1, self.companion.0
        )
    }
}

#[derive(Debug)]
pub enum Error {
    /// An error in the image library occurred, eg failed to load/save
    Image(image::ImageError),
    /// An input parameter had an invalid range specified
    InvalidRange(InvalidRange),
    /// The primary and companion images of a pair must be the same size.
    ///
    /// Both images receive the very same gradient array at every step, so a
    /// pair whose images differ in size is rejected before any work is done
    /// rather than failing midway through the ascent.
    SizeMismatch(SizeMismatch),
    /// A gradient provider returned a gradient whose shape differs from the
    /// image it was asked about, as `(height, width, channels)`
    GradientShape {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },
    /// The gradient provider failed to evaluate a layer
    Provider(String),
    /// A layer index doesn't exist in the provider's layer list
    LayerOutOfRange { index: usize, count: usize },
    /// Io is notoriously error free with no problems, but we cover it just in case!
    Io(std::io::Error),
    /// The input directories did not contain a single pair of images
    NoImages,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(ie) => write!(f, "{}", ie),
            Self::InvalidRange(ir) => write!(f, "{}", ir),
            Self::SizeMismatch(sm) => write!(f, "{}", sm),
            Self::GradientShape { expected, actual } => write!(
                f,
                "gradient shape {}x{}x{} doesn't match the image shape {}x{}x{}",
                actual.0, actual.1, actual.2, expected.0, expected.1, expected.2
            ),
            Self::Provider(msg) => write!(f, "gradient provider failed: {}", msg),
            Self::LayerOutOfRange { index, count } => write!(
                f,
                "layer index {} is out of range, the provider only has {} layer(s)",
                index, count
            ),
            Self::Io(io) => write!(f, "{}", io),
            Self::NoImages => write!(
                f,
                "at least 1 pair of images must be available in the input directories"
            ),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(ie: image::ImageError) -> Self {
        Self::Image(ie)
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::Io(io)
    }
}

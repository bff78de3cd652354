use image::{DynamicImage, ImageDecoder, ImageError, ImageFormat, ImageReader, RgbaImage};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use url::Url;

/// Display-ready bitmap produced by decoding a downloaded image
///
/// Pixels are stored as 8-bit RGBA, first frame only, with any EXIF
/// orientation already applied.
#[derive(Clone)]
pub struct DecodedImage {
    bitmap: RgbaImage,
}

impl DecodedImage {
    /// Decodes an encoded image (PNG, JPEG, GIF, BMP) from memory
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(ImageError::IoError)?
            .into_decoder()?;
        let orientation = decoder.orientation()?;

        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);
        Ok(Self {
            bitmap: image.into_rgba8(),
        })
    }

    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    /// Raw RGBA pixel data, row-major
    pub fn pixels(&self) -> &[u8] {
        self.bitmap.as_raw()
    }

    /// Re-encodes the bitmap as PNG
    pub fn to_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut out = Cursor::new(Vec::new());
        self.bitmap.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Writes the bitmap to `path` as PNG
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        self.bitmap.save_with_format(path, ImageFormat::Png)
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// A successfully downloaded and decoded image
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// URL the image was fetched from
    pub source_url: Url,

    /// Decoded bitmap
    pub image: DecodedImage,
}

impl DownloadResult {
    pub fn new(source_url: Url, image: DecodedImage) -> Self {
        Self { source_url, image }
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Image links found in the source document
    pub discovered: usize,

    /// Images appended to the collection
    pub downloaded: usize,

    /// Images that failed to fetch or decode
    pub failed: usize,
}

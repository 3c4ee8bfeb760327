//! Captured sensor frames.

/// Shape of a frame as `(rows, cols, channels)`.
pub type FrameShape = (usize, usize, usize);

/// One capture of `rows x cols x channels` bytes.
///
/// Pixels are stored row-major with interleaved channels, so the byte
/// for `(row, col, channel)` lives at `(row * cols + col) * channels + channel`.
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    rows: usize,
    cols: usize,
    channels: usize,
    /// Capture counter.
    sequence: u64,
}

impl Frame {
    /// Wraps a pixel buffer. Use [`Frame::is_valid`] to check the buffer against the shape.
    pub fn new(pixels: Vec<u8>, rows: usize, cols: usize, channels: usize, sequence: u64) -> Self {
        Self {
            pixels,
            rows,
            cols,
            channels,
            sequence,
        }
    }

    /// Raw interleaved bytes.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn shape(&self) -> FrameShape {
        (self.rows, self.cols, self.channels)
    }

    /// Position of this frame since the camera was opened, starting at 1.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of pixel positions (rows * cols).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Byte at a given pixel position and channel.
    #[inline]
    pub fn sample(&self, position: usize, channel: usize) -> u8 {
        self.pixels[position * self.channels + channel]
    }

    /// Validates that the pixel buffer size matches the shape.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * self.channels
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("channels", &self.channels)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

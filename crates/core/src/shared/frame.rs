use ndarray::ArrayView3;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Capture adapters convert device pixel formats to RGB24 before a frame
/// enters the pipeline; everything downstream assumes 3 interleaved channels.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A black RGB frame, mostly useful for tests and placeholders.
    pub fn blank(width: u32, height: u32, index: usize) -> Self {
        Self::new(
            vec![0; width as usize * height as usize * 3],
            width,
            height,
            3,
            index,
        )
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Copies a rectangular window out of the frame.
    ///
    /// The window must lie inside the frame; callers clamp first.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Frame {
        debug_assert!(x + width <= self.width && y + height <= self.height);
        let channels = self.channels as usize;
        let row_len = width as usize * channels;
        let mut data = Vec::with_capacity(row_len * height as usize);
        for row in y as usize..(y + height) as usize {
            let start = (row * self.width as usize + x as usize) * channels;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Frame::new(data, width, height, self.channels, self.index)
    }

    /// Borrows the pixels as an `image` buffer for drawing in place.
    pub fn as_rgb_image_mut(&mut self) -> Option<image::ImageBuffer<image::Rgb<u8>, &mut [u8]>> {
        if self.channels != 3 {
            return None;
        }
        image::ImageBuffer::from_raw(self.width, self.height, self.data.as_mut_slice())
    }

    /// Copies the pixels into an owned `image` buffer.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        if self.channels != 3 {
            return None;
        }
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// A decoded still image: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; detection and drawing
/// work on this buffer directly.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
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
        }
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

    /// RGB value at `(x, y)`. Panics when out of bounds or not RGB.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        assert_eq!(self.channels, 3, "pixel() requires an RGB frame");
        let offset = ((y as usize) * (self.width as usize) + x as usize) * 3;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    /// Luminance plane using the fixed-point BT.601 weights
    /// (`0.299 R + 0.587 G + 0.114 B`).
    ///
    /// Single-channel frames are returned as-is.
    pub fn to_luma(&self) -> Vec<u8> {
        if self.channels == 1 {
            return self.data.clone();
        }
        let channels = self.channels as usize;
        self.data
            .chunks_exact(channels)
            .map(|px| {
                let r = px[0] as u32;
                let g = px[1] as u32;
                let b = px[2] as u32;
                ((r * 4899 + g * 9617 + b * 1868 + (1 << 13)) >> 14) as u8
            })
            .collect()
    }
}

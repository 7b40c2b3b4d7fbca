use ndarray::Array2;

/// Summed-area tables of a luminance plane and of its squares.
///
/// Both tables are `(height + 1) x (width + 1)` with a zero first row and
/// column, so any rectangle sum costs four lookups.
pub struct IntegralImage {
    sums: Array2<i64>,
    squared: Array2<i64>,
}

impl IntegralImage {
    pub fn new(pixels: &[u8], width: usize, height: usize) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        let mut sums = Array2::<i64>::zeros((height + 1, width + 1));
        let mut squared = Array2::<i64>::zeros((height + 1, width + 1));

        for y in 0..height {
            let mut row_sum = 0i64;
            let mut row_squared = 0i64;
            for x in 0..width {
                let v = pixels[y * width + x] as i64;
                row_sum += v;
                row_squared += v * v;
                sums[[y + 1, x + 1]] = sums[[y, x + 1]] + row_sum;
                squared[[y + 1, x + 1]] = squared[[y, x + 1]] + row_squared;
            }
        }

        Self { sums, squared }
    }

    pub fn width(&self) -> usize {
        self.sums.ncols() - 1
    }

    pub fn height(&self) -> usize {
        self.sums.nrows() - 1
    }

    /// Sum of pixels in the `w x h` rectangle at `(x, y)`.
    pub fn sum(&self, x: usize, y: usize, w: usize, h: usize) -> i64 {
        rect_sum(&self.sums, x, y, w, h)
    }

    /// Sum of squared pixels in the `w x h` rectangle at `(x, y)`.
    pub fn squared_sum(&self, x: usize, y: usize, w: usize, h: usize) -> i64 {
        rect_sum(&self.squared, x, y, w, h)
    }
}

fn rect_sum(table: &Array2<i64>, x: usize, y: usize, w: usize, h: usize) -> i64 {
    table[[y + h, x + w]] - table[[y, x + w]] - table[[y + h, x]] + table[[y, x]]
}

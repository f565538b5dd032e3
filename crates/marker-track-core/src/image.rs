/// Borrowed 8-bit grayscale image, row-major.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl GrayImageView<'_> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Copy the column range `[x0, x0 + width)` into an owned image.
    pub fn crop_columns(&self, x0: usize, width: usize) -> GrayImage {
        let width = width.min(self.width.saturating_sub(x0));
        let mut data = Vec::with_capacity(width * self.height);
        if width > 0 {
            for row in self.data.chunks_exact(self.width).take(self.height) {
                data.extend_from_slice(&row[x0..x0 + width]);
            }
        }
        GrayImage {
            width,
            height: self.height,
            data,
        }
    }
}

/// Owned 8-bit grayscale image, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Black image of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_columns_keeps_rows() {
        // 4x2 image: row 0 = 0..4, row 1 = 10..14
        let img = GrayImage {
            width: 4,
            height: 2,
            data: vec![0, 1, 2, 3, 10, 11, 12, 13],
        };
        let right = img.view().crop_columns(2, 2);
        assert_eq!(right.width, 2);
        assert_eq!(right.height, 2);
        assert_eq!(right.data, vec![2, 3, 12, 13]);
        assert_eq!(right.view().get(1, 1), 13);
    }

    #[test]
    fn crop_columns_clamps_to_image() {
        let img = GrayImage::new(3, 2);
        let out = img.view().crop_columns(2, 5);
        assert_eq!(out.width, 1);
        assert_eq!(out.data.len(), 2);
    }
}

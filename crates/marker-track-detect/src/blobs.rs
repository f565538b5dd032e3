//! 8-connected foreground blobs and their moments.

use marker_track_core::GrayImageView;

/// Moments of one connected foreground region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Blob {
    /// Number of pixels.
    pub area: usize,
    /// Intensity-weighted centroid, pixel centers at `i + 0.5`.
    pub cx: f32,
    pub cy: f32,
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
    /// Mean intensity above the threshold.
    pub mean_excess: f32,
}

impl Blob {
    pub fn bbox_width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn bbox_height(&self) -> usize {
        self.max_y - self.min_y + 1
    }
}

/// Label pixels strictly brighter than `level` and collect one [`Blob`] per
/// 8-connected region. Regions larger than `max_area` are skipped after being
/// flooded so that they are not revisited.
pub(crate) fn find_blobs(img: &GrayImageView<'_>, level: u8, max_area: usize) -> Vec<Blob> {
    let (w, h) = (img.width, img.height);
    let mut visited = vec![false; w * h];
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut out = Vec::new();

    for start in 0..w * h {
        if visited[start] || img.data[start] <= level {
            continue;
        }
        visited[start] = true;
        stack.push((start % w, start / w));

        let mut acc = Accumulator::new(start % w, start / w);
        while let Some((x, y)) = stack.pop() {
            let excess = (img.get(x, y) - level) as f64;
            acc.add(x, y, excess);

            let (x0, x1) = (x.saturating_sub(1), (x + 1).min(w - 1));
            let (y0, y1) = (y.saturating_sub(1), (y + 1).min(h - 1));
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    let idx = ny * w + nx;
                    if !visited[idx] && img.data[idx] > level {
                        visited[idx] = true;
                        stack.push((nx, ny));
                    }
                }
            }
        }

        if acc.area <= max_area {
            out.push(acc.finish());
        }
    }
    out
}

struct Accumulator {
    area: usize,
    sum_w: f64,
    sum_wx: f64,
    sum_wy: f64,
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl Accumulator {
    fn new(x: usize, y: usize) -> Self {
        Self {
            area: 0,
            sum_w: 0.0,
            sum_wx: 0.0,
            sum_wy: 0.0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn add(&mut self, x: usize, y: usize, weight: f64) {
        self.area += 1;
        self.sum_w += weight;
        self.sum_wx += weight * (x as f64 + 0.5);
        self.sum_wy += weight * (y as f64 + 0.5);
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn finish(self) -> Blob {
        // weights are > 0 for every foreground pixel
        let (cx, cy) = (self.sum_wx / self.sum_w, self.sum_wy / self.sum_w);
        Blob {
            area: self.area,
            cx: cx as f32,
            cy: cy as f32,
            min_x: self.min_x,
            min_y: self.min_y,
            max_x: self.max_x,
            max_y: self.max_y,
            mean_excess: (self.sum_w / self.area as f64) as f32,
        }
    }
}

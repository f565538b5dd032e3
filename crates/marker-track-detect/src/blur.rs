use marker_track_core::{GrayImage, GrayImageView};

/// Normalized 3-tap Gaussian weights for `sigma`.
fn kernel3(sigma: f32) -> [f32; 3] {
    let side = (-1.0 / (2.0 * sigma * sigma)).exp();
    let norm = 1.0 + 2.0 * side;
    [side / norm, 1.0 / norm, side / norm]
}

/// Separable 3x3 Gaussian blur with replicated borders.
///
/// A non-positive or non-finite `sigma` returns an unmodified copy.
pub(crate) fn gaussian_blur_3x3(img: &GrayImageView<'_>, sigma: f32) -> GrayImage {
    let (w, h) = (img.width, img.height);
    if !(sigma.is_finite() && sigma > 0.0) || w == 0 || h == 0 {
        return GrayImage {
            width: w,
            height: h,
            data: img.data.to_vec(),
        };
    }
    let k = kernel3(sigma);

    let mut tmp = vec![0f32; w * h];
    for y in 0..h {
        let row = &img.data[y * w..(y + 1) * w];
        for x in 0..w {
            let l = row[x.saturating_sub(1)] as f32;
            let c = row[x] as f32;
            let r = row[(x + 1).min(w - 1)] as f32;
            tmp[y * w + x] = k[0] * l + k[1] * c + k[2] * r;
        }
    }

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let up = y.saturating_sub(1) * w;
        let mid = y * w;
        let down = (y + 1).min(h - 1) * w;
        for x in 0..w {
            let v = k[0] * tmp[up + x] + k[1] * tmp[mid + x] + k[2] * tmp[down + x];
            out.data[mid + x] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

//! Global binarization level for marker blobs.

use marker_track_core::GrayImageView;

/// Intensity histogram of a whole image.
pub(crate) fn histogram(img: &GrayImageView<'_>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in img.data {
        hist[v as usize] += 1;
    }
    hist
}

/// `(min, max)` intensity present in the histogram, `None` for an empty image.
pub(crate) fn intensity_range(hist: &[u32; 256]) -> Option<(u8, u8)> {
    let min = hist.iter().position(|&h| h > 0)?;
    let max = hist.iter().rposition(|&h| h > 0)?;
    Some((min as u8, max as u8))
}

/// Otsu level: pixels strictly above the returned value are foreground.
pub(crate) fn otsu_threshold(hist: &[u32; 256]) -> u8 {
    let Some((min_v, max_v)) = intensity_range(hist) else {
        return 127;
    };
    if min_v == max_v {
        return min_v;
    }
    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total: f64 = hist.iter().map(|&h| h as f64).sum();
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

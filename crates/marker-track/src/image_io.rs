//! Conversions between [`BgrFrame`] and the `image` crate (feature `image`).

use std::path::Path;

use marker_track_core::BgrFrame;

/// Copy an RGB image into a BGR frame.
pub fn frame_from_rgb(img: &image::RgbImage) -> BgrFrame {
    let mut frame = BgrFrame::new(img.width() as usize, img.height() as usize);
    for (x, y, px) in img.enumerate_pixels() {
        let [r, g, b] = px.0;
        frame.set_pixel(x as usize, y as usize, [b, g, r]);
    }
    frame
}

/// Copy a BGR frame into an RGB image.
pub fn frame_to_rgb(frame: &BgrFrame) -> image::RgbImage {
    image::RgbImage::from_fn(frame.width as u32, frame.height as u32, |x, y| {
        let [b, g, r] = frame.pixel(x as usize, y as usize);
        image::Rgb([r, g, b])
    })
}

/// Decode any image format `image` supports into a frame.
pub fn load_frame(path: impl AsRef<Path>) -> Result<BgrFrame, image::ImageError> {
    let img = image::ImageReader::open(path)?.decode()?.to_rgb8();
    Ok(frame_from_rgb(&img))
}

/// Save a frame in the format implied by the file extension.
pub fn save_frame(frame: &BgrFrame, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
    frame_to_rgb(frame).save(path)
}

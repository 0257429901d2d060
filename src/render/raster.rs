use image::{GrayImage, ImageFormat, Luma};
use std::path::Path;

use crate::error::{FingerprintError, Result};
use crate::fingerprint::SpectrogramMatrix;

/// Grayscale raster of `matrix`: one column per frame, one row per bin,
/// low frequencies at the bottom. Intensity is `m / global max * 255`.
pub fn render_spectrogram(matrix: &SpectrogramMatrix) -> Result<GrayImage> {
    let max = matrix.global_max();
    if max == 0.0 {
        return Err(FingerprintError::DegenerateInput(
            "spectrogram has only zero values, unable to normalize".into(),
        ));
    }

    let width = matrix.frame_count() as u32;
    let height = matrix.bins_per_frame() as u32;
    let frames = matrix.frames();

    let img = GrayImage::from_fn(width, height, |x, y| {
        let magnitude = frames[x as usize][(height - y - 1) as usize];
        Luma([(magnitude / max * 255.0) as u8])
    });

    log::debug!("Rendered {}x{} spectrogram (max magnitude {:.3})", width, height, max);
    Ok(img)
}

pub fn save_spectrogram_png(matrix: &SpectrogramMatrix, path: &Path) -> Result<()> {
    let img = render_spectrogram(matrix)?;
    img.save_with_format(path, ImageFormat::Png)?;
    log::info!("Spectrogram saved: {}", path.display());
    Ok(())
}

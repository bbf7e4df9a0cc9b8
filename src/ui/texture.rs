// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Peter Carlton

use std::path::Path;

use eframe::egui::ColorImage;
use resvg::tiny_skia::Pixmap;

use crate::{errors::PhyloError, render::rasterize_svg};

pub fn color_image_from_pixmap(pixmap: &Pixmap) -> ColorImage {
    ColorImage::from_rgba_premultiplied(
        [pixmap.width() as usize, pixmap.height() as usize],
        pixmap.data(),
    )
}

pub fn load_png(path: &Path) -> Result<ColorImage, PhyloError> {
    let pixmap = Pixmap::load_png(path)
        .map_err(|e| PhyloError::Format(format!("Cannot load {}: {}", path.display(), e)))?;
    Ok(color_image_from_pixmap(&pixmap))
}

pub fn background_image(svg: &str) -> Result<ColorImage, PhyloError> {
    let pixmap = rasterize_svg(svg)?;
    Ok(color_image_from_pixmap(&pixmap))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_asset_rasterizes() {
        let image = background_image(include_str!("../../assets/background.svg")).unwrap();
        assert_eq!(image.size, [350, 350]);
    }

    #[test]
    fn png_size_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        let pixmap = Pixmap::new(12, 7).unwrap();
        pixmap.save_png(&path).unwrap();
        let image = load_png(&path).unwrap();
        assert_eq!(image.size, [12, 7]);
        assert_eq!(image.pixels.len(), 12 * 7);
    }

    #[test]
    fn missing_png_is_an_error() {
        assert!(load_png(Path::new("/nonexistent/tree_image.png")).is_err());
    }
}

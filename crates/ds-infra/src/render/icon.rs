use anyhow::{Context, Result};
use ds_core::content::{plan_icon, ContentMode};
use ds_core::ports::{IconRendererPort, RenderedIcon};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};

/// Scales images into the icon box and encodes them as PNG.
pub struct ImageIconRenderer {
    box_points: (u32, u32),
    display_scale: f64,
}

impl ImageIconRenderer {
    pub fn new(box_points: (u32, u32), display_scale: f64) -> Self {
        Self {
            box_points,
            display_scale,
        }
    }

    /// Renders already-decoded pixels.
    pub fn render_image(&self, decoded: DynamicImage, mode: ContentMode) -> Result<RenderedIcon> {
        let (original_width, original_height) = decoded.dimensions();
        let plan = plan_icon(
            original_width,
            original_height,
            mode,
            self.box_points,
            self.display_scale,
        );

        let source = match plan.source_crop {
            Some((x, y, crop_width, crop_height)) => decoded.crop_imm(x, y, crop_width, crop_height),
            None => decoded,
        };

        let (target_width, target_height) = plan.resize_to;
        let resized = if source.dimensions() == (target_width, target_height) {
            source
        } else {
            DynamicImage::ImageRgba8(image::imageops::resize(
                &source,
                target_width,
                target_height,
                FilterType::Triangle,
            ))
        };

        let (width, height) = resized.dimensions();
        let mut png = Vec::new();
        resized
            .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
            .context("encode icon to png")?;

        Ok(RenderedIcon { png, width, height })
    }
}

impl IconRendererPort for ImageIconRenderer {
    fn dimensions(&self, image_bytes: &[u8]) -> Result<(u32, u32)> {
        let decoded = image::load_from_memory(image_bytes).context("decode image bytes for icon")?;
        Ok(decoded.dimensions())
    }

    fn render(&self, image_bytes: &[u8], mode: ContentMode) -> Result<RenderedIcon> {
        let decoded = image::load_from_memory(image_bytes).context("decode image bytes for icon")?;
        self.render_image(decoded, mode)
    }
}

/// Encodes PNG test fixtures.
#[cfg(test)]
pub(crate) fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::new(width, height);
    let mut png_bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
        .unwrap();
    png_bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_renders_box_sized_icon() {
        let renderer = ImageIconRenderer::new((256, 256), 1.0);
        let icon = renderer.render(&png_fixture(1024, 512), ContentMode::Fill).unwrap();
        assert_eq!((icon.width, icon.height), (256, 256));
        let decoded = image::load_from_memory(&icon.png).unwrap();
        assert_eq!(decoded.dimensions(), (256, 256));
    }

    #[test]
    fn test_fill_of_thin_image_renders_box_sized_icon() {
        let renderer = ImageIconRenderer::new((256, 256), 2.0);
        let icon = renderer.render(&png_fixture(20000, 1), ContentMode::Fill).unwrap();
        assert_eq!((icon.width, icon.height), (512, 512));
    }

    #[test]
    fn test_fit_keeps_aspect() {
        let renderer = ImageIconRenderer::new((256, 256), 2.0);
        let icon = renderer.render(&png_fixture(1000, 500), ContentMode::Fit).unwrap();
        assert_eq!((icon.width, icon.height), (384, 192));
    }

    #[test]
    fn test_center_keeps_native_resolution() {
        let renderer = ImageIconRenderer::new((256, 256), 2.0);
        let icon = renderer.render(&png_fixture(40, 30), ContentMode::Center).unwrap();
        assert_eq!((icon.width, icon.height), (40, 30));
        assert_eq!(renderer.dimensions(&png_fixture(7, 9)).unwrap(), (7, 9));
    }

    #[test]
    fn test_garbage_is_an_error() {
        let renderer = ImageIconRenderer::new((256, 256), 1.0);
        assert!(renderer.render(b"not an image", ContentMode::Fill).is_err());
    }
}

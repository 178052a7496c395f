//! Icon box geometry.
//!
//! Pure size arithmetic; pixel work happens in the infra icon renderer.

use super::display::ContentMode;

/// Fit-mode icons never exceed this fraction of the box.
pub const FIT_LIMIT: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconPlan {
    /// Centred region `(x, y, width, height)` of the source kept before
    /// resampling, if any.
    pub source_crop: Option<(u32, u32, u32, u32)>,
    /// Size the kept region is resampled to. This is the output size.
    pub resize_to: (u32, u32),
}

impl IconPlan {
    pub fn output_size(&self) -> (u32, u32) {
        self.resize_to
    }
}

/// Plan how an image of `width`×`height` pixels lands in a `box_points` box
/// on a display with `display_scale` pixels per point.
///
/// `Fill` crops in source coordinates first, so the resampled buffer never
/// exceeds the box however thin the source is.
pub fn plan_icon(
    width: u32,
    height: u32,
    mode: ContentMode,
    box_points: (u32, u32),
    display_scale: f64,
) -> IconPlan {
    let width = width.max(1);
    let height = height.max(1);
    match mode {
        ContentMode::Center | ContentMode::Circle => IconPlan {
            source_crop: None,
            resize_to: (width, height),
        },
        ContentMode::Fit | ContentMode::Fill => {
            let scale = display_scale.max(0.1);
            let out_w = (box_points.0 as f64 * scale).floor().max(1.0);
            let out_h = (box_points.1 as f64 * scale).floor().max(1.0);
            let width_ratio = out_w / width as f64;
            let height_ratio = out_h / height as f64;

            if mode == ContentMode::Fit {
                let ratio = width_ratio.min(height_ratio) * FIT_LIMIT;
                return IconPlan {
                    source_crop: None,
                    resize_to: (scaled(width, ratio), scaled(height, ratio)),
                };
            }

            let ratio = width_ratio.max(height_ratio);
            let target = (
                scaled(width, ratio).min(out_w as u32),
                scaled(height, ratio).min(out_h as u32),
            );
            let keep_w = ((target.0 as f64 / ratio).round() as u32).clamp(1, width);
            let keep_h = ((target.1 as f64 / ratio).round() as u32).clamp(1, height);
            let source_crop = if (keep_w, keep_h) == (width, height) {
                None
            } else {
                Some(((width - keep_w) / 2, (height - keep_h) / 2, keep_w, keep_h))
            };
            IconPlan {
                source_crop,
                resize_to: target,
            }
        }
    }
}

fn scaled(length: u32, ratio: f64) -> u32 {
    ((length as f64 * ratio) as u32).max(1)
}

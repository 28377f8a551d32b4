//! FFmpeg filter graphs for the looping GIF output.

/// Default GIF edge length in pixels.
pub const DEFAULT_GIF_SIZE: u32 = 240;

/// Default GIF frame rate.
pub const DEFAULT_GIF_FPS: u32 = 8;

/// Letterbox into a `size`x`size` square with a transparent pad.
pub fn square_fit(size: u32) -> String {
    format!(
        concat!(
            "scale={s}:{s}:force_original_aspect_ratio=decrease,",
            "pad={s}:{s}:(ow-iw)/2:(oh-ih)/2:color=black@0"
        ),
        s = size
    )
}

/// First pass: derive an optimized palette from the fitted frames.
pub fn palette_filter(size: u32) -> String {
    format!("{},palettegen", square_fit(size))
}

/// Second pass: apply the palette from input `1` to the resampled frames.
pub fn gif_filter(size: u32, fps: u32) -> String {
    format!("{},fps={} [x]; [x][1:v] paletteuse", square_fit(size), fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_filter() {
        assert_eq!(
            palette_filter(240),
            "scale=240:240:force_original_aspect_ratio=decrease,\
             pad=240:240:(ow-iw)/2:(oh-ih)/2:color=black@0,palettegen"
        );
    }

    #[test]
    fn test_gif_filter_uses_palette_input() {
        let filter = gif_filter(120, 8);
        assert!(filter.starts_with("scale=120:120:"));
        assert!(filter.contains(",fps=8 [x]"));
        assert!(filter.ends_with("[x][1:v] paletteuse"));
    }
}

//! Two-sided sequence logos.
//!
//! The first alignment is drawn above a horizontal axis and the second
//! below it, faded and upside down. At each position the stack height is
//! the position's score and every residue's share of the stack is its
//! frequency in the column, so the most frequent residue is the tallest
//! letter, placed farthest from the axis. A vertical scale on the left
//! marks 0, half and full height on both sides.

pub mod font;
pub mod palette;

use std::io::{BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use image::{ImageFormat, Rgb, RgbImage};
use tracing::{debug, warn};

use crate::config::{LogoSettings, SdiSettings};
use crate::error::{CompareError, CompareResult};
use crate::model::AMINO_ACIDS;
use crate::output::write_atomically;
use crate::sdi::{Anchor, SdiTable};
use crate::stats::{max_information, ColumnProfile};

use self::font::{glyph, is_set, GLYPH_HEIGHT, GLYPH_WIDTH};
use self::palette::{fade, AminoAcidColorScheme, ColorScheme};

const MARGIN: u32 = 12;
const LABEL_GAP: u32 = 6;
const LABEL_SCALE: u32 = 2;
const LABEL_HEIGHT: u32 = GLYPH_HEIGHT * LABEL_SCALE;
/// Blank pixels between adjacent letters of a stack
const COLUMN_PADDING: u32 = 1;
const SECOND_FADE: f64 = 0.5;
const TICK_LENGTH: u32 = 4;
const TICK_LABEL_CHARS: u32 = 4;
/// Left gutter holding tick labels, ticks and the vertical axis
const SCALE_WIDTH: u32 = TICK_LABEL_CHARS * (GLYPH_WIDTH + 1) + 2 + TICK_LENGTH + 1;
/// Tick values as fractions of the metric's maximum
const TICK_FRACTIONS: [f64; 5] = [1.0, 0.5, 0.0, -0.5, -1.0];

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const LABEL_COLOR: Rgb<u8> = Rgb([0x40, 0x40, 0x40]);

/// Quantity that sets the height of each stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogoMetric {
    /// Selection-differentiation index (0 to 1)
    #[default]
    Sdi,
    /// Information content of each alignment (0 to log2 20 bits)
    Info,
}

impl LogoMetric {
    /// Largest value the metric can take; the height of each half.
    pub fn y_max(&self) -> f64 {
        match self {
            LogoMetric::Sdi => 1.0,
            LogoMetric::Info => max_information(),
        }
    }
}

/// Renders comparison logos.
pub struct LogoRenderer {
    settings: LogoSettings,
    small_sample_correction: bool,
    scheme: Box<dyn ColorScheme>,
}

impl LogoRenderer {
    pub fn new(logo: &LogoSettings, sdi: &SdiSettings) -> Self {
        Self {
            settings: logo.clone(),
            small_sample_correction: sdi.small_sample_correction,
            scheme: Box::new(AminoAcidColorScheme),
        }
    }

    pub fn with_scheme(mut self, scheme: Box<dyn ColorScheme>) -> Self {
        self.scheme = scheme;
        self
    }

    /// Image size in pixels for a logo of `columns` positions.
    pub fn dimensions(&self, columns: usize) -> (u32, u32) {
        let drawn = columns.max(self.settings.min_columns).max(1) as u32;
        let width = 2 * MARGIN + SCALE_WIDTH + drawn * self.settings.column_width;
        let height = 2 * MARGIN + 2 * self.settings.half_height + 1 + LABEL_GAP + LABEL_HEIGHT;
        (width, height)
    }

    fn axis_y(&self) -> u32 {
        MARGIN + self.settings.half_height
    }

    /// First pixel column of the plot area.
    fn plot_left(&self) -> u32 {
        MARGIN + SCALE_WIDTH
    }

    fn stack_height(&self, table: &SdiTable, anchor: Anchor, offset: usize, metric: LogoMetric) -> f64 {
        let value = match metric {
            LogoMetric::Sdi => table.scores(anchor)[offset].score,
            LogoMetric::Info => table.profiles(anchor)[offset].information_content(self.small_sample_correction),
        };
        value.clamp(0.0, metric.y_max())
    }

    /// Draw the logo for every position of `table`.
    pub fn render(&self, table: &SdiTable, metric: LogoMetric) -> RgbImage {
        let (width, height) = self.dimensions(table.range.len());
        let mut img = RgbImage::from_pixel(width, height, WHITE);
        let scale = self.settings.half_height as f64 / metric.y_max();

        for (offset, position) in table.range.positions().enumerate() {
            let x = self.plot_left() + offset as u32 * self.settings.column_width;
            for anchor in [Anchor::First, Anchor::Second] {
                let total = self.stack_height(table, anchor, offset, metric) * scale;
                self.draw_stack(&mut img, x, &table.profiles(anchor)[offset], total, anchor);
            }
            debug!(position, "drew logo column");
        }

        let axis = self.axis_y();
        for x in self.plot_left()..width - MARGIN {
            img.put_pixel(x, axis, BLACK);
        }
        self.draw_scale(&mut img, metric);
        self.draw_labels(&mut img, table);
        img
    }

    /// Vertical axis with labelled ticks at 0, half and full height.
    fn draw_scale(&self, img: &mut RgbImage, metric: LogoMetric) {
        let axis = self.axis_y();
        let half = self.settings.half_height;
        let line_x = self.plot_left() - 1;
        for y in axis - half..=axis + half {
            img.put_pixel(line_x, y, BLACK);
        }

        for fraction in TICK_FRACTIONS {
            let y = (axis as f64 - fraction * half as f64).round() as u32;
            for x in line_x - TICK_LENGTH..line_x {
                img.put_pixel(x, y, BLACK);
            }

            let text = tick_label(fraction * metric.y_max());
            let right = line_x - TICK_LENGTH - 2;
            let mut x = right.saturating_sub(text.len() as u32 * (GLYPH_WIDTH + 1));
            let top = y.saturating_sub(GLYPH_HEIGHT / 2);
            for c in text.chars() {
                draw_glyph(img, c, x, top, GLYPH_WIDTH, GLYPH_HEIGHT, LABEL_COLOR, false);
                x += GLYPH_WIDTH + 1;
            }
        }
    }

    /// Stack one column's letters, least frequent next to the axis.
    fn draw_stack(&self, img: &mut RgbImage, x: u32, profile: &ColumnProfile, total: f64, anchor: Anchor) {
        let mut order: Vec<usize> = (0..AMINO_ACIDS.len()).collect();
        order.sort_by(|&a, &b| {
            profile.distribution[a]
                .total_cmp(&profile.distribution[b])
                .then_with(|| b.cmp(&a))
        });

        let axis = self.axis_y() as f64;
        let glyph_x = x + COLUMN_PADDING;
        let glyph_w = self.settings.column_width.saturating_sub(2 * COLUMN_PADDING);
        let mut offset = 0.0_f64;

        for idx in order {
            let h = total * profile.distribution[idx];
            let (near, far) = (offset.round(), (offset + h).round());
            offset += h;
            if far - near < 1.0 {
                continue;
            }

            let residue = char::from(AMINO_ACIDS[idx]);
            let color = self.scheme.color(residue);
            match anchor {
                Anchor::First => {
                    let top = (axis - far) as u32;
                    let glyph_h = (far - near) as u32;
                    draw_glyph(img, residue, glyph_x, top, glyph_w, glyph_h, color, false);
                }
                Anchor::Second => {
                    let top = (axis + 1.0 + near) as u32;
                    let glyph_h = (far - near) as u32;
                    draw_glyph(img, residue, glyph_x, top, glyph_w, glyph_h, fade(color, SECOND_FADE), true);
                }
            }
        }
    }

    /// Position numbers under the plot, thinned out when they would overlap.
    fn draw_labels(&self, img: &mut RgbImage, table: &SdiTable) {
        let digits = table.range.end.to_string().len() as u32;
        let char_w = (GLYPH_WIDTH + 1) * LABEL_SCALE;
        let stride = (digits * char_w).div_ceil(self.settings.column_width).max(1) as usize;
        let top = self.axis_y() + self.settings.half_height + 1 + LABEL_GAP;

        for (offset, position) in table.range.positions().enumerate() {
            if offset % stride != 0 {
                continue;
            }
            let text = position.to_string();
            let text_w = text.len() as u32 * char_w - LABEL_SCALE;
            let center = self.plot_left() + offset as u32 * self.settings.column_width + self.settings.column_width / 2;
            let mut x = center.saturating_sub(text_w / 2);
            for c in text.chars() {
                draw_glyph(
                    img,
                    c,
                    x,
                    top,
                    GLYPH_WIDTH * LABEL_SCALE,
                    LABEL_HEIGHT,
                    LABEL_COLOR,
                    false,
                );
                x += char_w;
            }
        }
    }
}

/// Tick text: whole numbers bare, anything else to one decimal.
fn tick_label(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// Scale a glyph into the `w` x `h` box at (`x`, `y`), clipped to the image.
#[allow(clippy::too_many_arguments)]
fn draw_glyph(img: &mut RgbImage, c: char, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>, flipped: bool) {
    let Some(bitmap) = glyph(c) else {
        return;
    };
    if w == 0 || h == 0 {
        return;
    }
    for py in 0..h {
        let row = py * GLYPH_HEIGHT / h;
        let row = if flipped { GLYPH_HEIGHT - 1 - row } else { row };
        for px in 0..w {
            let col = px * GLYPH_WIDTH / w;
            let (ix, iy) = (x + px, y + py);
            if is_set(&bitmap, col, row) && ix < img.width() && iy < img.height() {
                img.put_pixel(ix, iy, color);
            }
        }
    }
}

/// Encode `img` as PNG at `path`.
pub fn save_png(img: &RgbImage, path: &Path) -> CompareResult<()> {
    let is_png = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    if !is_png {
        warn!(path = %path.display(), "logo is always written as PNG");
    }

    write_atomically(path, |file| {
        let mut writer = BufWriter::new(file);
        img.write_to(&mut writer, ImageFormat::Png)?;
        writer.flush().map_err(|e| CompareError::io(path, e))
    })
}

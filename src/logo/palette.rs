//! Residue colors for sequence logos.

use image::Rgb;

/// Maps residues to fill colors.
pub trait ColorScheme: Send + Sync {
    fn color(&self, residue: char) -> Rgb<u8>;
}

/// Physicochemical amino-acid groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct AminoAcidColorScheme;

impl ColorScheme for AminoAcidColorScheme {
    fn color(&self, residue: char) -> Rgb<u8> {
        match residue.to_ascii_uppercase() {
            // Hydrophobic
            'A' | 'V' | 'I' | 'L' | 'M' | 'F' | 'W' | 'P' => Rgb([0xD9, 0xA4, 0x00]),
            // Polar
            'S' | 'T' | 'N' | 'Q' | 'C' | 'G' | 'Y' => Rgb([0x1B, 0x9E, 0x3E]),
            // Charged positive
            'K' | 'R' | 'H' => Rgb([0x1F, 0x5F, 0xC8]),
            // Charged negative
            'D' | 'E' => Rgb([0xD0, 0x21, 0x2B]),
            _ => Rgb([0x80, 0x80, 0x80]),
        }
    }
}

/// Every residue in one color.
#[derive(Debug, Clone, Copy)]
pub struct MonochromeScheme(pub Rgb<u8>);

impl ColorScheme for MonochromeScheme {
    fn color(&self, _residue: char) -> Rgb<u8> {
        self.0
    }
}

/// Blend `color` toward white; `amount` 0 keeps it, 1 gives white.
pub fn fade(color: Rgb<u8>, amount: f64) -> Rgb<u8> {
    let amount = amount.clamp(0.0, 1.0);
    Rgb(color.0.map(|c| (c as f64 + (255.0 - c as f64) * amount).round() as u8))
}

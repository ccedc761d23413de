use png::{BitDepth, ColorType, Encoder};
use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

use crate::error::AppError;

/// Quiet zone around the symbol, in modules.
const BORDER: usize = 4;
const DEFAULT_SIZE: u32 = 300;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
}

impl From<QrError> for AppError {
    fn from(err: QrError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

/// Link opened by a customer scanning the QR code on a table.
pub fn table_link(menu_url: &str, table_number: &str) -> String {
    let separator = if menu_url.contains('?') { '&' } else { '?' };
    let table: String = table_number
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect();
    format!("{menu_url}{separator}table={table}")
}

/// Grayscale PNG of `data`, roughly `size` pixels wide.
pub fn render_png(data: &str, size: Option<u32>) -> Result<Vec<u8>, QrError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)?;
    let colors = code.to_colors();
    let width = code.width();

    let modules = width + 2 * BORDER;
    let scale = ((size.unwrap_or(DEFAULT_SIZE) as usize) / modules).max(1);
    let pixels_wide = modules * scale;

    let mut pixels = Vec::with_capacity(pixels_wide * pixels_wide);
    for y in 0..pixels_wide {
        for x in 0..pixels_wide {
            let mx = (x / scale).checked_sub(BORDER);
            let my = (y / scale).checked_sub(BORDER);
            let dark = match (mx, my) {
                (Some(mx), Some(my)) if mx < width && my < width => {
                    colors[my * width + mx] == Color::Dark
                }
                _ => false,
            };
            pixels.push(if dark { 0 } else { 255 });
        }
    }

    let mut out = Vec::new();
    {
        let mut encoder = Encoder::new(&mut out, pixels_wide as u32, pixels_wide as u32);
        encoder.set_color(ColorType::Grayscale);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&pixels)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_link_appends_query_parameter() {
        assert_eq!(
            table_link("https://mycafe.com/menu", "7"),
            "https://mycafe.com/menu?table=7"
        );
        assert_eq!(
            table_link("https://mycafe.com/menu?lang=en", "Patio 2"),
            "https://mycafe.com/menu?lang=en&table=Patio%202"
        );
    }

    #[test]
    fn renders_a_png() {
        let png = render_png("https://mycafe.com/menu?table=1", Some(200)).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}

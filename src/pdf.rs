//! Just enough PDF to print a bill with the standard Type 1 fonts.

use std::fmt::Write as _;

/// Points per centimetre.
pub const CM: f64 = 72.0 / 2.54;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
    /// Fixed width, used for figures so columns line up.
    Mono,
}

impl Font {
    const ALL: [Font; 4] = [Font::Regular, Font::Bold, Font::Italic, Font::Mono];

    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
            Font::Mono => "F4",
        }
    }

    fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
            Font::Mono => "Courier",
        }
    }

    /// Average glyph advance as a fraction of the font size. Exact for Courier.
    fn advance(&self) -> f64 {
        match self {
            Font::Mono => 0.6,
            Font::Bold => 0.56,
            _ => 0.52,
        }
    }

    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        text.chars().count() as f64 * size * self.advance()
    }
}

#[derive(Debug)]
pub struct PdfDocument {
    title: String,
    width: f64,
    height: f64,
    /// One content stream per page; drawing goes to the last one.
    pages: Vec<String>,
}

impl PdfDocument {
    pub fn new(title: &str, width: f64, height: f64) -> Self {
        Self {
            title: title.to_string(),
            width,
            height,
            pages: vec![String::new()],
        }
    }

    /// Start a fresh page; later drawing lands on it.
    pub fn new_page(&mut self) {
        self.pages.push(String::new());
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn content(&mut self) -> &mut String {
        if self.pages.is_empty() {
            self.pages.push(String::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Draw `text` with its baseline starting at (`x`, `y`), origin bottom left.
    pub fn text(&mut self, font: Font, size: f64, x: f64, y: f64, text: &str) {
        let _ = writeln!(
            self.content(),
            "BT /{} {size:.1} Tf {x:.2} {y:.2} Td ({}) Tj ET",
            font.resource(),
            escape(text)
        );
    }

    pub fn text_right(&mut self, font: Font, size: f64, right: f64, y: f64, text: &str) {
        let x = right - font.text_width(text, size);
        self.text(font, size, x, y, text);
    }

    pub fn text_centered(&mut self, font: Font, size: f64, y: f64, text: &str) {
        let x = (self.width - font.text_width(text, size)) / 2.0;
        self.text(font, size, x.max(0.0), y, text);
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let _ = writeln!(self.content(), "0.5 w {x1:.2} {y1:.2} m {x2:.2} {y2:.2} l S");
    }

    /// Objects are laid out as catalog, page tree, fonts, then a page and
    /// its content stream for every page, then the info dictionary.
    pub fn to_bytes(&self) -> Vec<u8> {
        let first_page = 3 + Font::ALL.len();
        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| first_page + 2 * i).collect();
        let kids: String = page_ids.iter().map(|id| format!("{id} 0 R ")).collect();

        let mut objects: Vec<Vec<u8>> = vec![
            b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.trim_end(),
                self.pages.len()
            )
            .into_bytes(),
        ];

        for font in Font::ALL {
            objects.push(
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font.base_font()
                )
                .into_bytes(),
            );
        }
        let fonts: String = Font::ALL
            .iter()
            .enumerate()
            .map(|(i, font)| format!("/{} {} 0 R ", font.resource(), i + 3))
            .collect();

        for (page, id) in self.pages.iter().zip(&page_ids) {
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                     /Resources << /Font << {fonts}>> >> /Contents {} 0 R >>",
                    self.width,
                    self.height,
                    id + 1
                )
                .into_bytes(),
            );

            let stream = encode(page);
            let mut content = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
            content.extend_from_slice(&stream);
            content.extend_from_slice(b"\nendstream");
            objects.push(content);
        }

        let info_id = objects.len() + 1;
        let mut info = b"<< /Title (".to_vec();
        info.extend_from_slice(&encode(&escape(&self.title)));
        info.extend_from_slice(b") /Producer (cafe-pos-api) >>");
        objects.push(info);

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_at = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = writeln!(xref, "{offset:010} 00000 n ");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

/// Latin-1 bytes; anything outside it becomes `?`.
fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}

//! Minimal SVG document builder used by the chart renderers

use std::fmt::Write as _;

/// Bar colours, cycled per bar
pub const SUNSET_PALETTE: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEEAD", "#D4A5A5", "#9B7EDE", "#FFB174",
    "#3F7CAC", "#EE6E73",
];

const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Escape text for use in SVG content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// An SVG document under construction
///
/// Each canvas owns its buffer; [`SvgCanvas::finish`] hands back the bytes.
#[derive(Debug)]
pub struct SvgCanvas {
    width: f64,
    height: f64,
    body: String,
}

impl SvgCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        let mut canvas = Self {
            width,
            height,
            body: String::new(),
        };
        canvas.rect(0.0, 0.0, width, height, "#FFFFFF", None);
        canvas
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: &str, stroke: Option<&str>) {
        let _ = write!(
            self.body,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}""#,
            x,
            y,
            width.max(0.0),
            height.max(0.0),
            fill
        );
        if let Some(stroke) = stroke {
            let _ = write!(self.body, r#" stroke="{}""#, stroke);
        }
        self.body.push_str("/>\n");
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}"/>"#,
            x1, y1, x2, y2, stroke
        );
    }

    pub fn text(&mut self, x: f64, y: f64, content: &str, size: f64, anchor: Anchor) {
        let _ = writeln!(
            self.body,
            r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="{:.0}" text-anchor="{}">{}</text>"#,
            x,
            y,
            FONT_FAMILY,
            size,
            anchor.as_str(),
            escape(content)
        );
    }

    /// Text rotated by `degrees` around its anchor point
    pub fn rotated_text(&mut self, x: f64, y: f64, content: &str, size: f64, anchor: Anchor, degrees: f64) {
        let _ = writeln!(
            self.body,
            r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="{:.0}" text-anchor="{}" transform="rotate({:.0} {:.1} {:.1})">{}</text>"#,
            x,
            y,
            FONT_FAMILY,
            size,
            anchor.as_str(),
            degrees,
            x,
            y,
            escape(content)
        );
    }

    /// Centered title across the top
    pub fn title(&mut self, content: &str) {
        let x = self.width / 2.0;
        self.text(x, 32.0, content, 18.0, Anchor::Middle);
    }

    /// Serialize to standalone SVG bytes
    pub fn finish(self) -> Vec<u8> {
        let mut doc = String::with_capacity(self.body.len() + 160);
        let _ = writeln!(
            doc,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
            w = self.width,
            h = self.height
        );
        doc.push_str(&self.body);
        doc.push_str("</svg>\n");
        doc.into_bytes()
    }
}

/// Linear interpolation between two `#RRGGBB` colours, `t` in `0.0..=1.0`
pub fn blend(from: &str, to: &str, t: f64) -> String {
    let parse = |hex: &str| -> [u8; 3] {
        let hex = hex.trim_start_matches('#');
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|c| u8::from_str_radix(c, 16).ok())
                .unwrap_or(0)
        };
        [channel(0), channel(2), channel(4)]
    };
    let (a, b) = (parse(from), parse(to));
    let t = t.clamp(0.0, 1.0);
    let mix = |i: usize| (f64::from(a[i]) + (f64::from(b[i]) - f64::from(a[i])) * t).round() as u8;
    format!("#{:02X}{:02X}{:02X}", mix(0), mix(1), mix(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("Guns N' Roses & <Friends>"), "Guns N&apos; Roses &amp; &lt;Friends&gt;");
    }

    #[test]
    fn test_finish_produces_svg_document() {
        let mut canvas = SvgCanvas::new(200.0, 100.0);
        canvas.title("Hello");
        let svg = String::from_utf8(canvas.finish()).unwrap();
        assert!(svg.starts_with("<svg "));
        assert!(svg.contains(">Hello</text>"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_blend_endpoints() {
        assert_eq!(blend("#000000", "#FFFFFF", 0.0), "#000000");
        assert_eq!(blend("#000000", "#FFFFFF", 1.0), "#FFFFFF");
        assert_eq!(blend("#000000", "#FFFFFF", 2.0), "#FFFFFF");
    }
}

//! SVG wrapping: embed the untouched source raster in a minimal SVG document.
//!
//! This is a container change, not vectorization. The SVG renders exactly like
//! the source, scaled to the planned dimensions.

use crate::output::Payload;
use crate::pipeline::plan::Dimensions;

pub const SVG_MIME: &str = "image/svg+xml";

/// Build an SVG whose root and single `<image>` both declare `target` and
/// whose `href` inlines `source` as a base64 data URI.
pub fn wrap_svg(source: &Payload, target: Dimensions) -> Payload {
    let Dimensions { width, height } = target;
    let svg = format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            "\n  ",
            r#"<image href="{href}" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
            "\n</svg>\n"
        ),
        w = width,
        h = height,
        href = source.to_data_uri(),
    );

    Payload::new(SVG_MIME, svg.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapped(w: u32, h: u32) -> String {
        let source = Payload::new("image/png", vec![0x89, b'P', b'N', b'G']);
        let out = wrap_svg(&source, Dimensions { width: w, height: h });
        assert_eq!(out.mime_type, SVG_MIME);
        String::from_utf8(out.bytes).unwrap()
    }

    #[test]
    fn root_declares_target_dimensions() {
        let svg = wrapped(200, 100);
        assert!(svg.starts_with("<svg "));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains(r#"width="200" height="100" viewBox="0 0 200 100""#));
    }

    #[test]
    fn exactly_one_image_with_target_dimensions() {
        let svg = wrapped(64, 48);
        assert_eq!(svg.matches("<image ").count(), 1);
        assert!(svg.contains(r#"width="64" height="48" preserveAspectRatio="none"/>"#));
    }

    #[test]
    fn embeds_source_as_data_uri() {
        let svg = wrapped(1, 1);
        assert!(svg.contains(r#"href="data:image/png;base64,iVBORw==""#), "{svg}");
    }
}

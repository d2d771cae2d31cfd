//! Output dimension planning.

use crate::error::ImgConvError;

/// Target output size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Resolve the output size from the natural size and the requested sides.
///
/// * neither side requested: natural size;
/// * one side requested: the other follows the natural aspect ratio, rounded
///   half away from zero;
/// * both requested: used verbatim, even if that distorts the image.
pub fn plan_dimensions(
    natural_w: u32,
    natural_h: u32,
    req_w: Option<u32>,
    req_h: Option<u32>,
) -> Result<Dimensions, ImgConvError> {
    let aspect = || f64::from(natural_w) / f64::from(natural_h);

    let (width, height): (i64, i64) = match (req_w, req_h) {
        (None, None) => (natural_w.into(), natural_h.into()),
        (Some(w), None) => (w.into(), round_side(f64::from(w) / aspect())),
        (None, Some(h)) => (round_side(f64::from(h) * aspect()), h.into()),
        (Some(w), Some(h)) => (w.into(), h.into()),
    };

    if width <= 0 || height <= 0 || width > i64::from(u32::MAX) || height > i64::from(u32::MAX) {
        return Err(ImgConvError::Dimension { width, height });
    }

    Ok(Dimensions {
        width: width as u32,
        height: height as u32,
    })
}

// NaN (0/0 aspect) and infinities map to 0 or saturate, both rejected above.
fn round_side(v: f64) -> i64 {
    if v.is_finite() {
        v.round() as i64
    } else {
        0
    }
}

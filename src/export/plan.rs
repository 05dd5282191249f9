//! Slice planning: which rows of the captured bitmap go on which page.
//!
//! One scale factor fits the bitmap's width into the page content width and
//! holds for the whole document:
//!
//! ```text
//! width_ratio  = content_width / bitmap_width          (points per pixel)
//! slice_height = content_height / width_ratio          (pixels per page)
//! pages        = ceil(bitmap_height / slice_height)
//! ```
//!
//! Slice `i` starts at `i * slice_height`. The last slice is clamped to what
//! remains, so the final slice always ends at exactly `bitmap_height`.

use crate::error::QpaperError;
use serde::Serialize;

/// Remainders below this many pixels do not open another page. Guards
/// against float noise when the height is an exact multiple of a page.
const SLICE_EPSILON_PX: f64 = 1e-6;

/// Page size and margin in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
}

impl PageGeometry {
    pub fn new(page_width: f64, page_height: f64, margin: f64) -> Self {
        Self {
            page_width,
            page_height,
            margin,
        }
    }

    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f64 {
        self.page_height - 2.0 * self.margin
    }

    /// Reject geometry that cannot hold content: a NaN, infinite or
    /// negative margin, or a margin that leaves no content box.
    pub fn validate(&self) -> Result<(), QpaperError> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(QpaperError::InvalidConfig(format!(
                "margin must be a finite, non-negative number of points, got {}",
                self.margin
            )));
        }
        let (w, h) = (self.content_width(), self.content_height());
        if !(w.is_finite() && w > 0.0 && h.is_finite() && h > 0.0) {
            return Err(QpaperError::InvalidConfig(format!(
                "margin {} leaves no content area on a {}x{} pt page",
                self.margin, self.page_width, self.page_height
            )));
        }
        Ok(())
    }
}

/// One page's worth of the source bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSlice {
    /// Zero-based page index.
    pub index: usize,
    /// First source row, in pixels (fractional).
    pub source_y: f64,
    /// Rows covered, in pixels (fractional).
    pub source_height: f64,
    /// Width on the page, in points. Always the content width.
    pub placed_width: f64,
    /// Height on the page, in points: `source_height * width_ratio`.
    pub placed_height: f64,
}

impl PageSlice {
    pub fn source_end(&self) -> f64 {
        self.source_y + self.source_height
    }

    /// Integer row range `(top, rows)` to crop from a bitmap `height` rows
    /// tall. Always at least one row and never past the bottom edge.
    pub fn pixel_rows(&self, height: u32) -> (u32, u32) {
        let last_row = height.saturating_sub(1);
        let top = (self.source_y.round().max(0.0) as u32).min(last_row);
        let bottom = (self.source_end().round() as u32).min(height);
        (top, bottom.saturating_sub(top).max(1))
    }
}

/// The scale factor from bitmap pixels to page points.
pub fn width_ratio(bitmap_width: u32, geometry: &PageGeometry) -> f64 {
    geometry.content_width() / f64::from(bitmap_width)
}

/// Plan every page slice for a `width` × `height` bitmap.
///
/// A bitmap with no rows or no columns cannot be paginated and yields
/// [`QpaperError::EmptyBitmap`].
pub fn plan_slices(
    width: u32,
    height: u32,
    geometry: &PageGeometry,
) -> Result<Vec<PageSlice>, QpaperError> {
    if width == 0 || height == 0 {
        return Err(QpaperError::EmptyBitmap { width, height });
    }
    geometry.validate()?;

    let ratio = width_ratio(width, geometry);
    let step = geometry.content_height() / ratio;
    let total = f64::from(height);
    let count = (((total - SLICE_EPSILON_PX) / step).ceil() as usize).max(1);

    let slices = (0..count)
        .map(|index| {
            let source_y = index as f64 * step;
            let source_height = if index + 1 == count {
                total - source_y
            } else {
                step
            };
            PageSlice {
                index,
                source_y,
                source_height,
                placed_width: geometry.content_width(),
                placed_height: source_height * ratio,
            }
        })
        .collect();

    Ok(slices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a4() -> PageGeometry {
        PageGeometry::new(595.28, 841.89, 35.0)
    }

    /// Geometry whose content box is exactly `w` × `h` points.
    fn content(w: f64, h: f64) -> PageGeometry {
        PageGeometry::new(w + 20.0, h + 20.0, 10.0)
    }

    #[test]
    fn content_box_subtracts_both_margins() {
        let g = a4();
        assert!((g.content_width() - 525.28).abs() < 1e-9);
        assert!((g.content_height() - 771.89).abs() < 1e-9);
    }

    #[test]
    fn short_bitmap_is_one_page() {
        let slices = plan_slices(1000, 300, &content(500.0, 700.0)).unwrap();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].source_y, 0.0);
        assert_eq!(slices[0].source_height, 300.0);
        assert_eq!(slices[0].placed_width, 500.0);
        assert!((slices[0].placed_height - 150.0).abs() < 1e-9);
    }

    #[test]
    fn exact_multiple_has_no_sliver_page() {
        // ratio 0.5 → 1400 px per page.
        let slices = plan_slices(1000, 2800, &content(500.0, 700.0)).unwrap();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[1].source_y, 1400.0);
        assert_eq!(slices[1].source_end(), 2800.0);
    }

    #[test]
    fn last_slice_is_clamped_to_remaining_rows() {
        let slices = plan_slices(1000, 3000, &content(500.0, 700.0)).unwrap();
        assert_eq!(slices.len(), 3);
        let last = slices[2];
        assert_eq!(last.source_y, 2800.0);
        assert_eq!(last.source_height, 200.0);
        assert!((last.placed_height - 100.0).abs() < 1e-9);
        for s in &slices[..2] {
            assert!((s.placed_height - 700.0).abs() < 1e-9);
        }
    }

    #[test]
    fn boundaries_are_monotone_and_end_at_height() {
        let g = a4();
        for &(w, h) in &[(1575, 1), (1575, 2315), (1575, 9000), (800, 12345), (3, 7)] {
            let slices = plan_slices(w, h, &g).unwrap();
            let step = g.content_height() / width_ratio(w, &g);
            assert_eq!(slices.len(), (f64::from(h) / step).ceil() as usize);
            assert_eq!(slices[0].source_y, 0.0);
            for pair in slices.windows(2) {
                assert!(pair[0].source_y < pair[1].source_y);
                assert!((pair[0].source_end() - pair[1].source_y).abs() < 1e-6);
            }
            let last = slices.last().unwrap();
            assert!((last.source_end() - f64::from(h)).abs() < 1e-6);
            assert!(last.source_height > 0.0);
        }
    }

    #[test]
    fn indices_are_sequential() {
        let slices = plan_slices(500, 5000, &a4()).unwrap();
        let indices: Vec<usize> = slices.iter().map(|s| s.index).collect();
        assert_eq!(indices, (0..slices.len()).collect::<Vec<_>>());
    }

    #[test]
    fn empty_bitmap_is_an_error() {
        assert!(matches!(
            plan_slices(100, 0, &a4()),
            Err(QpaperError::EmptyBitmap {
                width: 100,
                height: 0
            })
        ));
        assert!(matches!(
            plan_slices(0, 100, &a4()),
            Err(QpaperError::EmptyBitmap { .. })
        ));
    }

    #[test]
    fn margin_swallowing_page_is_rejected() {
        let g = PageGeometry::new(50.0, 50.0, 30.0);
        assert!(matches!(
            plan_slices(10, 10, &g),
            Err(QpaperError::InvalidConfig(_))
        ));
    }

    #[test]
    fn nan_and_negative_margins_are_rejected() {
        for margin in [f64::NAN, -50.0, f64::INFINITY] {
            let g = PageGeometry::new(595.28, 841.89, margin);
            assert!(
                matches!(plan_slices(100, 200, &g), Err(QpaperError::InvalidConfig(_))),
                "margin {margin} accepted"
            );
        }
    }

    #[test]
    fn nan_page_size_is_rejected() {
        let g = PageGeometry::new(f64::NAN, 841.89, 35.0);
        assert!(matches!(g.validate(), Err(QpaperError::InvalidConfig(_))));
        assert!(a4().validate().is_ok());
        assert!(PageGeometry::new(595.28, 841.89, 0.0).validate().is_ok());
    }

    #[test]
    fn pixel_rows_round_and_clamp() {
        let slice = PageSlice {
            index: 1,
            source_y: 1399.6,
            source_height: 1400.2,
            placed_width: 1.0,
            placed_height: 1.0,
        };
        assert_eq!(slice.pixel_rows(5000), (1400, 1400));
        assert_eq!(slice.pixel_rows(2000), (1400, 600));

        let sliver = PageSlice {
            source_y: 99.9,
            source_height: 0.05,
            ..slice
        };
        assert_eq!(sliver.pixel_rows(100), (99, 1));
    }
}

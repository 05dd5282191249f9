//! Rasterising one page slice out of the captured bitmap.

use crate::error::SliceError;
use crate::export::plan::PageSlice;
use image::DynamicImage;

/// Produces the bitmap for one page slice.
///
/// A failure here is not fatal for the export: the caller falls back to
/// placing the whole bitmap and stops slicing.
pub trait SliceSurface: Send + Sync {
    fn rasterize(&self, bitmap: &DynamicImage, slice: &PageSlice)
        -> Result<DynamicImage, SliceError>;
}

/// Crops full-width row ranges out of the source bitmap in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct CropSurface;

impl SliceSurface for CropSurface {
    fn rasterize(
        &self,
        bitmap: &DynamicImage,
        slice: &PageSlice,
    ) -> Result<DynamicImage, SliceError> {
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return Err(SliceError::SurfaceUnavailable {
                index: slice.index,
                detail: "source bitmap has no pixels".into(),
            });
        }
        let (top, rows) = slice.pixel_rows(bitmap.height());
        Ok(bitmap.crop_imm(0, top, bitmap.width(), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    /// A bitmap whose row `y` is filled with grey level `y`.
    fn striped(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |_, y| {
            Rgba([y as u8, y as u8, y as u8, 255])
        }))
    }

    fn slice(index: usize, y: f64, h: f64) -> PageSlice {
        PageSlice {
            index,
            source_y: y,
            source_height: h,
            placed_width: 10.0,
            placed_height: 10.0,
        }
    }

    #[test]
    fn crop_keeps_full_width_and_row_range() {
        let bitmap = striped(4, 100);
        let out = CropSurface.rasterize(&bitmap, &slice(1, 40.0, 30.0)).unwrap();
        assert_eq!(out.dimensions(), (4, 30));
        assert_eq!(out.get_pixel(0, 0), Rgba([40, 40, 40, 255]));
        assert_eq!(out.get_pixel(3, 29), Rgba([69, 69, 69, 255]));
    }

    #[test]
    fn crop_of_last_partial_slice() {
        let bitmap = striped(4, 100);
        let out = CropSurface.rasterize(&bitmap, &slice(2, 80.0, 20.0)).unwrap();
        assert_eq!(out.dimensions(), (4, 20));
        assert_eq!(out.get_pixel(0, 19), Rgba([99, 99, 99, 255]));
    }
}

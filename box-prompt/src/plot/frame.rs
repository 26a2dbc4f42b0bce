use super::Colormap;
use crate::{common::*, error::UsageError};

/// An image accepted by the grid plotter.
#[derive(Debug, Clone)]
pub enum PlotImage {
    /// A pixel buffer in `H×W`, `H×W×1` or `H×W×3` shape. Color buffers are
    /// in BGR channel order.
    Array(ArrayD<u8>),
    /// A decoded image object.
    Image(DynamicImage),
}

impl From<ArrayD<u8>> for PlotImage {
    fn from(array: ArrayD<u8>) -> Self {
        Self::Array(array)
    }
}

impl From<Array2<u8>> for PlotImage {
    fn from(array: Array2<u8>) -> Self {
        Self::Array(array.into_dyn())
    }
}

impl From<Array3<u8>> for PlotImage {
    fn from(array: Array3<u8>) -> Self {
        Self::Array(array.into_dyn())
    }
}

impl From<DynamicImage> for PlotImage {
    fn from(image: DynamicImage) -> Self {
        Self::Image(image)
    }
}

impl From<RgbImage> for PlotImage {
    fn from(image: RgbImage) -> Self {
        Self::Image(DynamicImage::ImageRgb8(image))
    }
}

impl From<GrayImage> for PlotImage {
    fn from(image: GrayImage) -> Self {
        Self::Image(DynamicImage::ImageLuma8(image))
    }
}

impl PlotImage {
    /// Normalize the image to a pixel buffer.
    pub fn into_frame(self) -> Result<Frame, UsageError> {
        match self {
            Self::Array(array) => Frame::from_array(array),
            Self::Image(image) => Ok(Frame::from_dynamic_image(&image)),
        }
    }
}

/// A normalized pixel buffer in row-major `H×W[×C]` layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Gray(Array2<u8>),
    Bgr(Array3<u8>),
}

impl Frame {
    pub fn from_array(array: ArrayD<u8>) -> Result<Self, UsageError> {
        let shape = array.shape().to_vec();
        let unsupported = || UsageError::UnsupportedImageShape(shape.clone());

        let frame = match *shape.as_slice() {
            [h, w] if h > 0 && w > 0 => {
                Self::Gray(array.into_dimensionality::<Ix2>().map_err(|_| unsupported())?)
            }
            [h, w, 1] if h > 0 && w > 0 => Self::Gray(
                array
                    .into_dimensionality::<Ix3>()
                    .map_err(|_| unsupported())?
                    .index_axis_move(Axis(2), 0),
            ),
            [h, w, 3] if h > 0 && w > 0 => {
                Self::Bgr(array.into_dimensionality::<Ix3>().map_err(|_| unsupported())?)
            }
            _ => return Err(unsupported()),
        };
        Ok(frame)
    }

    /// Convert a decoded image. Color images become BGR buffers and the alpha
    /// channel is dropped.
    pub fn from_dynamic_image(image: &DynamicImage) -> Self {
        let (w, h) = (image.width() as usize, image.height() as usize);

        if image.color().has_color() {
            let rgb = image.to_rgb8();
            Self::Bgr(Array3::from_shape_fn((h, w, 3), |(y, x, c)| {
                rgb.get_pixel(x as u32, y as u32)[2 - c]
            }))
        } else {
            let gray = image.to_luma8();
            Self::Gray(Array2::from_shape_fn((h, w), |(y, x)| {
                gray.get_pixel(x as u32, y as u32)[0]
            }))
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Self::Gray(array) => array.nrows(),
            Self::Bgr(array) => array.shape()[0],
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Self::Gray(array) => array.ncols(),
            Self::Bgr(array) => array.shape()[1],
        }
    }

    /// Render the frame to display colors.
    ///
    /// Gray frames are min-max normalized and mapped through the colormap.
    /// A constant gray frame maps to the low end of the colormap.
    pub fn to_rgb_image(&self, cmap: Colormap) -> RgbImage {
        let (w, h) = (self.width() as u32, self.height() as u32);

        match self {
            Self::Bgr(array) => RgbImage::from_fn(w, h, |x, y| {
                let (x, y) = (x as usize, y as usize);
                Rgb([array[[y, x, 2]], array[[y, x, 1]], array[[y, x, 0]]])
            }),
            Self::Gray(array) => {
                let (min, max) = array
                    .iter()
                    .fold((u8::MAX, u8::MIN), |(min, max), &v| (min.min(v), max.max(v)));
                let range = max.saturating_sub(min);
                let lut: Vec<Rgb<u8>> = (0..=u8::MAX)
                    .map(|value| {
                        let ratio = if range == 0 {
                            0.0
                        } else {
                            value.saturating_sub(min) as f32 / range as f32
                        };
                        cmap.map(ratio)
                    })
                    .collect();
                RgbImage::from_fn(w, h, |x, y| lut[array[[y as usize, x as usize]] as usize])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn array_shapes() {
        let frame = PlotImage::from(Array2::<u8>::zeros((4, 5))).into_frame().unwrap();
        assert!(matches!(frame, Frame::Gray(_)));
        assert_eq!((frame.height(), frame.width()), (4, 5));

        let frame = PlotImage::from(ArrayD::<u8>::zeros(IxDyn(&[4, 5, 1])))
            .into_frame()
            .unwrap();
        assert!(matches!(frame, Frame::Gray(_)));

        let frame = PlotImage::from(Array3::<u8>::zeros((4, 5, 3)))
            .into_frame()
            .unwrap();
        assert!(matches!(frame, Frame::Bgr(_)));
        assert_eq!((frame.height(), frame.width()), (4, 5));

        let err = PlotImage::from(Array3::<u8>::zeros((4, 5, 4)))
            .into_frame()
            .unwrap_err();
        assert_eq!(err, UsageError::UnsupportedImageShape(vec![4, 5, 4]));

        let err = PlotImage::from(Array2::<u8>::zeros((0, 5)))
            .into_frame()
            .unwrap_err();
        assert_eq!(err, UsageError::UnsupportedImageShape(vec![0, 5]));
    }

    #[test]
    fn dynamic_image_matches_bgr_array() {
        let rgb = RgbImage::from_fn(6, 4, |x, y| Rgb([x as u8 * 40, y as u8 * 60, 7]));
        let bgr = Array3::from_shape_fn((4, 6, 3), |(y, x, c)| {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            pixel[2 - c]
        });

        let from_image = PlotImage::from(rgb.clone()).into_frame().unwrap();
        let from_array = PlotImage::from(bgr).into_frame().unwrap();
        assert_eq!(from_image, from_array);
        assert_eq!(from_image.to_rgb_image(Colormap::Gray), rgb);
    }

    #[test]
    fn gray_image_stays_single_channel() {
        let gray = GrayImage::from_fn(3, 2, |x, y| image::Luma([(x + y) as u8]));
        let frame = PlotImage::from(gray).into_frame().unwrap();
        match frame {
            Frame::Gray(array) => assert_eq!(array[[1, 2]], 3),
            _ => panic!("expect a gray frame"),
        }
    }

    #[test]
    fn gray_is_min_max_normalized() {
        let array = Array2::from_shape_vec((1, 3), vec![10u8, 20, 30]).unwrap();
        let image = Frame::Gray(array).to_rgb_image(Colormap::Gray);
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([128, 128, 128]));
        assert_eq!(image.get_pixel(2, 0), &Rgb([255, 255, 255]));

        let constant = Frame::Gray(Array2::from_elem((2, 2), 9u8)).to_rgb_image(Colormap::GrayR);
        assert!(constant.pixels().all(|pixel| pixel == &Rgb([255, 255, 255])));
    }
}

//! Detection overlays drawn on images.

use crate::common::*;
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect as PixelRect};

/// Detected instances of a scene.
#[derive(Debug, Clone)]
pub struct Detections {
    pub xyxy: Vec<XYXY<f32>>,
    /// Instance masks in `N×H×W` shape.
    pub mask: Option<Array3<bool>>,
    pub class_id: Vec<usize>,
}

impl Detections {
    pub fn new(
        xyxy: Vec<XYXY<f32>>,
        mask: Option<Array3<bool>>,
        class_id: Vec<usize>,
    ) -> Result<Self> {
        ensure!(
            xyxy.len() == class_id.len(),
            "the number of boxes ({}) and class ids ({}) mismatch",
            xyxy.len(),
            class_id.len()
        );
        if let Some(mask) = &mask {
            ensure!(
                mask.shape()[0] == xyxy.len(),
                "the number of masks ({}) and boxes ({}) mismatch",
                mask.shape()[0],
                xyxy.len()
            );
        }
        Ok(Self {
            xyxy,
            mask,
            class_id,
        })
    }

    pub fn len(&self) -> usize {
        self.xyxy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xyxy.is_empty()
    }

    fn check_scene(&self, scene: &RgbImage) -> Result<()> {
        if let Some(mask) = &self.mask {
            let (width, height) = scene.dimensions();
            let (_, mask_h, mask_w) = mask.dim();
            ensure!(
                mask_h == height as usize && mask_w == width as usize,
                "mask size {}x{} does not match the scene size {}x{}",
                mask_w,
                mask_h,
                width,
                height
            );
        }
        Ok(())
    }
}

/// How annotation colors are chosen from the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLookup {
    /// By the position of the detection.
    Index,
    /// By the class id of the detection.
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette {
    colors: Vec<Rgb<u8>>,
}

impl ColorPalette {
    pub fn new(colors: Vec<Rgb<u8>>) -> Result<Self> {
        ensure!(!colors.is_empty(), "color palette must not be empty");
        Ok(Self { colors })
    }

    /// Get a color, cycling through the palette.
    pub fn by_index(&self, index: usize) -> Rgb<u8> {
        self.colors[index % self.colors.len()]
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        let colors = [
            [0xa3, 0x51, 0xfb],
            [0xe6, 0x19, 0x4b],
            [0xff, 0xa8, 0xb7],
            [0xff, 0xe1, 0x19],
            [0x3c, 0xb4, 0x4b],
            [0x46, 0xf0, 0xf0],
            [0x43, 0x63, 0xd8],
            [0xf5, 0x82, 0x31],
            [0x91, 0x1e, 0xb4],
            [0xbc, 0xf6, 0x0c],
        ];
        Self {
            colors: colors.iter().map(|&rgb| Rgb(rgb)).collect(),
        }
    }
}

fn lookup_color(
    palette: &ColorPalette,
    lookup: ColorLookup,
    detections: &Detections,
    index: usize,
) -> Rgb<u8> {
    match lookup {
        ColorLookup::Index => palette.by_index(index),
        ColorLookup::Class => palette.by_index(detections.class_id[index]),
    }
}

/// Blends instance masks into the scene.
#[derive(Debug, Clone)]
pub struct MaskAnnotator {
    pub palette: ColorPalette,
    /// The weight of the mask color.
    pub opacity: f32,
    pub color_lookup: ColorLookup,
}

impl Default for MaskAnnotator {
    fn default() -> Self {
        Self {
            palette: ColorPalette::default(),
            opacity: 0.5,
            color_lookup: ColorLookup::Index,
        }
    }
}

impl MaskAnnotator {
    /// Return the annotated copy of the scene.
    ///
    /// Larger masks are drawn first so that smaller ones stay visible.
    pub fn annotate(&self, scene: &RgbImage, detections: &Detections) -> Result<RgbImage> {
        let mut output = scene.clone();
        let mask = match &detections.mask {
            Some(mask) => mask,
            None => return Ok(output),
        };
        detections.check_scene(scene)?;

        let opacity = self.opacity.clamp(0.0, 1.0);
        let order = (0..detections.len())
            .map(|index| {
                let area = mask.index_axis(Axis(0), index).iter().filter(|&&v| v).count();
                (index, area)
            })
            .sorted_by_key(|&(_, area)| std::cmp::Reverse(area))
            .map(|(index, _)| index);

        for index in order {
            let color = lookup_color(&self.palette, self.color_lookup, detections, index);
            let instance = mask.index_axis(Axis(0), index);

            for ((y, x), _) in instance.indexed_iter().filter(|(_, &v)| v) {
                let pixel = output.get_pixel_mut(x as u32, y as u32);
                pixel.0.iter_mut().zip(color.0).for_each(|(dst, src)| {
                    *dst = (*dst as f32 * (1.0 - opacity) + src as f32 * opacity).round() as u8;
                });
            }
        }

        Ok(output)
    }
}

/// Draws box outlines.
#[derive(Debug, Clone)]
pub struct BoxAnnotator {
    pub color: Rgb<u8>,
    pub thickness: u32,
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self {
            color: Rgb([255, 0, 0]),
            thickness: 2,
        }
    }
}

impl BoxAnnotator {
    /// Return the annotated copy of the scene.
    ///
    /// Lines grow outwards from the box edges and are clipped to the scene.
    pub fn annotate(&self, scene: &RgbImage, detections: &Detections) -> Result<RgbImage> {
        let mut output = scene.clone();
        let (scene_w, scene_h) = scene.dimensions();
        let size = HW::from_hw([scene_h as f32, scene_w as f32]);

        for rect in &detections.xyxy {
            let rect = match rect.clip_to(&size) {
                Some(rect) => rect,
                None => continue,
            };
            let [x0, y0, x1, y1] = rect.xyxy();
            let left = x0.round() as i32;
            let top = y0.round() as i32;
            let width = ((x1 - x0).round() as u32).max(1);
            let height = ((y1 - y0).round() as u32).max(1);

            for offset in 0..self.thickness {
                let rect = PixelRect::at(left - offset as i32, top - offset as i32)
                    .of_size(width + 2 * offset, height + 2 * offset);
                draw_hollow_rect_mut(&mut output, rect, self.color);
            }
        }

        Ok(output)
    }
}

use super::DatasetInit;
use crate::common::*;

/// A bounding box with its class index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxLabel {
    /// Bounding box in pixel units.
    pub rect: XYWH<f32>,
    pub class: usize,
}

/// The record with image path and boxes, but without image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub name: String,
    pub path: PathBuf,
    pub bboxes: Vec<BoxLabel>,
}

/// The record with image pixels and boxes.
#[derive(Debug, Clone)]
pub struct Sample {
    pub name: String,
    pub image: RgbImage,
    pub bboxes: Vec<BoxLabel>,
}

impl FileRecord {
    /// Read the image file and build the sample.
    pub fn load(&self, init: &DatasetInit) -> Result<Sample> {
        let image = image::open(&self.path)
            .with_context(|| format!("failed to load image '{}'", self.path.display()))?
            .to_rgb8();

        let sample = Sample {
            name: self.name.clone(),
            image,
            bboxes: self.bboxes.clone(),
        };

        if init.full_sample {
            Ok(sample)
        } else {
            Ok(sample.resize(init.image_size as u32))
        }
    }
}

impl Sample {
    /// Resize the image to a square and rescale the boxes to fit.
    pub fn resize(self, size: u32) -> Self {
        let Self {
            name,
            image,
            bboxes,
        } = self;
        let (orig_w, orig_h) = image.dimensions();
        let transform = Transform::from_sizes_exact(
            &HW::from_hw([orig_h as f32, orig_w as f32]),
            &HW::from_hw([size as f32, size as f32]),
        );
        let image = image::imageops::resize(&image, size, size, FilterType::Triangle);
        let bboxes = bboxes
            .into_iter()
            .map(|label| BoxLabel {
                rect: &transform * &label.rect,
                ..label
            })
            .collect();

        Self {
            name,
            image,
            bboxes,
        }
    }
}

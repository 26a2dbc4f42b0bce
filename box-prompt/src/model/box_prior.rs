use super::{check_batch, MaskGenerator, SamOutput};
use crate::common::*;

/// Takes the prompt boxes themselves as the predicted masks.
///
/// Pixels inside a box belong to the first foreground channel and the rest to
/// the background channel. All IoU predictions are one.
#[derive(Debug, Clone)]
pub struct BoxPriorGenerator {
    num_classes: usize,
}

impl BoxPriorGenerator {
    pub fn new(num_classes: usize) -> Result<Self> {
        ensure!(
            num_classes >= 2,
            "at least one foreground class is required, but get {} classes",
            num_classes
        );
        Ok(Self { num_classes })
    }

    fn generate_one(&self, image: &RgbImage, boxes: &[XYXY<f32>]) -> (Array4<f32>, Vec<XYXY<f32>>) {
        let (width, height) = image.dimensions();
        let size = HW::from_hw([height as f32, width as f32]);
        let mut masks = Array4::zeros((boxes.len(), self.num_classes, height as usize, width as usize));
        masks.slice_mut(s![.., 0, .., ..]).fill(1.0);

        let clipped: Vec<_> = boxes
            .iter()
            .enumerate()
            .map(|(index, rect)| {
                let clipped = rect.clip_to(&size);
                if let Some(clipped) = &clipped {
                    let [x0, y0, x1, y1] = clipped.xyxy();
                    let (x0, y0) = (x0.floor() as usize, y0.floor() as usize);
                    let (x1, y1) = (x1.ceil() as usize, y1.ceil() as usize);
                    masks.slice_mut(s![index, 0, y0..y1, x0..x1]).fill(0.0);
                    masks.slice_mut(s![index, 1, y0..y1, x0..x1]).fill(1.0);
                } else {
                    trace!("prompt box {:?} lies outside the image", rect);
                }
                clipped.unwrap_or(*rect)
            })
            .collect();

        (masks, clipped)
    }
}

impl MaskGenerator for BoxPriorGenerator {
    fn generate(&mut self, images: &[RgbImage], boxes: &[Vec<XYXY<f32>>]) -> Result<SamOutput> {
        check_batch(images, boxes)?;

        let (segmentation, bbox): (Vec<_>, Vec<_>) = images
            .iter()
            .zip(boxes)
            .map(|(image, boxes)| self.generate_one(image, boxes))
            .unzip();
        let predicted_iou = boxes
            .iter()
            .map(|boxes| Array2::ones((boxes.len(), self.num_classes)))
            .collect();

        Ok(SamOutput {
            segmentation,
            bbox,
            predicted_iou,
        })
    }
}

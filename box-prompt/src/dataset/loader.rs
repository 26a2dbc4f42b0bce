use super::*;
use crate::common::*;

/// A batch of samples.
///
/// Images and boxes are kept as per-sample lists. Images may differ in size
/// and each image carries its own number of boxes, so nothing is stacked.
#[derive(Debug, Clone)]
pub struct Batch {
    pub names: Vec<String>,
    pub images: Vec<RgbImage>,
    /// Prompt boxes per image in XYXY form.
    pub bboxes: Vec<Vec<XYXY<f32>>>,
}

impl Batch {
    /// Collate samples into a batch, converting boxes from XYWH to XYXY form.
    pub fn collate(samples: Vec<Sample>) -> Self {
        let mut names = Vec::with_capacity(samples.len());
        let mut images = Vec::with_capacity(samples.len());
        let mut bboxes = Vec::with_capacity(samples.len());

        for sample in samples {
            let Sample {
                name,
                image,
                bboxes: labels,
            } = sample;
            names.push(name);
            images.push(image);
            bboxes.push(labels.iter().map(|label| XYXY::from(&label.rect)).collect());
        }

        Self {
            names,
            images,
            bboxes,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Iterate over a dataset in order, one batch at a time.
#[derive(Debug)]
pub struct DataLoader<'a> {
    dataset: &'a dyn Dataset,
    batch_size: usize,
    cursor: usize,
}

impl<'a> DataLoader<'a> {
    pub fn new(dataset: &'a dyn Dataset, batch_size: NonZeroUsize) -> Self {
        Self {
            dataset,
            batch_size: batch_size.get(),
            cursor: 0,
        }
    }

    pub fn num_batches(&self) -> usize {
        (self.dataset.num_records() + self.batch_size - 1) / self.batch_size
    }
}

impl Iterator for DataLoader<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let num_records = self.dataset.num_records();
        if self.cursor >= num_records {
            return None;
        }

        let start = self.cursor;
        let end = (start + self.batch_size).min(num_records);
        self.cursor = end;

        let result = (start..end)
            .map(|index| self.dataset.nth(index))
            .try_collect()
            .map(Batch::collate);
        Some(result)
    }
}

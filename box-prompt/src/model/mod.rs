//! Box-prompted mask generators.

mod box_prior;
#[cfg(feature = "tch")]
mod torch;

pub use box_prior::*;
#[cfg(feature = "tch")]
pub use torch::*;

use crate::{
    common::*,
    config::{ModelConfig, ModelKind},
    dataset::DatasetMeta,
    device::ComputeDevice,
};

/// The output of a mask generator. Each field holds one entry per image.
#[derive(Debug, Clone)]
pub struct SamOutput {
    /// Per-class masks in `N×C×H×W` shape, where `N` is the number of prompt
    /// boxes and channel 0 is the background.
    pub segmentation: Vec<Array4<f32>>,
    /// The boxes the masks are generated for.
    pub bbox: Vec<Vec<XYXY<f32>>>,
    /// Predicted mask quality in `N×C` shape.
    pub predicted_iou: Vec<Array2<f32>>,
}

impl SamOutput {
    pub fn len(&self) -> usize {
        self.segmentation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segmentation.is_empty()
    }
}

/// Generates masks for images prompted by bounding boxes.
pub trait MaskGenerator
where
    Self: Debug,
{
    /// Generate masks for a batch. `boxes[i]` are the prompts of `images[i]`.
    fn generate(&mut self, images: &[RgbImage], boxes: &[Vec<XYXY<f32>>]) -> Result<SamOutput>;
}

/// Arguments to build a mask generator from a checkpoint.
#[derive(Debug, Clone)]
pub struct ModelInit {
    pub checkpoint: PathBuf,
    /// Load the checkpoint state into the model.
    pub load_state: bool,
}

/// Build the mask generator described by the configuration.
pub fn build(
    config: &ModelConfig,
    meta: &DatasetMeta,
    init: &ModelInit,
    device: ComputeDevice,
) -> Result<Box<dyn MaskGenerator>> {
    let generator: Box<dyn MaskGenerator> = match &config.kind {
        ModelKind::BoxPrior => {
            debug!(
                "box prior generator ignores checkpoint '{}'",
                init.checkpoint.display()
            );
            Box::new(BoxPriorGenerator::new(meta.num_classes)?)
        }
        #[cfg(feature = "tch")]
        ModelKind::TorchScript {
            module_file,
            mask_threshold,
        } => Box::new(TorchScriptGenerator::load(
            TorchScriptInit {
                module_file: module_file.clone(),
                num_classes: meta.num_classes,
                mask_threshold: mask_threshold.raw() as f32,
            },
            init,
            device,
        )?),
        #[cfg(not(feature = "tch"))]
        ModelKind::TorchScript { .. } => {
            bail!(
                "TorchScript model on {} requires the 'tch' feature",
                device
            )
        }
    };
    Ok(generator)
}

/// Reduce per-class masks in `N×C×H×W` shape to instance presence masks in
/// `N×H×W` shape. Channel 0 is excluded.
pub fn instance_masks(mask: &Array4<f32>) -> Array3<bool> {
    mask.slice(s![.., 1.., .., ..])
        .sum_axis(Axis(1))
        .mapv(|sum| sum > 0.0)
}

fn check_batch(images: &[RgbImage], boxes: &[Vec<XYXY<f32>>]) -> Result<()> {
    ensure!(
        images.len() == boxes.len(),
        "the number of images ({}) and box lists ({}) mismatch",
        images.len(),
        boxes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_masks_exclude_first_channel() {
        let mut mask = Array4::<f32>::zeros((3, 3, 2, 2));
        // background only
        mask[[0, 0, 0, 0]] = 1.0;
        // foreground in channel 1
        mask[[1, 1, 0, 1]] = 1.0;
        // foreground in channel 2
        mask[[2, 2, 1, 1]] = 1.0;

        let instances = instance_masks(&mask);
        assert_eq!(instances.dim(), (3, 2, 2));
        assert!(instances.index_axis(Axis(0), 0).iter().all(|&v| !v));
        assert!(instances[[1, 0, 1]]);
        assert_eq!(instances.index_axis(Axis(0), 1).iter().filter(|&&v| v).count(), 1);
        assert!(instances[[2, 1, 1]]);
    }

    #[test]
    fn single_channel_has_no_instances() {
        let mask = Array4::<f32>::ones((2, 1, 3, 3));
        assert!(instance_masks(&mask).iter().all(|&v| !v));
    }

    #[test]
    fn build_box_prior() {
        let config = ModelConfig {
            kind: ModelKind::BoxPrior,
            lora_ckpt: None,
            testing_ckpt: Some("ckpt".into()),
        };
        let meta = DatasetMeta {
            num_classes: 3,
            ignore_index: 255,
        };
        let init = ModelInit {
            checkpoint: "ckpt/fold0.pt".into(),
            load_state: true,
        };
        let mut generator = build(&config, &meta, &init, ComputeDevice::Cpu).unwrap();
        let output = generator
            .generate(
                &[RgbImage::new(8, 8)],
                &[vec![XYXY::from_xyxy([1.0, 1.0, 4.0, 4.0])]],
            )
            .unwrap();
        assert_eq!(output.segmentation[0].dim(), (1, 3, 8, 8));
    }

    #[cfg(not(feature = "tch"))]
    #[test]
    fn torch_script_requires_feature() {
        let config = ModelConfig {
            kind: ModelKind::TorchScript {
                module_file: None,
                mask_threshold: r64(0.0),
            },
            lora_ckpt: Some("lora".into()),
            testing_ckpt: None,
        };
        let meta = DatasetMeta {
            num_classes: 2,
            ignore_index: 255,
        };
        let init = ModelInit {
            checkpoint: "lora/fold0.pt".into(),
            load_state: false,
        };
        assert!(build(&config, &meta, &init, ComputeDevice::Cpu).is_err());
    }
}

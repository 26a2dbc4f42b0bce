use super::{check_batch, MaskGenerator, ModelInit, SamOutput};
use crate::{common::*, device::ComputeDevice};
use tch::{CModule, Device, IValue, Kind, Tensor};

/// TorchScript generator initializer.
#[derive(Debug, Clone)]
pub struct TorchScriptInit {
    /// The module whose parameters are replaced by the checkpoint state.
    pub module_file: Option<PathBuf>,
    pub num_classes: usize,
    pub mask_threshold: f32,
}

/// A mask generator backed by a TorchScript module.
///
/// The module is called with an image tensor in `1×3×H×W` shape scaled to
/// `[0, 1]` and a box tensor in `N×4` shape, and returns a tuple of mask
/// logits in `N×C×H×W` shape and IoU predictions in `N×C` shape.
pub struct TorchScriptGenerator {
    module: CModule,
    device: Device,
    num_classes: usize,
    mask_threshold: f32,
}

impl Debug for TorchScriptGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TorchScriptGenerator")
            .field("device", &self.device)
            .field("num_classes", &self.num_classes)
            .field("mask_threshold", &self.mask_threshold)
            .finish()
    }
}

impl TorchScriptGenerator {
    pub fn load(init: TorchScriptInit, model: &ModelInit, device: ComputeDevice) -> Result<Self> {
        let TorchScriptInit {
            module_file,
            num_classes,
            mask_threshold,
        } = init;
        let ModelInit {
            checkpoint,
            load_state,
        } = model;
        let device = Device::from(device);

        let module = match (module_file, *load_state) {
            (Some(module_file), true) => {
                let module = load_module(&module_file, device)?;
                load_state_into(&module, checkpoint, device)?;
                module
            }
            _ => load_module(checkpoint, device)?,
        };

        Ok(Self {
            module,
            device,
            num_classes,
            mask_threshold,
        })
    }

    fn generate_one(
        &self,
        image: &RgbImage,
        boxes: &[XYXY<f32>],
    ) -> Result<(Array4<f32>, Array2<f32>)> {
        let (width, height) = image.dimensions();
        let (height, width) = (height as usize, width as usize);
        let num_boxes = boxes.len();

        if num_boxes == 0 {
            return Ok((
                Array4::zeros((0, self.num_classes, height, width)),
                Array2::zeros((0, self.num_classes)),
            ));
        }

        let image_tensor = Tensor::of_slice(image.as_raw())
            .view([height as i64, width as i64, 3])
            .permute(&[2, 0, 1])
            .unsqueeze(0)
            .to_kind(Kind::Float)
            .to_device(self.device)
            / 255.0;
        let box_values: Vec<f32> = boxes.iter().flat_map(|rect| rect.xyxy()).collect();
        let box_tensor = Tensor::of_slice(&box_values)
            .view([num_boxes as i64, 4])
            .to_device(self.device);

        let output = tch::no_grad(|| {
            self.module
                .forward_is(&[IValue::Tensor(image_tensor), IValue::Tensor(box_tensor)])
        })?;
        let (masks, iou) = match output {
            IValue::Tuple(values) => match <[IValue; 2]>::try_from(values) {
                Ok([IValue::Tensor(masks), IValue::Tensor(iou)]) => (masks, iou),
                _ => bail!("the module must return a pair of tensors"),
            },
            _ => bail!("the module must return a tuple"),
        };

        let masks = masks
            .gt(self.mask_threshold as f64)
            .to_kind(Kind::Float)
            .to_device(Device::Cpu);
        let masks = tensor_to_array(&masks)?.into_dimensionality()?;
        let iou = tensor_to_array(&iou.to_kind(Kind::Float).to_device(Device::Cpu))?
            .into_dimensionality()?;
        Ok((masks, iou))
    }
}

impl MaskGenerator for TorchScriptGenerator {
    fn generate(&mut self, images: &[RgbImage], boxes: &[Vec<XYXY<f32>>]) -> Result<SamOutput> {
        check_batch(images, boxes)?;

        let mut segmentation = Vec::with_capacity(images.len());
        let mut predicted_iou = Vec::with_capacity(images.len());

        for (image, boxes) in izip!(images, boxes) {
            let (masks, iou) = self.generate_one(image, boxes)?;
            let (width, height) = image.dimensions();
            ensure!(
                masks.dim() == (boxes.len(), self.num_classes, height as usize, width as usize),
                "unexpected mask shape {:?}",
                masks.shape()
            );
            segmentation.push(masks);
            predicted_iou.push(iou);
        }

        Ok(SamOutput {
            segmentation,
            bbox: boxes.to_vec(),
            predicted_iou,
        })
    }
}

fn load_module(path: &Path, device: Device) -> Result<CModule> {
    let mut module = CModule::load_on_device(path, device)
        .with_context(|| format!("failed to load TorchScript module '{}'", path.display()))?;
    module.set_eval();
    info!("loaded module '{}' on {:?}", path.display(), device);
    Ok(module)
}

/// Copy the named tensors saved in the checkpoint into module parameters.
fn load_state_into(module: &CModule, checkpoint: &Path, device: Device) -> Result<()> {
    let state: HashMap<String, Tensor> = Tensor::load_multi_with_device(checkpoint, device)
        .with_context(|| format!("failed to load checkpoint '{}'", checkpoint.display()))?
        .into_iter()
        .collect();

    let params = module.named_parameters()?;
    let mut num_missing = 0;

    tch::no_grad(|| -> Result<()> {
        for (name, param) in &params {
            match state.get(name) {
                Some(value) => {
                    ensure!(
                        param.size() == value.size(),
                        "shape mismatch for parameter '{}': {:?} vs {:?}",
                        name,
                        param.size(),
                        value.size()
                    );
                    param.shallow_clone().f_copy_(value)?;
                }
                None => num_missing += 1,
            }
        }
        Ok(())
    })?;

    if num_missing > 0 {
        warn!(
            "{} parameters are not found in checkpoint '{}'",
            num_missing,
            checkpoint.display()
        );
    }
    info!(
        "loaded {} tensors from '{}'",
        params.len() - num_missing,
        checkpoint.display()
    );
    Ok(())
}

fn tensor_to_array(tensor: &Tensor) -> Result<ArrayD<f32>> {
    let shape: Vec<usize> = tensor.size().into_iter().map(|dim| dim as usize).collect();
    let values = Vec::<f32>::from(&tensor.contiguous().flatten(0, -1));
    Ok(ArrayD::from_shape_vec(shape, values)?)
}

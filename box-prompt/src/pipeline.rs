//! The box-prompted evaluation loop.

use crate::{
    annotate::{BoxAnnotator, ColorLookup, Detections, MaskAnnotator},
    checkpoint::resolve_checkpoints,
    common::*,
    config::Config,
    dataset::{DataLoader, DatasetInit, DatasetRegistry},
    device::select_device,
    model::{self, instance_masks, ModelInit},
    plot::{GridPlot, GridPlotInit, PlotImage},
};

const TITLES: &[&str] = &["source image", "instance segmentation"];

/// Run the evaluation with the built-in datasets.
pub fn start(config: &Config) -> Result<()> {
    start_with_registry(config, &DatasetRegistry::with_builtin())
}

/// Run the evaluation, looking up datasets in the given registry.
///
/// For every dataset and every checkpoint, the masks generated from the
/// ground truth boxes are drawn side by side with the boxes. Figures are
/// saved under `<save_dir>/<exp_name>/<dataset>/<checkpoint file name>/` if
/// the save directory is configured, or displayed otherwise.
pub fn start_with_registry(config: &Config, registry: &DatasetRegistry) -> Result<()> {
    let exp_name = config.exp_name()?;
    let checkpoint_root = config.model.checkpoint_root()?;
    let load_state = config.model.load_state();

    let plot = {
        let plot_config = &config.plot;
        GridPlotInit {
            grid_size: (1, 2),
            size: plot_config.size,
            dpi: plot_config.dpi,
            cmap: plot_config.cmap.clone(),
            font_file: plot_config.font_file.clone(),
        }
        .build()?
    };
    let device = select_device(config.device)?;
    let checkpoints = resolve_checkpoints(checkpoint_root)?;
    info!(
        "experiment '{}' evaluates {} checkpoint(s) on {} dataset(s)",
        exp_name,
        checkpoints.len(),
        config.eval_datasets.len()
    );

    let mask_annotator = MaskAnnotator {
        color_lookup: ColorLookup::Index,
        ..Default::default()
    };
    let box_annotator = BoxAnnotator::default();

    for dataset_name in &config.eval_datasets {
        let _span = info_span!("dataset", name = %dataset_name).entered();

        // the test split is shared among folds
        let init = DatasetInit {
            image_size: config.loader.image_size.get(),
            ..DatasetInit::test(&config.data_location)
        };
        let dataset = registry.create(dataset_name, &init)?;
        let meta = dataset.meta();
        info!(
            "{} records, {} classes including background",
            dataset.num_records(),
            meta.num_classes
        );

        for checkpoint in &checkpoints {
            let _span = info_span!("checkpoint", path = %checkpoint.display()).entered();

            let mut generator = model::build(
                &config.model,
                &meta,
                &ModelInit {
                    checkpoint: checkpoint.clone(),
                    load_state,
                },
                device,
            )?;

            let output_dir = match &config.output.save_dir {
                Some(save_dir) => {
                    let dir = save_dir
                        .join(exp_name)
                        .join(dataset_name)
                        .join(checkpoint_dir_name(checkpoint)?);
                    fs::create_dir_all(&dir).with_context(|| {
                        format!("failed to create output directory '{}'", dir.display())
                    })?;
                    Some(dir)
                }
                None => None,
            };

            let loader = DataLoader::new(dataset.as_ref(), config.loader.batch_size);
            let num_batches = loader.num_batches();

            for (batch_index, batch) in loader.enumerate() {
                let batch = batch?;
                let output = generator.generate(&batch.images, &batch.bboxes)?;
                ensure!(
                    output.len() == batch.len(),
                    "the generator returns {} results for {} images",
                    output.len(),
                    batch.len()
                );

                for (name, image, boxes, mask) in izip!(
                    &batch.names,
                    &batch.images,
                    &batch.bboxes,
                    &output.segmentation
                ) {
                    let save_path = match &output_dir {
                        Some(dir) => Some(figure_path(dir, name)?),
                        None => None,
                    };
                    plot_sample(
                        &plot,
                        (&mask_annotator, &box_annotator),
                        image,
                        boxes,
                        mask,
                        save_path.as_deref(),
                    )
                    .with_context(|| format!("failed to plot sample '{}'", name))?;
                }

                info!("batch {}/{} done", batch_index + 1, num_batches);
            }
        }
    }

    Ok(())
}

fn plot_sample(
    plot: &GridPlot,
    (mask_annotator, box_annotator): (&MaskAnnotator, &BoxAnnotator),
    image: &RgbImage,
    boxes: &[XYXY<f32>],
    mask: &Array4<f32>,
    save_path: Option<&Path>,
) -> Result<()> {
    let detections = Detections::new(
        boxes.to_vec(),
        Some(instance_masks(mask)),
        vec![0; boxes.len()],
    )?;
    let semantic = mask_annotator.annotate(image, &detections)?;
    let boxed = box_annotator.annotate(image, &detections)?;

    let images: Vec<PlotImage> = vec![boxed.into(), semantic.into()];
    plot.plot(images, Some(TITLES), save_path)
}

/// The output directory name of a checkpoint, i.e. its file name including
/// the extension.
fn checkpoint_dir_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format_err!("invalid checkpoint file name '{}'", path.display()))
}

/// The figure file of a sample, creating sub-directories for nested sample names.
fn figure_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{}.png", name));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    Ok(path)
}

use super::*;
use crate::common::*;

/// The dataset in Microsoft COCO instance annotation format.
///
/// The dataset root is laid out as
///
/// ```text
/// <root>/annotations/instances_test.json
/// <root>/annotations/fold_<n>/instances_{train,val}.json
/// <root>/<split>/...
/// ```
#[derive(Debug, Clone)]
pub struct CocoDataset {
    pub init: DatasetInit,
    pub classes: IndexSet<String>,
    pub records: Vec<FileRecord>,
}

impl Dataset for CocoDataset {
    fn classes(&self) -> &IndexSet<String> {
        &self.classes
    }

    fn num_records(&self) -> usize {
        self.records.len()
    }

    fn nth(&self, index: usize) -> Result<Sample> {
        let record = self.records.get(index).ok_or_else(|| {
            format_err!(
                "record index {} is out of range, the dataset has {} records",
                index,
                self.records.len()
            )
        })?;
        record.load(&self.init)
    }
}

impl CocoDataset {
    pub fn load(init: &DatasetInit) -> Result<Self> {
        let annotation_file =
            init.split_file("annotations", &format!("instances_{}.json", init.split));
        let image_dir = init.root.join(init.split.as_str());

        let instances: CocoInstances = {
            let text = fs::read_to_string(&annotation_file).with_context(|| {
                format!(
                    "failed to read annotation file '{}'",
                    annotation_file.display()
                )
            })?;
            serde_json::from_str(&text).with_context(|| {
                format!(
                    "failed to parse annotation file '{}'",
                    annotation_file.display()
                )
            })?
        };

        let category_id_to_classes: HashMap<_, _> = instances
            .categories
            .iter()
            .map(|cat| (cat.id, cat.name.to_owned()))
            .collect();
        let classes: IndexSet<_> = instances
            .categories
            .iter()
            .map(|cat| cat.name.to_owned())
            .collect();
        ensure!(
            classes.len() == instances.categories.len(),
            "duplicated category names found in '{}'",
            annotation_file.display()
        );

        instances.annotations.iter().try_for_each(|ann| {
            ensure!(
                category_id_to_classes.contains_key(&ann.category_id),
                "invalid category id {} found in annotation {}",
                ann.category_id,
                ann.id
            );
            Ok(())
        })?;

        // build records
        let mut annotations = instances
            .annotations
            .iter()
            .filter(|ann| !ann.iscrowd)
            .map(|ann| (ann.image_id, ann))
            .into_group_map();

        let records: Vec<_> = instances
            .images
            .iter()
            .filter_map(|image| {
                let anns = match annotations.remove(&image.id) {
                    Some(anns) => anns,
                    None => {
                        debug!("skip image '{}' without annotations", image.file_name);
                        return None;
                    }
                };
                Some((image, anns))
            })
            .map(|(image, anns)| -> Result<_> {
                let bboxes: Vec<_> = anns
                    .into_iter()
                    .map(|ann| -> Result<_> {
                        let category_name = &category_id_to_classes[&ann.category_id];
                        let class = classes
                            .get_index_of(category_name.as_str())
                            .ok_or_else(|| format_err!("unknown class '{}'", category_name))?
                            + 1;
                        let rect = XYWH::try_from_xywh(ann.bbox)?;
                        Ok(BoxLabel { rect, class })
                    })
                    .try_collect()?;

                let path = image_dir.join(&image.file_name);
                Ok(FileRecord {
                    name: sample_name(&image_dir, &path)?,
                    path,
                    bboxes,
                })
            })
            .try_collect()?;
        check_unique_names(&records)?;

        if !annotations.is_empty() {
            warn!(
                "{} annotated images are not listed in '{}'",
                annotations.len(),
                annotation_file.display()
            );
        }

        info!(
            "loaded {} records from '{}'",
            records.len(),
            annotation_file.display()
        );

        Ok(Self {
            init: init.clone(),
            classes,
            records,
        })
    }

    pub fn open_boxed(init: &DatasetInit) -> Result<Box<dyn Dataset>> {
        Ok(Box::new(Self::load(init)?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CocoInstances {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,
    /// The box in `[x, y, w, h]` order.
    pub bbox: [f32; 4],
    #[serde(default, deserialize_with = "deserialize_iscrowd")]
    pub iscrowd: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CocoCategory {
    pub id: u64,
    pub name: String,
}

fn deserialize_iscrowd<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = u8::deserialize(deserializer)?;
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(D::Error::custom(format!(
            "iscrowd must be 0 or 1, but get {}",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn write_dataset(root: &Path) {
        fs::create_dir_all(root.join("annotations")).unwrap();
        fs::create_dir_all(root.join("test")).unwrap();
        for name in ["0001.jpg", "0002.png", "0003.png"] {
            RgbImage::from_pixel(32, 24, Rgb([200, 100, 50]))
                .save(root.join("test").join(name))
                .unwrap();
        }
        let instances = serde_json::json!({
            "images": [
                { "id": 2, "file_name": "0002.png", "width": 32, "height": 24 },
                { "id": 1, "file_name": "0001.jpg", "width": 32, "height": 24 },
                { "id": 3, "file_name": "0003.png", "width": 32, "height": 24 }
            ],
            "annotations": [
                { "id": 10, "image_id": 1, "category_id": 7, "bbox": [1.0, 2.0, 3.0, 4.0], "iscrowd": 0 },
                { "id": 11, "image_id": 2, "category_id": 9, "bbox": [4.0, 4.0, 8.0, 8.0] },
                { "id": 12, "image_id": 2, "category_id": 7, "bbox": [0.0, 0.0, 2.0, 2.0], "iscrowd": 0 },
                { "id": 13, "image_id": 2, "category_id": 7, "bbox": [0.0, 0.0, 30.0, 20.0], "iscrowd": 1 }
            ],
            "categories": [
                { "id": 7, "name": "nucleus" },
                { "id": 9, "name": "cell" }
            ]
        });
        fs::write(
            root.join("annotations").join("instances_test.json"),
            serde_json::to_string(&instances).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn coco_dataset_test() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());

        let dataset = CocoDataset::load(&DatasetInit::test(dir.path())).unwrap();
        assert_eq!(dataset.num_records(), 2);
        assert_eq!(dataset.num_classes(), 3);
        assert_eq!(dataset.classes.get_index_of("cell"), Some(1));

        let sample = dataset.nth(0).unwrap();
        assert_eq!(sample.name, "0002");
        assert_eq!(sample.bboxes.len(), 2);
        assert_eq!(sample.bboxes[0].class, 2);
        assert_eq!(sample.bboxes[0].rect.xywh(), [4.0, 4.0, 8.0, 8.0]);

        let sample = dataset.nth(1).unwrap();
        assert_eq!(sample.name, "0001");
        assert_eq!(sample.image.dimensions(), (32, 24));
        assert_eq!(sample.bboxes[0].class, 1);
    }

    #[test]
    fn coco_dataset_resized_samples() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());

        let init = DatasetInit {
            full_sample: false,
            image_size: 16,
            ..DatasetInit::test(dir.path())
        };
        let dataset = CocoDataset::load(&init).unwrap();
        let sample = dataset.nth(1).unwrap();
        assert_eq!(sample.image.dimensions(), (16, 16));
        let [x, y, w, h] = sample.bboxes[0].rect.xywh();
        assert_abs_diff_eq!(x, 0.5);
        assert_abs_diff_eq!(y, 4.0 / 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(w, 1.5);
        assert_abs_diff_eq!(h, 8.0 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn coco_dataset_invalid_category() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let path = dir.path().join("annotations").join("instances_test.json");
        let text = fs::read_to_string(&path)
            .unwrap()
            .replace("\"category_id\":9", "\"category_id\":8");
        fs::write(&path, text).unwrap();

        assert!(CocoDataset::load(&DatasetInit::test(dir.path())).is_err());
    }

    #[test]
    fn coco_dataset_nested_file_names() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        for sub in ["x", "y"] {
            let sub_dir = dir.path().join("test").join(sub);
            fs::create_dir_all(&sub_dir).unwrap();
            RgbImage::new(8, 8).save(sub_dir.join("a.png")).unwrap();
        }
        let instances = serde_json::json!({
            "images": [
                { "id": 1, "file_name": "x/a.png" },
                { "id": 2, "file_name": "y/a.png" }
            ],
            "annotations": [
                { "id": 10, "image_id": 1, "category_id": 7, "bbox": [1.0, 1.0, 2.0, 2.0] },
                { "id": 11, "image_id": 2, "category_id": 7, "bbox": [1.0, 1.0, 2.0, 2.0] }
            ],
            "categories": [{ "id": 7, "name": "nucleus" }]
        });
        fs::write(
            dir.path().join("annotations").join("instances_test.json"),
            serde_json::to_string(&instances).unwrap(),
        )
        .unwrap();

        let dataset = CocoDataset::load(&DatasetInit::test(dir.path())).unwrap();
        assert_eq!(dataset.nth(0).unwrap().name, "x/a");
        assert_eq!(dataset.nth(1).unwrap().name, "y/a");
    }
}

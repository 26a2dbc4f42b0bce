use super::*;
use crate::common::*;

/// The dataset described by a CSV label file.
///
/// The dataset root is laid out as
///
/// ```text
/// <root>/classes.txt
/// <root>/images/...
/// <root>/test.csv
/// <root>/fold_<n>/{train,val}.csv
/// ```
///
/// Each row of the label file is a box in `image_file,class_name,x,y,w,h`
/// form, where `image_file` is relative to `images/`.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    pub init: DatasetInit,
    pub classes: IndexSet<String>,
    pub records: Vec<FileRecord>,
}

impl Dataset for CsvDataset {
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

impl CsvDataset {
    pub fn load(init: &DatasetInit) -> Result<Self> {
        let classes_file = init.root.join("classes.txt");
        let label_file = init.split_file("", &format!("{}.csv", init.split));
        let image_dir = init.root.join("images");

        // load classes file
        let classes = load_classes_file(&classes_file)?;

        // parse label file
        let samples = load_csv_dataset(&image_dir, &label_file)?;

        // group boxes by image, keeping the order of first appearance
        let mut groups: IndexMap<PathBuf, Vec<BoxLabel>> = IndexMap::new();
        let mut num_skipped = 0;

        for sample in samples {
            let CsvSample {
                image_file,
                class_name,
                x,
                y,
                w,
                h,
            } = sample;
            let class = match classes.get_index_of(class_name.as_str()) {
                Some(index) => index + 1,
                None => {
                    num_skipped += 1;
                    continue;
                }
            };
            let rect = XYWH::try_from_xywh([
                x.raw() as f32,
                y.raw() as f32,
                w.raw() as f32,
                h.raw() as f32,
            ])?;
            groups
                .entry(image_file)
                .or_default()
                .push(BoxLabel { rect, class });
        }

        if num_skipped > 0 {
            warn!(
                "{} boxes in '{}' are skipped due to unknown class names",
                num_skipped,
                label_file.display()
            );
        }

        let records: Vec<_> = groups
            .into_iter()
            .map(|(path, bboxes)| -> Result<_> {
                Ok(FileRecord {
                    name: sample_name(&image_dir, &path)?,
                    path,
                    bboxes,
                })
            })
            .try_collect()?;
        check_unique_names(&records)?;

        info!(
            "loaded {} records from '{}'",
            records.len(),
            label_file.display()
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

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct CsvSample {
    pub image_file: PathBuf,
    pub class_name: String,
    pub x: R64,
    pub y: R64,
    pub w: R64,
    pub h: R64,
}

pub fn load_csv_dataset(
    image_dir: impl AsRef<Path>,
    label_file: impl AsRef<Path>,
) -> Result<Vec<CsvSample>> {
    let image_dir = image_dir.as_ref();
    let label_file = label_file.as_ref();

    // parse label file
    let records: Vec<CsvSample> = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(::csv::Trim::All)
        .from_path(label_file)
        .with_context(|| format!("failed to open label file '{}'", label_file.display()))?
        .deserialize()
        .try_collect()?;

    // check existence of image files
    let records: Vec<_> = records
        .into_iter()
        .map(|record| {
            let image_file = image_dir.join(&record.image_file);
            ensure!(
                image_file.is_file(),
                "the image file '{}' does not exist",
                image_file.display()
            );
            Ok(CsvSample {
                image_file,
                ..record
            })
        })
        .try_collect()?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_dataset(root: &Path) {
        fs::create_dir_all(root.join("images")).unwrap();
        for name in ["a.png", "b.png"] {
            RgbImage::from_pixel(40, 20, Rgb([10, 20, 30]))
                .save(root.join("images").join(name))
                .unwrap();
        }
        fs::write(root.join("classes.txt"), "nucleus\ncell\n").unwrap();
        fs::write(
            root.join("test.csv"),
            "image_file,class_name,x,y,w,h\n\
             b.png,cell,1,2,10,5\n\
             a.png,nucleus,0,0,4,4\n\
             b.png,nucleus,5,5,3,3\n\
             a.png,unknown,1,1,1,1\n",
        )
        .unwrap();
    }

    #[test]
    fn csv_dataset_test() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());

        let dataset = CsvDataset::load(&DatasetInit::test(dir.path())).unwrap();
        assert_eq!(dataset.num_records(), 2);
        assert_eq!(dataset.classes.len(), 2);
        assert_eq!(dataset.num_classes(), 3);
        assert_eq!(dataset.ignore_index(), IGNORE_INDEX);

        let sample = dataset.nth(0).unwrap();
        assert_eq!(sample.name, "b");
        assert_eq!(sample.image.dimensions(), (40, 20));
        assert_eq!(sample.bboxes.len(), 2);
        assert_eq!(sample.bboxes[0].class, 2);
        assert_eq!(sample.bboxes[0].rect.xywh(), [1.0, 2.0, 10.0, 5.0]);

        let sample = dataset.nth(1).unwrap();
        assert_eq!(sample.name, "a");
        assert_eq!(sample.bboxes.len(), 1);

        assert!(dataset.nth(2).is_err());
    }

    #[test]
    fn csv_dataset_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        fs::remove_file(dir.path().join("images").join("a.png")).unwrap();

        assert!(CsvDataset::load(&DatasetInit::test(dir.path())).is_err());
    }

    #[test]
    fn csv_dataset_skips_unlabeled_images() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        fs::write(
            dir.path().join("test.csv"),
            "image_file,class_name,x,y,w,h\n\
             a.png,unknown,1,1,1,1\n\
             b.png,cell,1,2,10,5\n",
        )
        .unwrap();

        let dataset = CsvDataset::load(&DatasetInit::test(dir.path())).unwrap();
        assert_eq!(dataset.num_records(), 1);
        assert_eq!(dataset.records[0].name, "b");
    }

    #[test]
    fn csv_dataset_nested_images() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        for sub in ["x", "y"] {
            let sub_dir = dir.path().join("images").join(sub);
            fs::create_dir_all(&sub_dir).unwrap();
            RgbImage::new(8, 8).save(sub_dir.join("a.png")).unwrap();
        }
        fs::write(
            dir.path().join("test.csv"),
            "image_file,class_name,x,y,w,h\n\
             x/a.png,cell,1,1,2,2\n\
             y/a.png,cell,1,1,2,2\n",
        )
        .unwrap();

        let dataset = CsvDataset::load(&DatasetInit::test(dir.path())).unwrap();
        let names: Vec<_> = dataset.records.iter().map(|record| record.name.as_str()).collect();
        assert_eq!(names, vec!["x/a", "y/a"]);

        // the same image listed under two names in one directory
        RgbImage::new(8, 8)
            .save(dir.path().join("images").join("a.jpg"))
            .unwrap();
        fs::write(
            dir.path().join("test.csv"),
            "image_file,class_name,x,y,w,h\n\
             a.png,cell,1,1,2,2\n\
             a.jpg,cell,1,1,2,2\n",
        )
        .unwrap();
        assert!(CsvDataset::load(&DatasetInit::test(dir.path())).is_err());
    }
}

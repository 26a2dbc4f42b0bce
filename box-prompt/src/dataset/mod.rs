//! Dataset loading toolkit.

mod coco_;
mod csv;
mod loader;
mod record;
mod registry;
mod utils;

pub use self::csv::*;
pub use coco_::*;
pub use loader::*;
pub use record::*;
pub use registry::*;
pub use utils::*;

use crate::common::*;

/// The label value that is excluded from evaluation.
pub const IGNORE_INDEX: i64 = 255;

/// The dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Test => "test",
        }
    }
}

impl Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments passed to dataset constructors.
#[derive(Debug, Clone)]
pub struct DatasetInit {
    pub root: PathBuf,
    pub split: Split,
    /// The cross validation fold. The test split is shared among all folds.
    pub fold_number: usize,
    /// If set, samples are loaded in their original resolution. Otherwise
    /// images are resized to `image_size × image_size` and boxes are rescaled
    /// accordingly.
    pub full_sample: bool,
    pub image_size: usize,
}

impl DatasetInit {
    /// The evaluation setting: the test split in full resolution.
    pub fn test(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            split: Split::Test,
            fold_number: 0,
            full_sample: true,
            image_size: 1024,
        }
    }

    /// Locate a split file under the dataset root.
    ///
    /// The test split is stored at the root, while the other splits are
    /// stored per fold in `fold_<n>` directories.
    pub fn split_file(&self, dir: impl AsRef<Path>, file_name: &str) -> PathBuf {
        let dir = self.root.join(dir);
        match self.split {
            Split::Test => dir.join(file_name),
            Split::Train | Split::Val => dir
                .join(format!("fold_{}", self.fold_number))
                .join(file_name),
        }
    }
}

/// Dataset properties the model factory depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMeta {
    pub num_classes: usize,
    pub ignore_index: i64,
}

/// The generic dataset trait.
pub trait Dataset
where
    Self: Debug,
{
    /// The list of foreground class names of the dataset.
    fn classes(&self) -> &IndexSet<String>;

    /// Get number of records in the dataset.
    fn num_records(&self) -> usize;

    /// Get the nth record in the dataset.
    fn nth(&self, index: usize) -> Result<Sample>;

    /// The number of segmentation classes, including the background class at index 0.
    fn num_classes(&self) -> usize {
        self.classes().len() + 1
    }

    fn ignore_index(&self) -> i64 {
        IGNORE_INDEX
    }

    fn meta(&self) -> DatasetMeta {
        DatasetMeta {
            num_classes: self.num_classes(),
            ignore_index: self.ignore_index(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_file_location() {
        let mut init = DatasetInit::test("/data");
        assert_eq!(
            init.split_file("annotations", "instances_test.json"),
            Path::new("/data/annotations/instances_test.json")
        );

        init.split = Split::Val;
        init.fold_number = 3;
        assert_eq!(
            init.split_file("", "val.csv"),
            Path::new("/data/fold_3/val.csv")
        );
    }
}

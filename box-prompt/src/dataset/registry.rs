use super::*;
use crate::{common::*, error::UsageError};

/// A dataset constructor.
pub type DatasetCtor = fn(&DatasetInit) -> Result<Box<dyn Dataset>>;

/// Dataset constructors looked up by name.
#[derive(Clone, Default)]
pub struct DatasetRegistry {
    ctors: IndexMap<String, DatasetCtor>,
}

impl Debug for DatasetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry populated with the datasets shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("coco", CocoDataset::open_boxed);
        registry.register("csv", CsvDataset::open_boxed);
        registry
    }

    /// Register a constructor, returning the one previously registered under the name.
    pub fn register(&mut self, name: impl Into<String>, ctor: DatasetCtor) -> Option<DatasetCtor> {
        self.ctors.insert(name.into(), ctor)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ctors.keys().map(String::as_str)
    }

    /// Construct the dataset registered under the exact name.
    pub fn create(&self, name: &str, init: &DatasetInit) -> Result<Box<dyn Dataset>> {
        let ctor = self.ctors.get(name).ok_or_else(|| UsageError::UnknownDataset {
            name: name.to_owned(),
            available: self.names().map(ToOwned::to_owned).collect(),
        })?;
        ctor(init).with_context(|| format!("failed to load dataset '{}'", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct EmptyDataset {
        classes: IndexSet<String>,
    }

    impl Dataset for EmptyDataset {
        fn classes(&self) -> &IndexSet<String> {
            &self.classes
        }

        fn num_records(&self) -> usize {
            0
        }

        fn nth(&self, index: usize) -> Result<Sample> {
            bail!("no record {}", index)
        }
    }

    fn open_empty(_init: &DatasetInit) -> Result<Box<dyn Dataset>> {
        Ok(Box::new(EmptyDataset {
            classes: ["a", "b"].iter().map(|name| name.to_string()).collect(),
        }))
    }

    #[test]
    fn builtin_names() {
        let registry = DatasetRegistry::with_builtin();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["coco", "csv"]);
    }

    #[test]
    fn lookup_by_exact_name() {
        let mut registry = DatasetRegistry::new();
        assert!(registry.register("empty", open_empty).is_none());

        let dataset = registry
            .create("empty", &DatasetInit::test("/nonexistent"))
            .unwrap();
        assert_eq!(dataset.num_classes(), 3);

        let err = registry
            .create("Empty", &DatasetInit::test("/nonexistent"))
            .unwrap_err();
        match err.downcast_ref::<UsageError>() {
            Some(UsageError::UnknownDataset { name, available }) => {
                assert_eq!(name, "Empty");
                assert_eq!(available, &vec!["empty".to_owned()]);
            }
            _ => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn constructor_errors_propagate() {
        let registry = DatasetRegistry::with_builtin();
        let dir = tempfile::tempdir().unwrap();
        assert!(registry
            .create("csv", &DatasetInit::test(dir.path()))
            .is_err());
    }
}

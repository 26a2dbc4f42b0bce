//! Evaluation program configuration format.

use crate::{common::*, device::DeviceConfig, error::UsageError};

pub use loader::*;
pub use model::*;
pub use output::*;
pub use plot::*;

pub static CONFIG_VERSION: Lazy<VersionReq> = Lazy::new(|| VersionReq::parse("0.1.0").unwrap());

/// The main evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_version")]
    pub version: Version,
    /// The experiment name. It must be set either here or on the command line.
    pub exp_name: Option<String>,
    /// The device where the mask generator runs on.
    #[serde(default, with = "crate::device::serde_device")]
    pub device: DeviceConfig,
    /// The root directory where datasets are stored.
    pub data_location: PathBuf,
    /// Names of datasets to be evaluated, looked up in the dataset registry.
    pub eval_datasets: Vec<String>,
    pub model: ModelConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub plot: PlotConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        Self::from_json5(&text)
    }

    pub fn from_json5(text: &str) -> Result<Self> {
        let config = json5::from_str(text)?;
        Ok(config)
    }

    /// Get the experiment name, or fail if it is not set.
    pub fn exp_name(&self) -> Result<&str, UsageError> {
        self.exp_name.as_deref().ok_or(UsageError::MissingExpName)
    }
}

mod model {
    use super::*;

    /// The model configuration.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ModelConfig {
        pub kind: ModelKind,
        /// A LoRA checkpoint file, or a directory of per-fold checkpoints.
        pub lora_ckpt: Option<PathBuf>,
        /// A full checkpoint file, or a directory of per-fold checkpoints.
        ///
        /// When it is set, the saved state is loaded into the model.
        pub testing_ckpt: Option<PathBuf>,
    }

    impl ModelConfig {
        /// The path that checkpoints are resolved from. LoRA checkpoints take precedence.
        pub fn checkpoint_root(&self) -> Result<&Path, UsageError> {
            self.lora_ckpt
                .as_deref()
                .or(self.testing_ckpt.as_deref())
                .ok_or(UsageError::MissingCheckpoint)
        }

        pub fn load_state(&self) -> bool {
            self.testing_ckpt.is_some()
        }
    }

    /// Variants of mask generators.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type")]
    pub enum ModelKind {
        /// Take the prompt boxes as the predicted masks.
        BoxPrior,
        /// A TorchScript module taking an image and prompt boxes.
        TorchScript {
            /// The scripted module whose parameters are replaced by the
            /// checkpoint state. Checkpoints are loaded as modules if not set.
            #[serde(default)]
            module_file: Option<PathBuf>,
            /// Mask logits above the threshold count as foreground.
            #[serde(default = "default_mask_threshold")]
            mask_threshold: R64,
        },
    }

    fn default_mask_threshold() -> R64 {
        r64(0.0)
    }
}

mod loader {
    use super::*;

    /// Data loading options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct LoaderConfig {
        pub batch_size: NonZeroUsize,
        /// The square image size when samples are not loaded in full resolution.
        pub image_size: NonZeroUsize,
    }

    impl Default for LoaderConfig {
        fn default() -> Self {
            Self {
                batch_size: NonZeroUsize::new(2).unwrap(),
                image_size: NonZeroUsize::new(1024).unwrap(),
            }
        }
    }
}

mod plot {
    use super::*;

    /// Figure rendering options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct PlotConfig {
        /// Width and height of the figure in inches.
        pub size: (f32, f32),
        pub dpi: f32,
        /// The colormap applied to single channel images.
        pub cmap: String,
        /// The font used to draw titles. System fonts are searched if not set.
        pub font_file: Option<PathBuf>,
    }

    impl Default for PlotConfig {
        fn default() -> Self {
            Self {
                size: (12.0, 12.0),
                dpi: 100.0,
                cmap: "gray".into(),
                font_file: None,
            }
        }
    }
}

mod output {
    use super::*;

    /// Output options.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(default)]
    pub struct OutputConfig {
        /// If set, figures are saved under this directory instead of being displayed.
        pub save_dir: Option<PathBuf>,
    }
}

pub fn deserialize_version<'de, D>(deserializer: D) -> Result<Version, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let version = Version::parse(&text).map_err(|err| {
        D::Error::custom(format!(
            "failed to parse version number '{}': {:?}",
            text, err
        ))
    })?;

    if !CONFIG_VERSION.matches(&version) {
        return Err(D::Error::custom(format!(
            "incompatible version: get '{}', but it is incompatible with requirement '{}'",
            version, &*CONFIG_VERSION,
        )));
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceConfig;

    const MINIMAL: &str = r#"{
        version: "0.1.0",
        data_location: "data",
        eval_datasets: ["csv"],
        model: { kind: { type: "BoxPrior" }, testing_ckpt: "ckpts" },
    }"#;

    #[test]
    fn load_minimal_config() {
        let config = Config::from_json5(MINIMAL).unwrap();
        assert_eq!(config.device, DeviceConfig::Auto);
        assert_eq!(config.loader.batch_size.get(), 2);
        assert_eq!(config.plot.cmap, "gray");
        assert_eq!(config.plot.size, (12.0, 12.0));
        assert!(config.output.save_dir.is_none());
        assert_eq!(config.exp_name(), Err(UsageError::MissingExpName));
        assert_eq!(config.model.checkpoint_root().unwrap(), Path::new("ckpts"));
        assert!(config.model.load_state());
    }

    #[test]
    fn load_full_config() {
        let text = r#"{
            version: "0.1.3",
            exp_name: "fold-eval",
            device: "cuda:1",
            data_location: "/data",
            eval_datasets: ["coco", "csv"],
            model: {
                kind: { type: "TorchScript", mask_threshold: 0.5 },
                lora_ckpt: "lora",
                testing_ckpt: "full",
            },
            loader: { batch_size: 4 },
            plot: { size: [8, 4], cmap: "viridis" },
            output: { save_dir: "out" },
        }"#;
        let config = Config::from_json5(text).unwrap();
        assert_eq!(config.exp_name().unwrap(), "fold-eval");
        assert_eq!(config.device, DeviceConfig::Cuda(1));
        assert_eq!(config.loader.batch_size.get(), 4);
        assert_eq!(config.loader.image_size.get(), 1024);
        assert_eq!(config.plot.size, (8.0, 4.0));
        assert_eq!(config.plot.dpi, 100.0);
        assert_eq!(config.model.checkpoint_root().unwrap(), Path::new("lora"));
        assert!(matches!(
            config.model.kind,
            ModelKind::TorchScript { mask_threshold, module_file: None } if mask_threshold.raw() == 0.5
        ));
        assert_eq!(config.output.save_dir.as_deref(), Some(Path::new("out")));
    }

    #[test]
    fn reject_incompatible_version() {
        let text = MINIMAL.replace("0.1.0", "0.2.0");
        let err = Config::from_json5(&text).unwrap_err();
        assert!(format!("{}", err).contains("incompatible version"));
    }

    #[test]
    fn missing_checkpoint() {
        let text = MINIMAL.replace(r#", testing_ckpt: "ckpts""#, "");
        let config = Config::from_json5(&text).unwrap();
        assert_eq!(
            config.model.checkpoint_root(),
            Err(UsageError::MissingCheckpoint)
        );
        assert!(!config.model.load_state());
    }
}

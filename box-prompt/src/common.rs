//! Common imports from external crates.

pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use bbox::{prelude::*, Transform, HW, XYWH, XYXY};
pub use image::{imageops::FilterType, DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
pub use indexmap::{IndexMap, IndexSet};
pub use itertools::{izip, Itertools as _};
pub use ndarray::{s, Array2, Array3, Array4, ArrayD, Axis, Ix2, Ix3};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use semver::{Version, VersionReq};
pub use serde::{de::Error as DeserializeError, Deserialize, Deserializer, Serialize, Serializer};
pub use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug, Display},
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
};
pub use tracing::{debug, info, info_span, trace, warn};

use crate::{common::*, error::UsageError};

/// A colormap applied to single channel images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Colormap {
    Gray,
    GrayR,
    Viridis,
    Jet,
    Hot,
    Bone,
}

/// Viridis samples at evenly spaced positions.
const VIRIDIS: [[u8; 3]; 10] = [
    [0x44, 0x01, 0x54],
    [0x48, 0x28, 0x78],
    [0x3e, 0x4a, 0x89],
    [0x31, 0x68, 0x8e],
    [0x26, 0x82, 0x8e],
    [0x1f, 0x9e, 0x89],
    [0x35, 0xb7, 0x79],
    [0x6e, 0xce, 0x58],
    [0xb5, 0xde, 0x2b],
    [0xfd, 0xe7, 0x25],
];

// (position, value) control points per channel
const JET: [&[(f32, f32)]; 3] = [
    &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)],
    &[
        (0.0, 0.0),
        (0.125, 0.0),
        (0.375, 1.0),
        (0.64, 1.0),
        (0.91, 0.0),
        (1.0, 0.0),
    ],
    &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)],
];

const HOT: [&[(f32, f32)]; 3] = [
    &[(0.0, 0.0416), (0.365079, 1.0), (1.0, 1.0)],
    &[(0.0, 0.0), (0.365079, 0.0), (0.746032, 1.0), (1.0, 1.0)],
    &[(0.0, 0.0), (0.746032, 0.0), (1.0, 1.0)],
];

impl Colormap {
    pub const ALL: [Colormap; 6] = [
        Self::Gray,
        Self::GrayR,
        Self::Viridis,
        Self::Jet,
        Self::Hot,
        Self::Bone,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gray => "gray",
            Self::GrayR => "gray_r",
            Self::Viridis => "viridis",
            Self::Jet => "jet",
            Self::Hot => "hot",
            Self::Bone => "bone",
        }
    }

    /// Map a ratio in `[0, 1]` to a color. Values out of range are clamped.
    pub fn map(&self, ratio: f32) -> Rgb<u8> {
        let t = if ratio.is_nan() {
            0.0
        } else {
            ratio.clamp(0.0, 1.0)
        };

        let [r, g, b] = match self {
            Self::Gray => [t; 3],
            Self::GrayR => [1.0 - t; 3],
            Self::Viridis => {
                let pos = t * (VIRIDIS.len() - 1) as f32;
                let lower = (pos.floor() as usize).min(VIRIDIS.len() - 2);
                let frac = pos - lower as f32;
                let [lo, hi] = [VIRIDIS[lower], VIRIDIS[lower + 1]];
                let mut rgb = [0.0; 3];
                rgb.iter_mut().enumerate().for_each(|(c, value)| {
                    *value = (lo[c] as f32 * (1.0 - frac) + hi[c] as f32 * frac) / 255.0;
                });
                rgb
            }
            Self::Jet => JET.map(|points| interpolate(points, t)),
            Self::Hot => HOT.map(|points| interpolate(points, t)),
            Self::Bone => {
                let [hr, hg, hb] = HOT.map(|points| interpolate(points, t));
                [
                    (7.0 * t + hb) / 8.0,
                    (7.0 * t + hg) / 8.0,
                    (7.0 * t + hr) / 8.0,
                ]
            }
        };

        Rgb([to_u8(r), to_u8(g), to_u8(b)])
    }
}

impl FromStr for Colormap {
    type Err = UsageError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|cmap| cmap.name() == name)
            .copied()
            .ok_or_else(|| UsageError::UnknownColormap(name.to_owned()))
    }
}

impl Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Piecewise linear interpolation over control points sorted by position.
fn interpolate(points: &[(f32, f32)], t: f32) -> f32 {
    points
        .iter()
        .tuple_windows()
        .find(|(_, (x1, _))| t <= *x1)
        .map(|(&(x0, y0), &(x1, y1))| {
            if x1 > x0 {
                y0 + (y1 - y0) * (t - x0) / (x1 - x0)
            } else {
                y1
            }
        })
        .unwrap_or_else(|| points.last().map(|&(_, y)| y).unwrap_or(0.0))
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        for cmap in Colormap::ALL {
            assert_eq!(cmap.name().parse::<Colormap>().unwrap(), cmap);
        }
        assert_eq!(
            "Viridis".parse::<Colormap>().unwrap_err(),
            UsageError::UnknownColormap("Viridis".into())
        );
    }

    #[test]
    fn endpoints() {
        assert_eq!(Colormap::Gray.map(0.0), Rgb([0, 0, 0]));
        assert_eq!(Colormap::Gray.map(1.0), Rgb([255, 255, 255]));
        assert_eq!(Colormap::GrayR.map(0.0), Rgb([255, 255, 255]));
        assert_eq!(Colormap::Viridis.map(0.0), Rgb([0x44, 0x01, 0x54]));
        assert_eq!(Colormap::Viridis.map(1.0), Rgb([0xfd, 0xe7, 0x25]));
        assert_eq!(Colormap::Jet.map(0.0), Rgb([0, 0, 128]));
        assert_eq!(Colormap::Jet.map(1.0), Rgb([128, 0, 0]));
        assert_eq!(Colormap::Hot.map(1.0), Rgb([255, 255, 255]));
        assert_eq!(Colormap::Bone.map(1.0), Rgb([255, 255, 255]));
        assert_eq!(Colormap::Bone.map(0.0), Rgb([0, 0, 1]));
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(Colormap::Jet.map(-1.0), Colormap::Jet.map(0.0));
        assert_eq!(Colormap::Jet.map(2.0), Colormap::Jet.map(1.0));
        assert_eq!(Colormap::Hot.map(f32::NAN), Colormap::Hot.map(0.0));
    }
}

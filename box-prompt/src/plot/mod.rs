//! Grid image plotting.

mod colormap;
mod figure;
mod frame;

pub use colormap::*;
pub use figure::*;
pub use frame::*;

use crate::{common::*, error::UsageError};
use ab_glyph::{FontVec, PxScale};
use imageproc::drawing::{draw_text_mut, text_size};

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/System/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Title font size in points.
const TITLE_POINTS: f32 = 12.0;
const WINDOW_NAME: &str = "figure";
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const TITLE_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Plot images on a grid and either save the figure or show it.
///
/// Single channel images are mapped through the colormap named by `cmap`,
/// while color arrays are taken as BGR. Titles are assigned to images in
/// order, and a shorter title list leaves the remaining images unlabeled.
///
/// It fails with [UsageError::GridOverflow] if there are more images than
/// grid cells, in which case nothing is drawn.
pub fn plot_images_grid(
    images: Vec<PlotImage>,
    grid_size: (usize, usize),
    titles: Option<&[&str]>,
    size: (f32, f32),
    cmap: &str,
    save_path: Option<&Path>,
) -> Result<()> {
    let plot = GridPlotInit {
        grid_size,
        size,
        cmap: cmap.to_owned(),
        ..Default::default()
    }
    .build()?;
    plot.plot(images, titles, save_path)
}

/// Grid plot initializer.
#[derive(Debug, Clone)]
pub struct GridPlotInit {
    /// Number of rows and columns.
    pub grid_size: (usize, usize),
    /// Figure width and height in inches.
    pub size: (f32, f32),
    pub dpi: f32,
    pub cmap: String,
    /// The title font. System fonts are searched if not set.
    pub font_file: Option<PathBuf>,
}

impl Default for GridPlotInit {
    fn default() -> Self {
        Self {
            grid_size: (1, 1),
            size: (12.0, 12.0),
            dpi: 100.0,
            cmap: "gray".into(),
            font_file: None,
        }
    }
}

impl GridPlotInit {
    pub fn build(self) -> Result<GridPlot> {
        let Self {
            grid_size: (rows, cols),
            size: (width, height),
            dpi,
            cmap,
            font_file,
        } = self;

        if rows == 0 || cols == 0 {
            return Err(UsageError::EmptyGrid { rows, cols }.into());
        }
        ensure!(
            width > 0.0 && height > 0.0,
            "figure size must be positive, but get {}x{}",
            width,
            height
        );
        ensure!(dpi > 0.0, "dpi must be positive, but get {}", dpi);
        let cmap: Colormap = cmap.parse()?;
        let font = load_font(font_file.as_deref())?;

        let canvas_width = ((width * dpi).round() as u32).max(cols as u32);
        let canvas_height = ((height * dpi).round() as u32).max(rows as u32);

        Ok(GridPlot {
            rows,
            cols,
            canvas_width,
            canvas_height,
            cmap,
            font,
            title_scale: TITLE_POINTS * dpi / 72.0,
        })
    }
}

/// The grid plotter.
pub struct GridPlot {
    rows: usize,
    cols: usize,
    canvas_width: u32,
    canvas_height: u32,
    cmap: Colormap,
    font: Option<FontVec>,
    title_scale: f32,
}

impl Debug for GridPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridPlot")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("canvas_width", &self.canvas_width)
            .field("canvas_height", &self.canvas_height)
            .field("cmap", &self.cmap)
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl GridPlot {
    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// Render the images and save the figure to `save_path`, or show it if
    /// the path is not given.
    pub fn plot(
        &self,
        images: Vec<PlotImage>,
        titles: Option<&[&str]>,
        save_path: Option<&Path>,
    ) -> Result<()> {
        let mut figure = self.render(images, titles)?;
        match save_path {
            Some(path) => figure.save(path)?,
            None => figure.show(WINDOW_NAME)?,
        }
        Ok(())
    }

    /// Render the images to a figure in row-major order.
    pub fn render(&self, images: Vec<PlotImage>, titles: Option<&[&str]>) -> Result<Figure> {
        let frames: Vec<Frame> = images
            .into_iter()
            .map(PlotImage::into_frame)
            .try_collect()?;

        if frames.len() > self.capacity() {
            return Err(UsageError::GridOverflow {
                num_images: frames.len(),
                rows: self.rows,
                cols: self.cols,
            }
            .into());
        }

        if let Some(titles) = titles {
            if titles.len() < frames.len() {
                debug!(
                    "{} titles for {} images, the rest are left unlabeled",
                    titles.len(),
                    frames.len()
                );
            }
        }
        if titles.is_some() && self.font.is_none() {
            debug!("no font is available, titles are skipped");
        }

        let mut canvas = RgbImage::from_pixel(self.canvas_width, self.canvas_height, BACKGROUND);
        let cell_w = self.canvas_width / self.cols as u32;
        let cell_h = self.canvas_height / self.rows as u32;

        for (index, frame) in frames.iter().enumerate() {
            let row = (index / self.cols) as u32;
            let col = (index % self.cols) as u32;
            let title = titles.and_then(|titles| titles.get(index)).copied();
            self.draw_cell(
                &mut canvas,
                frame,
                title,
                (col * cell_w, row * cell_h),
                (cell_w, cell_h),
            );
        }

        Ok(Figure::new(canvas))
    }

    fn draw_cell(
        &self,
        canvas: &mut RgbImage,
        frame: &Frame,
        title: Option<&str>,
        (left, top): (u32, u32),
        (cell_w, cell_h): (u32, u32),
    ) {
        let pad = cell_w.min(cell_h) / 25;

        // title band
        let title = title.and_then(|text| Some((text, self.font.as_ref()?)));
        let band_h = match title {
            Some(_) => (self.title_scale * 1.5).ceil() as u32,
            None => 0,
        };

        if let Some((text, font)) = title {
            let scale = PxScale::from(self.title_scale);
            let (text_w, _) = text_size(scale, font, text);
            let x = left as i32 + (cell_w as i32 - text_w as i32).max(0) / 2;
            let y = (top + pad) as i32;
            draw_text_mut(canvas, TITLE_COLOR, x, y, scale, font, text);
        }

        // fit the image in the remaining area
        let avail_w = cell_w.saturating_sub(pad * 2);
        let avail_h = cell_h.saturating_sub(pad * 2 + band_h);
        let (frame_w, frame_h) = (frame.width() as f32, frame.height() as f32);
        let ratio = (avail_w as f32 / frame_w).min(avail_h as f32 / frame_h);
        let fit_w = (frame_w * ratio).round() as u32;
        let fit_h = (frame_h * ratio).round() as u32;

        if fit_w == 0 || fit_h == 0 {
            debug!("cell is too small to show the image, skipped");
            return;
        }

        let image = frame.to_rgb_image(self.cmap);
        let image = if (fit_w, fit_h) == image.dimensions() {
            image
        } else {
            image::imageops::resize(&image, fit_w, fit_h, FilterType::Nearest)
        };

        let x = left + pad + (avail_w - fit_w) / 2;
        let y = top + pad + band_h + (avail_h - fit_h) / 2;
        image::imageops::overlay(canvas, &image, x as i64, y as i64);
    }
}

/// Load the font file, or the first usable system font if the file is not given.
pub fn load_font(font_file: Option<&Path>) -> Result<Option<FontVec>> {
    if let Some(path) = font_file {
        let data = fs::read(path)
            .with_context(|| format!("failed to read font file '{}'", path.display()))?;
        let font = FontVec::try_from_vec(data)
            .map_err(|_| format_err!("failed to parse font file '{}'", path.display()))?;
        return Ok(Some(font));
    }

    let font = SYSTEM_FONTS.iter().find_map(|path| {
        let data = fs::read(path).ok()?;
        let font = FontVec::try_from_vec(data).ok()?;
        debug!("loaded system font '{}'", path);
        Some(font)
    });
    if font.is_none() {
        debug!("no system font found, titles will not be drawn");
    }
    Ok(font)
}

use crate::common::*;

/// A rendered figure.
///
/// The figure owns the canvas, and the display window once it is shown.
/// Both are released when the figure is dropped.
#[derive(Debug)]
pub struct Figure {
    canvas: RgbImage,
    #[cfg(feature = "opencv")]
    window: Option<String>,
}

impl Figure {
    pub fn new(canvas: RgbImage) -> Self {
        Self {
            canvas,
            #[cfg(feature = "opencv")]
            window: None,
        }
    }

    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    /// Write the figure to a PNG file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.canvas
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("failed to save figure to '{}'", path.display()))?;
        debug!("figure saved to '{}'", path.display());
        Ok(())
    }

    /// Show the figure in a window and wait for a key press.
    #[cfg(feature = "opencv")]
    pub fn show(&mut self, window_name: &str) -> Result<()> {
        use opencv::{
            core::{Mat, Scalar, CV_8UC3},
            highgui,
            prelude::*,
        };

        let (width, height) = self.canvas.dimensions();
        let mut mat = Mat::new_rows_cols_with_default(
            height as i32,
            width as i32,
            CV_8UC3,
            Scalar::all(255.0),
        )?;
        {
            let bytes = mat.data_bytes_mut()?;
            bytes
                .chunks_exact_mut(3)
                .zip_eq(self.canvas.pixels())
                .for_each(|(dst, Rgb([r, g, b]))| dst.copy_from_slice(&[*b, *g, *r]));
        }

        highgui::named_window(window_name, highgui::WINDOW_AUTOSIZE)?;
        self.window = Some(window_name.to_owned());
        highgui::imshow(window_name, &mat)?;
        highgui::wait_key(0)?;
        Ok(())
    }

    #[cfg(not(feature = "opencv"))]
    pub fn show(&mut self, _window_name: &str) -> Result<()> {
        bail!(
            "interactive display requires the 'opencv' feature, \
             please set a save path to write the figure to a file instead"
        )
    }
}

impl Drop for Figure {
    fn drop(&mut self) {
        #[cfg(feature = "opencv")]
        if let Some(window) = self.window.take() {
            if let Err(err) = opencv::highgui::destroy_window(&window) {
                warn!("failed to close window '{}': {:?}", window, err);
            }
        }

        trace!(
            "release figure of size {}x{}",
            self.canvas.width(),
            self.canvas.height()
        );
    }
}

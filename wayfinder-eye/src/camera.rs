//! Frame sources

use crate::error::VisionError;
use crate::frame::Frame;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Continuous supply of video frames
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next frame.
    ///
    /// Permission or device failures are reported as
    /// [`VisionError::CameraUnavailable`]; a finite source that has run dry
    /// returns [`VisionError::StreamEnded`].
    async fn next_frame(&mut self) -> Result<Frame, VisionError>;

    fn name(&self) -> &str;
}

/// Plays back still images from a directory in file-name order
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    looping: bool,
}

impl ImageSequenceSource {
    /// Open a directory of frames
    pub fn open(dir: &Path, looping: bool) -> Result<Self, VisionError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            VisionError::CameraUnavailable(format!("Cannot open frame directory {:?}: {}", dir, e))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(VisionError::CameraUnavailable(format!(
                "No frames found in {:?}",
                dir
            )));
        }

        info!("Frame sequence opened: {} frames from {:?}", paths.len(), dir);
        Ok(Self {
            paths,
            cursor: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[async_trait]
impl FrameSource for ImageSequenceSource {
    async fn next_frame(&mut self) -> Result<Frame, VisionError> {
        if self.cursor >= self.paths.len() {
            if !self.looping {
                return Err(VisionError::StreamEnded);
            }
            self.cursor = 0;
        }

        let path = self.paths[self.cursor].clone();
        self.cursor += 1;
        debug!("Loading frame {:?}", path);

        let image = tokio::task::spawn_blocking(move || image::open(&path))
            .await
            .map_err(|e| VisionError::CameraUnavailable(format!("Frame loader task failed: {}", e)))??;

        Ok(Frame::new(image.to_rgb8()))
    }

    fn name(&self) -> &str {
        "image-sequence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frame(dir: &Path, name: &str, rgb: [u8; 3]) {
        let image = image::RgbImage::from_pixel(4, 3, image::Rgb(rgb));
        image.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_open_missing_dir_is_camera_unavailable() {
        let err = ImageSequenceSource::open(Path::new("/definitely/not/here"), false)
            .err()
            .unwrap();
        assert!(matches!(err, VisionError::CameraUnavailable(_)));
    }

    #[test]
    fn test_open_empty_dir_is_camera_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();
        let err = ImageSequenceSource::open(dir.path(), false).err().unwrap();
        assert!(matches!(err, VisionError::CameraUnavailable(_)));
    }

    #[tokio::test]
    async fn test_frames_play_in_name_order_then_end() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "b.png", [0, 255, 0]);
        write_frame(dir.path(), "a.png", [255, 0, 0]);

        let mut source = ImageSequenceSource::open(dir.path(), false).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().await.unwrap();
        assert_eq!(first.dimensions(), (4, 3));
        assert_eq!(first.pixel(0, 0), [255, 0, 0]);
        let second = source.next_frame().await.unwrap();
        assert_eq!(second.pixel(0, 0), [0, 255, 0]);

        assert!(matches!(source.next_frame().await, Err(VisionError::StreamEnded)));
    }

    #[tokio::test]
    async fn test_looping_source_wraps_around() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "only.png", [9, 9, 9]);

        let mut source = ImageSequenceSource::open(dir.path(), true).unwrap();
        for _ in 0..3 {
            assert_eq!(source.next_frame().await.unwrap().pixel(1, 1), [9, 9, 9]);
        }
    }
}

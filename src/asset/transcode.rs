// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TranscodeError;

/// Converts an image file into a WebP file
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Read `input` and write the converted image to `output`
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}

/// A shared reference to a transcoder
pub type SharedTranscoder = Arc<dyn Transcoder>;

/// Transcoder that shells out to `cwebp`
#[derive(Debug, Clone)]
pub struct CwebpTranscoder {
    program: PathBuf,
    quality: u8,
}

impl CwebpTranscoder {
    /// Use `cwebp` from `PATH`
    pub fn new(quality: u8) -> Self {
        Self::with_program("cwebp", quality)
    }

    /// Use a specific `cwebp` binary
    pub fn with_program(program: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            program: program.into(),
            quality: quality.min(100),
        }
    }

    /// Arguments passed to the program for one conversion
    pub fn args(&self, input: &Path, output: &Path) -> Vec<std::ffi::OsString> {
        vec![
            "-quiet".into(),
            "-q".into(),
            self.quality.to_string().into(),
            input.as_os_str().to_owned(),
            "-o".into(),
            output.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl Transcoder for CwebpTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let program = self.program.display().to_string();

        let result = tokio::process::Command::new(&self.program)
            .args(self.args(input, output))
            .output()
            .await
            .map_err(|e| TranscodeError::SpawnFailed {
                program: program.clone(),
                source: e,
            })?;

        if !result.status.success() {
            return Err(TranscodeError::ExitStatus {
                program,
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Pure-Rust transcoder built on the `image` crate
///
/// The `image` WebP encoder is lossless only, so there is no quality knob.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeTranscoder;

impl NativeTranscoder {
    fn encode(input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let encode_failed = |e: image::ImageError| TranscodeError::EncodeFailed {
            path: input.to_path_buf(),
            source: e,
        };

        let decoded = image::ImageReader::open(input)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| encode_failed(image::ImageError::IoError(e)))?
            .decode()
            .map_err(encode_failed)?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut bytes = Vec::new();
        image::codecs::webp::WebPEncoder::new_lossless(&mut bytes)
            .encode(rgba.as_raw(), width, height, image::ColorType::Rgba8.into())
            .map_err(encode_failed)?;

        std::fs::write(output, bytes).map_err(|e| TranscodeError::WriteFailed {
            path: output.to_path_buf(),
            source: e,
        })
    }
}

#[async_trait]
impl Transcoder for NativeTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || Self::encode(&input, &output))
            .await
            .map_err(|e| TranscodeError::TaskFailed(e.to_string()))?
    }
}

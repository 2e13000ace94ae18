//! Audio track replacement via ffmpeg

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::MediaConfig;

#[async_trait]
pub trait MediaMuxer: Send + Sync {
    /// Write `output` with the video stream of `video` and the audio of
    /// `audio`, returning the output path.
    async fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<PathBuf>;
}

/// Muxer shelling out to the ffmpeg binary
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    ffmpeg_path: PathBuf,
    video_codec: String,
    audio_codec: String,
}

impl FfmpegMuxer {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
        }
    }

    fn build_args(&self, video: &Path, audio: &Path, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            video.to_string_lossy().into_owned(),
            "-i".to_string(),
            audio.to_string_lossy().into_owned(),
            "-map".to_string(),
            "0:v:0".to_string(), // Video from the original
            "-map".to_string(),
            "1:a:0".to_string(), // Audio from the synthesized track
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-y".to_string(), // Overwrite existing
            output.to_string_lossy().into_owned(),
        ]
    }

    /// Check that ffmpeg can be executed
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl MediaMuxer for FfmpegMuxer {
    async fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<PathBuf> {
        info!("🎬 Merging {} with {}", video.display(), audio.display());

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.build_args(video, audio, output);
        debug!("ffmpeg {}", args.join(" "));

        let result = tokio::process::Command::new(&self.ffmpeg_path)
            .args(&args)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr.lines().rev().take(5).collect::<Vec<_>>().join(" | ");
            return Err(anyhow!("ffmpeg exited with {}: {}", result.status, tail));
        }

        if !tokio::fs::try_exists(output).await? {
            return Err(anyhow!("ffmpeg produced no output at {}", output.display()));
        }

        info!("✅ Localized video written: {}", output.display());
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_ffmpeg_args() {
        let muxer = FfmpegMuxer::new(&Config::default().media);
        let args = muxer.build_args(
            Path::new("in.mp4"),
            Path::new("speech.mp3"),
            Path::new("localized_in.mp4"),
        );

        assert_eq!(args.first().map(String::as_str), Some("-i"));
        let joined = args.join(" ");
        assert!(joined.contains("-map 0:v:0 -map 1:a:0"));
        assert!(joined.contains("-c:v libx264 -c:a aac"));
        assert_eq!(args.last().map(String::as_str), Some("localized_in.mp4"));
    }

    #[tokio::test]
    async fn test_missing_binary_fails() {
        let mut config = Config::default().media;
        config.ffmpeg_path = PathBuf::from("/nonexistent/ffmpeg");
        let muxer = FfmpegMuxer::new(&config);

        assert!(!muxer.is_available().await);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let result = muxer
            .replace_audio(
                Path::new("in.mp4"),
                Path::new("a.mp3"),
                &temp_dir.path().join("out.mp4"),
            )
            .await;
        assert!(result.is_err());
    }
}

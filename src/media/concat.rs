//! Stream-copy concatenation with ffmpeg's concat demuxer.

use std::path::{Path, PathBuf};

use super::{run_tool, MediaError, FFMPEG};

/// Build the concat manifest: one `file '<path>'` line per clip.
///
/// Single quotes in paths are closed, escaped and reopened (`'\''`).
pub fn concat_manifest(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|clip| {
            let path = clip.display().to_string().replace('\'', r"'\''");
            format!("file '{}'\n", path)
        })
        .collect()
}

pub fn concat_args(manifest: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        manifest.display().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        output.display().to_string(),
    ]
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Join `clips` in order into `output` without re-encoding.
///
/// The manifest is written next to the output and removed afterwards, even
/// when ffmpeg fails.
pub async fn concat_clips(clips: &[PathBuf], output: &Path) -> Result<PathBuf, MediaError> {
    if clips.is_empty() {
        return Err(MediaError::InvalidRange("No clips to concatenate".to_string()));
    }
    for clip in clips {
        if !clip.exists() {
            return Err(MediaError::NotFound(clip.display().to_string()));
        }
    }

    // The demuxer resolves relative entries against the manifest's directory.
    let absolute_clips = clips
        .iter()
        .map(|c| absolute(c))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let manifest = output.with_extension("concat.txt");
    tokio::fs::write(&manifest, concat_manifest(&absolute_clips)).await?;

    let result = run_tool(FFMPEG, concat_args(&manifest, output)).await;
    if let Err(e) = tokio::fs::remove_file(&manifest).await {
        log::debug!("Could not remove {}: {}", manifest.display(), e);
    }
    result?;

    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_lines_in_order() {
        let clips = vec![PathBuf::from("/v/a.mp4"), PathBuf::from("/v/b.mp4")];
        assert_eq!(concat_manifest(&clips), "file '/v/a.mp4'\nfile '/v/b.mp4'\n");
    }

    #[test]
    fn test_manifest_escapes_quotes() {
        let clips = vec![PathBuf::from("/v/it's.mp4")];
        assert_eq!(concat_manifest(&clips), "file '/v/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_concat_args_stream_copy() {
        let args = concat_args(Path::new("list.txt"), Path::new("out.mp4"));
        assert_eq!(
            args,
            vec!["-y", "-f", "concat", "-safe", "0", "-i", "list.txt", "-c", "copy", "out.mp4"]
        );
    }

    #[tokio::test]
    async fn test_concat_rejects_missing_clip() {
        let dir = tempfile::tempdir().unwrap();
        let err = concat_clips(&[dir.path().join("gone.mp4")], &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concat_rejects_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        assert!(concat_clips(&[], &dir.path().join("out.mp4")).await.is_err());
    }
}

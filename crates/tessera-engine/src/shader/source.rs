use std::path::{Path, PathBuf};

/// Marker line that starts a stage region.
const STAGE_MARKER: &str = "#shader";

#[derive(Debug, thiserror::Error)]
pub enum ShaderSourceError {
    #[error("failed to open shader source {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A shader file split into its vertex and fragment stages.
///
/// The file holds both stages; a line containing `#shader vertex` or
/// `#shader fragment` starts the region of that stage. Marker lines are
/// dropped, and so is everything before the first marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
    /// Where the text came from, if it was read from disk.
    pub path: Option<PathBuf>,
}

#[derive(Copy, Clone)]
enum Region {
    None,
    Vertex,
    Fragment,
}

impl ShaderSource {
    pub fn parse(text: &str) -> Self {
        let mut out = ShaderSource::default();
        let mut region = Region::None;

        for line in text.lines() {
            if line.contains(STAGE_MARKER) {
                region = if line.contains("vertex") {
                    Region::Vertex
                } else if line.contains("fragment") {
                    Region::Fragment
                } else {
                    log::warn!("unknown shader stage marker `{}`", line.trim());
                    Region::None
                };
                continue;
            }
            let target = match region {
                Region::None => continue,
                Region::Vertex => &mut out.vertex,
                Region::Fragment => &mut out.fragment,
            };
            target.push_str(line);
            target.push('\n');
        }
        out
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ShaderSourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ShaderSourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut parsed = Self::parse(&text);
        parsed.path = Some(path.to_path_buf());
        Ok(parsed)
    }

    /// Human-readable provenance for diagnostics.
    pub fn origin(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<inline>".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_stage_markers() {
        let src = ShaderSource::parse(
            "// preamble\n#shader vertex\nvs line\n#shader fragment\nfs 1\nfs 2\n",
        );
        assert_eq!(src.vertex, "vs line\n");
        assert_eq!(src.fragment, "fs 1\nfs 2\n");
    }

    #[test]
    fn repeated_marker_appends_to_stage() {
        let src = ShaderSource::parse("#shader vertex\na\n#shader fragment\nb\n#shader vertex\nc\n");
        assert_eq!(src.vertex, "a\nc\n");
        assert_eq!(src.fragment, "b\n");
    }

    #[test]
    fn unknown_stage_region_is_dropped() {
        let src = ShaderSource::parse("#shader geometry\nx\n#shader fragment\ny\n");
        assert!(src.vertex.is_empty());
        assert_eq!(src.fragment, "y\n");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ShaderSource::from_path("/definitely/not/here.shader").unwrap_err();
        assert!(matches!(err, ShaderSourceError::Io { .. }));
        assert!(err.to_string().contains("here.shader"));
    }
}

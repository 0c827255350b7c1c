use std::path::{Path, PathBuf};

use winit::dpi::LogicalSize;

/// Overrides the asset root when set.
pub const ASSETS_ENV: &str = "TESSERA_ASSETS";

/// Window and asset configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub assets: Assets,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tessera studio".to_string(),
            initial_size: LogicalSize::new(960.0, 720.0),
            assets: Assets::from_env(),
        }
    }
}

/// Resolves shader and texture files under one root directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Assets {
    root: PathBuf,
}

impl Assets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$TESSERA_ASSETS`, else this crate's `res/` directory.
    pub fn from_env() -> Self {
        match std::env::var_os(ASSETS_ENV) {
            Some(root) => Self::new(root),
            None => Self::bundled(),
        }
    }

    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("res"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn shader(&self, name: &str) -> PathBuf {
        self.root.join("shaders").join(name)
    }

    pub fn texture(&self, name: &str) -> PathBuf {
        self.root.join("textures").join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_assets_exist() {
        let assets = Assets::bundled();
        assert!(assets.shader("Basic.shader").is_file());
        assert!(assets.texture("ChernoLogo.png").is_file());
    }

    #[test]
    fn paths_are_grouped_by_kind() {
        let assets = Assets::new("/srv/res");
        assert_eq!(assets.shader("Batch.shader"), Path::new("/srv/res/shaders/Batch.shader"));
        assert_eq!(assets.texture("a.png"), Path::new("/srv/res/textures/a.png"));
    }
}

//! Extension de pneuconfig pour la playlist média

use std::path::PathBuf;

/// Trait d'extension pour pneuconfig::Config
pub trait MediaConfigExt {
    /// Chemin de la base SQLite de la playlist
    fn media_db_path(&self) -> anyhow::Result<PathBuf>;

    /// Répertoire des images et vidéos servies sous `/media`
    fn media_files_dir(&self) -> anyhow::Result<PathBuf>;
}

impl MediaConfigExt for pneuconfig::Config {
    fn media_db_path(&self) -> anyhow::Result<PathBuf> {
        let media_dir = self.get_managed_dir(&["media", "directory"], "media")?;
        Ok(PathBuf::from(media_dir).join("media.db"))
    }

    fn media_files_dir(&self) -> anyhow::Result<PathBuf> {
        Ok(PathBuf::from(
            self.get_managed_dir(&["media", "files"], "media/files")?,
        ))
    }
}

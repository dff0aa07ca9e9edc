//! Extension de pneuconfig pour la file d'attente

use std::path::PathBuf;

/// Trait d'extension pour pneuconfig::Config
pub trait QueueConfigExt {
    /// Chemin de la base SQLite des fiches de service
    fn queue_db_path(&self) -> anyhow::Result<PathBuf>;

    /// Capacité du bus de notification
    fn queue_bus_capacity(&self) -> usize;
}

impl QueueConfigExt for pneuconfig::Config {
    fn queue_db_path(&self) -> anyhow::Result<PathBuf> {
        // get_managed_dir crée le répertoire s'il n'existe pas
        let queue_dir = self.get_managed_dir(&["queue", "directory"], "queue")?;
        Ok(PathBuf::from(queue_dir).join("queue.db"))
    }

    fn queue_bus_capacity(&self) -> usize {
        self.get_u64_or(&["queue", "bus_capacity"], 256) as usize
    }
}

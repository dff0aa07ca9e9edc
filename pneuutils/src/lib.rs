//! Utilitaires réseau partagés par les crates PneuShop.
//!
//! - [`guess_local_ip`] : adresse IP locale annoncée par le serveur quand
//!   `host.base_url` n'est pas configuré
//! - [`list_all_ips`] : adresses IPv4 joignables, journalisées au démarrage pour
//!   aider à configurer les panneaux TV et les postes de l'accueil

mod ip_utils;

pub use ip_utils::{guess_local_ip, list_all_ips};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pneushop",
    version,
    about = "File d'attente de l'atelier : serveur, panneau TV et accueil"
)]
pub struct Cli {
    /// URL du serveur pour les commandes client (défaut : display.server_url)
    #[arg(global = true, long = "server")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Lance le serveur REST + SSE
    Serve,

    /// Lance le panneau TV (file, annonces, médias)
    Display,

    #[command(flatten)]
    Client(ClientCommand),
}

/// Commandes qui passent par l'API du serveur
#[derive(Subcommand)]
pub enum ClientCommand {
    /// Enregistre un véhicule à l'accueil
    Register {
        #[arg(help = "License plate, e.g. ABC-1D23")]
        plate: String,
        #[arg(help = "Vehicle model")]
        model: String,
        #[arg(help = "Vehicle color")]
        color: String,
        #[arg(
            short = 's',
            long = "service",
            required = true,
            help = "Requested service (repeat for several)"
        )]
        services: Vec<String>,
    },

    /// Clôture une fiche : le véhicule est annoncé sur le panneau
    Finalize {
        #[arg(help = "Service record id")]
        id: i64,
    },

    /// Affiche la file ouverte
    Queue,

    /// Rapport des fiches entrées sur une période
    History {
        #[arg(long, help = "Entered at or after (RFC 3339)")]
        from: Option<DateTime<Utc>>,
        #[arg(long, help = "Entered at or before (RFC 3339)")]
        to: Option<DateTime<Utc>>,
        #[arg(long, help = "Plate fragment")]
        plate: Option<String>,
    },
}

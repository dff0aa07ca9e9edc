mod cli;

use clap::Parser;
use cli::{Cli, ClientCommand, Command};
use pneuconfig::get_config;
use pneudisplay::DisplayConfigExt;
use pneumedia::MediaServerExt;
use pneuqueue::{
    HistoryFilter, NewServiceRecord, QueueClient, QueueServerExt, RegistrationForm,
    ServiceRecord,
};
use pneuserver::{ConfigExt, ServerBuilder};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli { server, command } = Cli::parse();

    match command {
        Command::Serve => serve().await,
        Command::Display => {
            init_console_logging();
            let mut settings = get_config().display_settings();
            if let Some(server) = server {
                settings.server_url = server;
            }
            pneudisplay::run_display(settings).await
        }
        Command::Client(command) => {
            init_console_logging();
            let server = server.unwrap_or_else(|| get_config().display_settings().server_url);
            run_client(QueueClient::new(server), command).await
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let mut server = ServerBuilder::new_configured().build();
    server.init_logging().await;

    // ========== PHASE 1 : APIs ==========
    info!("⚙️ Initializing configuration API...");
    server.init_config_api().await?;

    info!("🚗 Initializing queue API...");
    let queue = server.init_queue_api().await?;
    info!("✅ {} vehicle(s) waiting", queue.list_open()?.len());

    info!("🖼️ Initializing media playlist API...");
    let playlist = server.init_media_api().await?;
    info!("✅ {} playlist item(s)", playlist.list()?.len());

    server
        .add_route("/info", || async {
            serde_json::json!({"name": "PneuShop", "version": env!("CARGO_PKG_VERSION")})
        })
        .await;
    server.add_redirect("/", "/swagger-ui/queue").await;

    // ========== PHASE 2 : Démarrage ==========
    info!("🌐 Starting HTTP server...");
    server.start().await?;

    info!("✅ PneuShop is ready!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}

fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            get_config()
                .get_log_min_level()
                .unwrap_or_else(|_| "info".to_string())
                .to_lowercase(),
        )
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_client(client: QueueClient, command: ClientCommand) -> anyhow::Result<()> {
    match command {
        ClientCommand::Register {
            plate,
            model,
            color,
            services,
        } => {
            let form = RegistrationForm::new(client);
            let record = form
                .submit(&NewServiceRecord::new(plate, model, color, services))
                .await?;
            println!("Registered #{}", record.id);
            print_record(&record);
        }
        ClientCommand::Finalize { id } => {
            let record = client.finalize(id).await?;
            println!("Finalized #{}", record.id);
            print_record(&record);
        }
        ClientCommand::Queue => {
            let records = client.fetch_queue().await?;
            if records.is_empty() {
                println!("Queue is empty");
            }
            for record in &records {
                print_record(record);
            }
        }
        ClientCommand::History { from, to, plate } => {
            let records = client.history(&HistoryFilter { from, to, plate }).await?;
            println!("{} record(s)", records.len());
            for record in &records {
                print_record(record);
            }
        }
    }
    Ok(())
}

fn print_record(record: &ServiceRecord) {
    let exited = record
        .exited_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "#{:<5} {:<8} {:<12} {:<10} {}  in {}  out {}",
        record.id,
        record.plate,
        record.model,
        record.color,
        record.services.join(", "),
        record.entered_at.format("%Y-%m-%d %H:%M"),
        exited
    );
}

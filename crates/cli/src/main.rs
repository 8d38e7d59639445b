use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use libris_app::{app::Application, loader};
use libris_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "libris", version, about = "Libris library catalog service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Load books and authors from a zip file without unzipping
    LoadData {
        /// The path to the zip file
        zip_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load Libris settings")?;
    libris_telemetry::init(&settings.telemetry);

    match cli.command {
        Command::Serve => {
            let app = Application::bootstrap(settings).await?;
            app.serve().await
        }
        Command::Migrate => {
            Application::bootstrap(settings).await?;
            tracing::info!("migrations applied");
            Ok(())
        }
        Command::LoadData { zip_path } => {
            let app = Application::bootstrap(settings).await?;
            let summary = loader::load_data_from_zip(&app.state.db, &zip_path)
                .await
                .with_context(|| format!("failed to load '{}'", zip_path.display()))?;

            tracing::info!(
                authors_created = summary.authors_created,
                authors_reused = summary.authors_reused,
                books_created = summary.books_created,
                books_skipped = summary.books_skipped,
                "bulk load finished"
            );
            println!("Successfully loaded books and authors from the zip file");
            Ok(())
        }
    }
}

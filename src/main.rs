use anyhow::Context;
use libris_app::app::Application;
use libris_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Libris settings")?;
    libris_telemetry::init(&settings.telemetry);

    Application::bootstrap(settings).await?.serve().await
}

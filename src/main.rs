mod app;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("flowchart_editor=info")),
        )
        .init();

    tracing::info!("starting flowchart editor");

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Flowchart",
        native_options,
        Box::new(|cc| Ok(Box::new(app::FlowchartApp::new(cc)))),
    )
}

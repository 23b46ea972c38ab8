use anyhow::Result;
use nearby_flow::{Presenter, WindowManager};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    nearby_core::init()?;

    let app = nearby_core::App::load()?;
    let flow = app.did_finish_launching(WindowManager::new())?;

    tracing::info!("NearbyWeather application started");

    println!("NearbyWeather");
    println!("\nConfiguration:");
    println!("  Config directory: {}", app.config().config_dir.display());
    println!("  Bookmarks: {}", app.config().bookmarks.len());
    if let Some(screen) = flow.presenter().visible_screen() {
        println!("  Visible screen: {:?}", screen);
    }

    let outcome = app.did_become_active().await;
    println!("  Refresh: {}", outcome);

    // Graceful shutdown
    app.shutdown();

    Ok(())
}

use super::{colorize_marker, json_pretty, EXIT_SUCCESS};
use waveloader_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    engine.initialize().map_err(|e| e.to_string())?;
    let inventory = engine.inventory().map_err(|e| e.to_string())?;
    let releases = inventory.sorted_desc();

    if json {
        println!("{}", json_pretty(&releases)?);
    } else if releases.is_empty() {
        println!("no releases installed");
    } else {
        println!("{:<12} {:<8} PATH", "VERSION", "");
        for (i, release) in releases.iter().enumerate() {
            let marker = if i == 0 { colorize_marker("latest") } else { String::new() };
            println!(
                "{:<12} {:<8} {}",
                release.version.to_string(),
                marker,
                release.path.display()
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

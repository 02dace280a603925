use super::{colorize_marker, json_pretty, RemoteSettings, EXIT_STORE_ERROR, EXIT_SUCCESS};
use waveloader_core::Engine;
use waveloader_schema::VersionSet;

pub fn run(
    engine: &Engine,
    remote: &RemoteSettings,
    version: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let version = match version {
        Some(v) => VersionSet::parse(v).map_err(|e| e.to_string())?,
        None => engine
            .latest_installed()
            .map_err(|e| e.to_string())?
            .map(|r| r.version)
            .ok_or_else(|| "no release installed".to_owned())?,
    };

    let source = remote.source()?;
    let manifest = remote.require_manifest(&source)?;
    let report = engine.verify(&manifest, version).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "version": version,
            "checked": report.checked,
            "passed": report.passed,
            "failed": report.failed,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "release {version}: {}/{} files passed",
            report.passed, report.checked
        );
        for f in &report.failed {
            println!("  {} {}: {}", colorize_marker("FAIL"), f.path, f.reason);
        }
    }

    if report.is_clean() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_STORE_ERROR)
    }
}

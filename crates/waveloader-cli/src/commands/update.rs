use super::{describe_sync, json_pretty, spin_fail, spin_ok, spinner, RemoteSettings, EXIT_SUCCESS};
use waveloader_core::Engine;

pub fn run(engine: &Engine, remote: &RemoteSettings, json: bool) -> Result<u8, String> {
    let source = remote.source()?;
    let manifest = remote.require_manifest(&source)?;

    let pb = spinner("synchronizing release…");
    let report = engine.update(&manifest, &source).map_err(|e| {
        spin_fail(&pb, "update failed");
        e.to_string()
    })?;
    spin_ok(&pb, "release up to date");

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!("{}", describe_sync(&report));
    }
    Ok(EXIT_SUCCESS)
}

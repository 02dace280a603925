use super::{describe_sync, json_pretty, spin_fail, spin_ok, spinner, RemoteSettings, EXIT_SUCCESS};
use std::ffi::OsString;
use waveloader_core::Engine;
use waveloader_runtime::{launch, LaunchSpec, Platform};

pub fn run(
    engine: &Engine,
    remote: &RemoteSettings,
    args: &[String],
    json: bool,
) -> Result<u8, String> {
    let source = remote.source()?;
    let manifest = remote.manifest(&source);

    let pb = spinner("checking installed release…");
    let outcome = engine
        .ensure_latest(manifest.as_ref(), &source)
        .map_err(|e| {
            spin_fail(&pb, "update failed");
            e.to_string()
        })?;
    match &outcome.sync {
        Some(report) => spin_ok(&pb, &describe_sync(report)),
        None => spin_ok(&pb, "using installed releases"),
    }

    let Some(release) = outcome.release else {
        if json {
            println!("{}", json_pretty(&serde_json::json!({ "launched": null }))?);
        } else {
            println!("nothing to run: no release installed and no manifest available");
        }
        return Ok(EXIT_SUCCESS);
    };

    let platform = Platform::host().map_err(|e| e.to_string())?;
    let spec = LaunchSpec::for_release(platform, &release.path);
    let child_args: Vec<OsString> = args.iter().map(OsString::from).collect();
    let status = launch(&spec, &child_args).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "launched": release.version,
            "path": release.path,
            "exit_code": status.code(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(" == CHILD EXIT : {status} ==");
    }
    Ok(EXIT_SUCCESS)
}

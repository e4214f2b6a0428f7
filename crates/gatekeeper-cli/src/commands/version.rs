//! `version`: print version and build metadata.

use anyhow::Result;

/// Print version, toolchain, and target information.
pub fn run() -> Result<()> {
    println!("gatekeeper {}", env!("CARGO_PKG_VERSION"));
    println!("  os:     {}/{}", std::env::consts::OS, std::env::consts::ARCH);

    if let Some(commit) = option_env!("GATEKEEPER_BUILD_COMMIT") {
        println!("  commit: {commit}");
    }
    if let Some(built) = option_env!("GATEKEEPER_BUILD_TIME") {
        println!("  built:  {built}");
    }

    Ok(())
}

use std::path::Path;

use anyhow::Context;
use k2plan_core::RequestFile;
use k2plan_placement::Unbound;
use tracing::info;

use super::Session;
use crate::SessionArgs;

pub fn add(args: &SessionArgs, requests: &Path) -> anyhow::Result<()> {
    let mut session = Session::open(args)?;
    let file = RequestFile::from_file(requests)
        .with_context(|| format!("loading requests {}", requests.display()))?;

    let mut failed = 0usize;
    for request in file.runnables {
        let name = request.name.clone();
        let runnable = match request.into_runnable() {
            Ok(runnable) => runnable,
            Err(e) => {
                eprintln!("✗ {name}: {e}");
                failed += 1;
                continue;
            }
        };

        match session.placer.bind(&mut session.table, runnable) {
            Ok(binding) => {
                println!("✓ {name} → {} (slot {})", binding.host, binding.slot);
                for placeholder in binding.report.deferred() {
                    println!("  deferred: {placeholder}");
                }
                println!("  {}", binding.invocation);
            }
            Err(e) => {
                eprintln!("✗ {e}");
                failed += 1;
            }
        }
    }

    session.save()?;
    info!(bound = session.table.bound().count(), failed, "session saved");

    if failed > 0 {
        anyhow::bail!("{failed} request(s) could not be placed");
    }
    Ok(())
}

pub fn remove(args: &SessionArgs, name: &str) -> anyhow::Result<()> {
    let mut session = Session::open(args)?;

    match session.placer.unbind(&mut session.table, name) {
        Unbound::Removed { slot, runnable } => {
            println!(
                "✓ Removed {} from {}",
                runnable.name(),
                session.table.slots()[slot].host.dns
            );
        }
        Unbound::NotFound => println!("{name} is not bound"),
    }

    session.save()
}

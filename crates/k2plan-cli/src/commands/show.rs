use super::Session;
use crate::SessionArgs;

pub fn show(args: &SessionArgs, format: &str) -> anyhow::Result<()> {
    let session = Session::open(args)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&session.table)?);
        }
        _ => {
            print!("{}", session.table.summary());
            for runnable in session.table.bound() {
                if let Some(invocation) = runnable.invocation() {
                    println!("\n{}:\n  {invocation}", runnable.name());
                }
            }
        }
    }

    Ok(())
}

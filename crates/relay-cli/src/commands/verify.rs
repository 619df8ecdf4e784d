use std::time::Duration;

use anyhow::Context;
use webhook_signing::verify_header;

use super::VerifyArgs;

pub fn run(args: VerifyArgs) -> anyhow::Result<()> {
    let payload = read_payload(&args)?;
    let tolerance = args.tolerance_secs.map(Duration::from_secs);
    let now = chrono::Utc::now().timestamp();

    verify_header(&args.secret, &args.signature, &payload, tolerance, now)?;
    println!("Signature is valid");
    Ok(())
}

fn read_payload(args: &VerifyArgs) -> anyhow::Result<Vec<u8>> {
    match (&args.payload, &args.payload_file) {
        (Some(payload), _) => Ok(payload.clone().into_bytes()),
        (None, Some(path)) => std::fs::read(path)
            .with_context(|| format!("failed to read payload from {}", path.display())),
        (None, None) => anyhow::bail!("pass --payload or --payload-file"),
    }
}

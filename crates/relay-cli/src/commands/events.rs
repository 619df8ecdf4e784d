use event_relay::sample_event;

use super::EventsCommand;

pub fn run(command: EventsCommand) -> anyhow::Result<()> {
    match command {
        EventsCommand::Sample { kind } => {
            let event = sample_event(&kind)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }
    Ok(())
}

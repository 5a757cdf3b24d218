use anyhow::Result;
use clap::Subcommand;

use super::{output::swatch, App};

#[derive(Debug, Subcommand)]
pub enum SectionCommand {
    #[command(about = "Create a section")]
    Add {
        name: String,
        #[arg(short, long, help = "Colour in #RRGGBB form. Defaults to #FFD75A")]
        color: Option<String>,
    },
    #[command(about = "List local and remote sections")]
    List,
}

pub async fn process_section_command(app: &App, command: SectionCommand) -> Result<()> {
    match command {
        SectionCommand::Add { name, color } => {
            let (section, outcome) = app
                .journal
                .create_section(app.remote(), &name, color.as_deref())
                .await?;
            println!("{} ({})", outcome.describe("Section"), section.id);
        }
        SectionCommand::List => {
            let sections = app.journal.load_sections(app.remote()).await?;
            if sections.is_empty() {
                println!("No sections yet");
            }
            for section in &sections {
                println!(
                    "{} {}\t{}",
                    swatch(section.color.as_deref()),
                    section.name,
                    section.id
                );
            }
        }
    }
    Ok(())
}

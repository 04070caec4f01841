//! `--list-generators` implementation.

use crate::bundler::platform::{DEFAULT_GENERATOR, GENERATORS};
use crate::cli::RuntimeConfig;
use crate::error::Result;

pub(super) fn execute_list(config: &RuntimeConfig) -> Result<()> {
    if config.is_json() {
        let generators: Vec<_> = GENERATORS
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "name": entry.name,
                    "aliases": entry.aliases,
                    "extension": entry.create().output_extension(),
                    "description": entry.description,
                    "default": entry.name == DEFAULT_GENERATOR,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&generators)?);
        return Ok(());
    }

    config.println("Available generators:");
    for entry in GENERATORS {
        let default = if entry.name == DEFAULT_GENERATOR {
            " (default)"
        } else {
            ""
        };
        config.indent(&format!("{}{} - {}", entry.name, default, entry.description));
        if !entry.aliases.is_empty() {
            config.indent(&format!("  aliases: {}", entry.aliases.join(", ")));
        }
    }
    Ok(())
}

//! Config Commands
//!
//! Reading and updating the stored settings file.

use super::ConfigCommands;
use crate::models::settings::SettingsUpdate;
use crate::storage::config::ConfigService;
use crate::utils::error::AppResult;

pub fn handle(action: &ConfigCommands, service: &mut ConfigService) -> AppResult<()> {
    match action {
        ConfigCommands::Show => {
            println!("# {}", service.path().display());
            println!("{}", serde_json::to_string_pretty(service.get_config())?);
        }
        ConfigCommands::Set {
            mode,
            cloud_model,
            local_model,
            output_dir,
        } => {
            let update = SettingsUpdate {
                llm_mode: *mode,
                cloud_model: cloud_model.clone(),
                local_model: local_model.clone(),
                output_dir: output_dir.clone(),
                ..Default::default()
            };
            let config = service.update_config(update)?;
            println!("Saved {}", service.path().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

use crate::error::Result;
use crate::settings::{load_settings, save_settings};

pub fn set_enabled(enabled: bool) -> Result<()> {
    let mut settings = load_settings();
    settings.ai_enabled = enabled;
    save_settings(&settings)?;
    if enabled {
        println!("Voice entry enabled. The API key is read from ${}.", settings.model.api_key_env);
    } else {
        println!("Voice entry disabled.");
    }
    Ok(())
}

use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, settings_path, Settings};

pub fn run(init: bool) -> Result<()> {
    let path = settings_path();
    if init {
        if settings_file_exists() {
            println!("Settings already exist at {}", path.display());
        } else {
            save_settings(&Settings::default())?;
            println!("Wrote default settings to {}", path.display());
        }
    }

    let settings = load_settings();
    println!(
        "Settings:   {}{}",
        path.display(),
        if settings_file_exists() { "" } else { " (not found, using defaults)" }
    );
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

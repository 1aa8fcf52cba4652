use crate::config::generate::generate_starter_config;
use crate::config::user_config_path;
use std::fs;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    let config_path = target_path()?;
    if config_path.exists() {
        return Err(format!(
            "config already exists at {}, remove it first or use --stdout",
            config_path.display()
        )
        .into());
    }

    fs::write(&config_path, config_content)
        .map_err(|e| format!("Failed to write {}: {}", config_path.display(), e))?;
    println!("Wrote starter config to {}", config_path.display());
    Ok(())
}

/// ~/.config/logfunnel/config.yml, falling back to /etc/logfunnel/config.yml
fn target_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(user_config) = user_config_path() {
        if let Some(parent) = user_config.parent() {
            match fs::create_dir_all(parent) {
                Ok(()) => return Ok(user_config),
                Err(_) => {
                    eprintln!("Warning: Could not create directory {}", parent.display());
                    eprintln!("Falling back to /etc/logfunnel/config.yml");
                }
            }
        }
    }

    let system_config = PathBuf::from("/etc/logfunnel/config.yml");
    if let Some(parent) = system_config.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    Ok(system_config)
}

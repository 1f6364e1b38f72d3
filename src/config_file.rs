use std::{
    env, fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

const IMGCTL_CONFIG_DIR: &str = "IMGCTL_CONFIG_DIR";
const XDG_CONFIG_HOME: &str = "XDG_CONFIG_HOME";
const APP_DATA: &str = "AppData";

// Config path precedence
// 1. IMGCTL_CONFIG_DIR
// 2. XDG_CONFIG_HOME
// 3. AppData (windows only)
// 4. HOME
pub fn config_dir() -> Result<String> {
    let path: PathBuf;

    let imgctl_config_dir = get_env_var(IMGCTL_CONFIG_DIR);
    let xdg_config_home = get_env_var(XDG_CONFIG_HOME);
    let app_data = get_env_var(APP_DATA);

    if !imgctl_config_dir.is_empty() {
        path = Path::new(&imgctl_config_dir).to_path_buf();
    } else if !xdg_config_home.is_empty() {
        path = Path::new(&xdg_config_home).join("imgctl");
    } else if !app_data.is_empty() && std::env::consts::OS == "windows" {
        path = Path::new(&app_data).join("imgctl");
    } else {
        match dirs::home_dir() {
            Some(home) => {
                path = home.join(".config").join("imgctl");
            }
            None => {
                return Err(anyhow!("could not find home directory"));
            }
        }
    }

    // Convert the path into a string slice
    match path.to_str() {
        None => Err(anyhow!("path is not a valid UTF-8 sequence")),
        Some(s) => Ok(s.to_string()),
    }
}

pub fn config_file() -> Result<String> {
    let config_dir = config_dir()?;
    let path = Path::new(&config_dir).join("config.toml");

    // Convert the path into a string slice
    match path.to_str() {
        None => Err(anyhow!("path is not a valid UTF-8 sequence")),
        Some(s) => Ok(s.to_string()),
    }
}

pub fn parse_default_config() -> Result<crate::config_from_file::FileConfig> {
    let config_file_path = config_file()?;

    // A missing config file means every option keeps its default.
    let path = Path::new(&config_file_path);
    let root = if !path.exists() {
        crate::config::new_blank_root()?
    } else {
        let contents = read_config_file(&config_file_path)?;
        contents
            .parse::<toml_edit::Document>()
            .with_context(|| format!("failed to parse {}", config_file_path))?
    };

    Ok(crate::config::new_config(root))
}

fn read_config_file(filename: &str) -> Result<String> {
    fs::read_to_string(filename).with_context(|| format!("failed to read from {}", filename))
}

pub fn write_config_file(filename: &str, data: &str) -> Result<()> {
    let path = Path::new(filename);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let mut file = fs::File::create(filename)?;
    file.write_all(data.as_bytes())
        .with_context(|| format!("failed to write to {}", filename))
}

pub fn get_env_var(key: &str) -> String {
    match env::var(key) {
        Ok(val) => val,
        Err(_) => "".to_string(),
    }
}

use anyhow::Result;

use crate::config_file::get_env_var;

const IMAGE_SERVICE_ENDPOINT: &str = "IMAGE_SERVICE_ENDPOINT";
const IMGCTL_TIMEOUT: &str = "IMGCTL_TIMEOUT";

// EnvConfig layers environment variable overrides on top of another config.
pub struct EnvConfig<'a> {
    pub config: &'a mut (dyn crate::config::Config + 'a),
}

impl EnvConfig<'_> {
    pub fn inherit_env(config: &mut dyn crate::config::Config) -> EnvConfig {
        EnvConfig { config }
    }
}

fn env_var_for(key: &str) -> Option<&'static str> {
    match key {
        "image-endpoint" => Some(IMAGE_SERVICE_ENDPOINT),
        "timeout" => Some(IMGCTL_TIMEOUT),
        _ => None,
    }
}

impl crate::config::Config for EnvConfig<'_> {
    fn get(&self, key: &str) -> Result<String> {
        let (val, _) = self.get_with_source(key)?;
        Ok(val)
    }

    fn get_with_source(&self, key: &str) -> Result<(String, String)> {
        if let Some(env) = env_var_for(key) {
            let value = get_env_var(env);
            if !value.is_empty() {
                return Ok((value, env.to_string()));
            }
        }

        self.config.get_with_source(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.config.set(key, value)
    }

    fn write(&self) -> Result<()> {
        self.config.write()
    }

    fn config_to_string(&self) -> Result<String> {
        self.config.config_to_string()
    }
}

use anyhow::Result;

// This type implements a Config interface and represents a config file on disk.
#[derive(Debug, Clone)]
pub struct FileConfig {
    pub map: crate::config_map::ConfigMap,
}

impl crate::config::Config for FileConfig {
    fn get(&self, key: &str) -> Result<String> {
        let (val, _) = self.get_with_source(key)?;
        Ok(val)
    }

    fn get_with_source(&self, key: &str) -> Result<(String, String)> {
        crate::config::validate_key(key)?;

        if !self.map.contains_key(key) {
            return Ok((crate::config::default_value(key)?, "default".to_string()));
        }

        let value = self.map.get_string_value(key)?;
        let source = crate::config_file::config_file()?;

        Ok((value, source))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.map.set_string_value(key, value)
    }

    fn write(&self) -> Result<()> {
        // Get the config file name.
        let config_filename = crate::config_file::config_file()?;

        // Get the string representation of the config file.
        let content = self.config_to_string()?;

        // Write the config file.
        crate::config_file::write_config_file(&config_filename, &content)
    }

    fn config_to_string(&self) -> Result<String> {
        let doc: toml_edit::Document = self.map.root.clone().into();

        Ok(doc.to_string().trim().to_string())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::config::Config;

    #[test]
    fn test_set_keeps_comments() {
        let doc = "# where containerd listens\nimage-endpoint = \"unix:///run/containerd/containerd.sock\"\n"
            .parse::<toml_edit::Document>()
            .unwrap();
        let mut config = crate::config::new_config(doc);

        config.set("timeout", "30").unwrap();

        assert_eq!(config.get("timeout").unwrap(), "30");

        let content = config.config_to_string().unwrap();
        assert!(content.starts_with("# where containerd listens\n"), "content {}", content);
        assert!(content.contains("timeout = \"30\""), "content {}", content);
    }

    #[test]
    #[serial_test::serial]
    fn test_get_with_source() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("IMGCTL_CONFIG_DIR", dir.path());

        let mut config = crate::config::new_blank_config().unwrap();
        assert_eq!(
            config.get_with_source("timeout").unwrap(),
            ("10".to_string(), "default".to_string())
        );

        config.set("timeout", "3").unwrap();
        let (value, source) = config.get_with_source("timeout").unwrap();
        assert_eq!(value, "3");
        assert!(source.ends_with("config.toml"), "source {}", source);

        std::env::remove_var("IMGCTL_CONFIG_DIR");
    }
}

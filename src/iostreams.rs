use std::io::Write;

use anyhow::Result;

pub struct IoStreams {
    pub out: Box<dyn std::io::Write + Send + Sync>,
    pub err_out: Box<dyn std::io::Write + Send + Sync>,

    color_enabled: bool,
}

impl IoStreams {
    pub fn color_enabled(&self) -> bool {
        self.color_enabled
    }

    #[cfg(test)]
    pub fn set_color_enabled(&mut self, color_enabled: bool) {
        self.color_enabled = color_enabled;
    }

    pub fn write_json(&mut self, json: &serde_json::Value) -> Result<()> {
        if self.color_enabled() {
            writeln!(self.out, "{}", colored_json::to_colored_json_auto(json)?)?;
        } else {
            writeln!(self.out, "{}", serde_json::to_string_pretty(json)?)?;
        }

        Ok(())
    }

    pub fn write_yaml(&mut self, yaml: &serde_json::Value) -> Result<()> {
        write!(self.out, "{}", serde_yaml::to_string(yaml)?)?;

        Ok(())
    }

    pub fn system() -> Self {
        let stdout_is_tty = atty::is(atty::Stream::Stdout);

        if stdout_is_tty {
            // Note for Windows 10 users: On Windows 10, the application must enable ANSI support
            // first.
            #[cfg(windows)]
            let _ = ansi_term::enable_ansi_support();
        }

        IoStreams {
            out: Box::new(std::io::stdout()),
            err_out: Box::new(std::io::stderr()),
            color_enabled: crate::colors::env_color_forced()
                || (!crate::colors::env_color_disabled() && stdout_is_tty),
        }
    }

    #[cfg(test)]
    pub fn test() -> (Self, String, String) {
        let mut io = IoStreams::system();

        let (stdout, stdout_path) = tempfile::NamedTempFile::new().unwrap().keep().unwrap();
        let (stderr, stderr_path) = tempfile::NamedTempFile::new().unwrap().keep().unwrap();

        io.out = Box::new(stdout);
        io.err_out = Box::new(stderr);

        io.set_color_enabled(false);

        (
            io,
            stdout_path.into_os_string().into_string().unwrap(),
            stderr_path.into_os_string().into_string().unwrap(),
        )
    }
}

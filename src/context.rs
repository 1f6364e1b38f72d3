use std::time::Duration;

use anyhow::{anyhow, bail, Context as _, Result};

use crate::{config::Config, image_service::ImageService};

pub struct Context<'a> {
    pub config: &'a mut (dyn Config + 'a),
    pub io: crate::iostreams::IoStreams,
    pub logger: slog::Logger,

    /// Overrides the configured image-endpoint.
    pub image_endpoint: Option<String>,
    /// Overrides the configured timeout, in seconds.
    pub timeout: Option<u64>,

    /// Connected on first use, see `image_service`.
    pub image_service: Option<Box<dyn ImageService>>,
}

impl Context<'_> {
    pub fn new(config: &mut dyn Config) -> Context {
        Context {
            config,
            io: crate::iostreams::IoStreams::system(),
            logger: crate::logging::new_logger(false),
            image_endpoint: None,
            timeout: None,
            image_service: None,
        }
    }

    /// Returns the image service client, connecting to it if this is the
    /// first call.
    pub async fn image_service(&mut self) -> Result<&mut Box<dyn ImageService>> {
        if self.image_service.is_none() {
            let endpoint = self.endpoint()?;
            let timeout = self.timeout()?;

            let service =
                crate::image_service::RemoteImageService::connect(&endpoint, timeout, self.logger.clone()).await?;
            self.image_service = Some(Box::new(service));
        }

        self.image_service
            .as_mut()
            .ok_or_else(|| anyhow!("image service is not connected"))
    }

    fn endpoint(&self) -> Result<String> {
        match &self.image_endpoint {
            Some(endpoint) => Ok(endpoint.to_string()),
            None => self.config.get("image-endpoint"),
        }
    }

    fn timeout(&self) -> Result<Duration> {
        let seconds = match self.timeout {
            Some(seconds) => seconds,
            None => {
                let (value, source) = self.config.get_with_source("timeout")?;
                value
                    .parse::<u64>()
                    .with_context(|| format!("invalid timeout {:?} from {}", value, source))?
            }
        };

        if seconds == 0 {
            bail!("timeout must be a positive number of seconds");
        }

        Ok(Duration::from_secs(seconds))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn test_context(config: &mut dyn Config) -> Context {
        let (io, _, _) = crate::iostreams::IoStreams::test();
        Context {
            config,
            io,
            logger: crate::logging::discard(),
            image_endpoint: None,
            timeout: None,
            image_service: None,
        }
    }

    #[test]
    fn test_connection_settings() {
        let mut config = crate::config::new_blank_config().unwrap();
        let mut ctx = test_context(&mut config);

        assert_eq!(ctx.endpoint().unwrap(), crate::config::DEFAULT_IMAGE_ENDPOINT);
        assert_eq!(ctx.timeout().unwrap(), Duration::from_secs(10));

        ctx.image_endpoint = Some("tcp://localhost:3735".to_string());
        ctx.timeout = Some(2);
        assert_eq!(ctx.endpoint().unwrap(), "tcp://localhost:3735");
        assert_eq!(ctx.timeout().unwrap(), Duration::from_secs(2));

        ctx.timeout = Some(0);
        assert!(ctx.timeout().is_err());
    }

    #[test]
    fn test_bad_timeout_in_config() {
        let mut config = crate::config::new_blank_config().unwrap();
        config.set("timeout", "soon").unwrap();
        let ctx = test_context(&mut config);

        let err = ctx.timeout().unwrap_err();
        assert!(err.to_string().contains("invalid timeout \"soon\""), "got {}", err);
    }

    #[tokio::test]
    async fn test_unsupported_endpoint_fails_before_dialing() {
        let mut config = crate::config::new_blank_config().unwrap();
        let mut ctx = test_context(&mut config);
        ctx.image_endpoint = Some("ftp://example.com".to_string());

        let err = ctx.image_service().await.err().unwrap();
        assert_eq!(err.to_string(), "protocol \"ftp\" not supported");
    }
}

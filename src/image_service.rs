use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};

use crate::proto::{
    AuthConfig, ImageFilter, ImageServiceClient, ImageSpec, ImageStatusRequest, ImageStatusResponse, ListImagesRequest,
    ListImagesResponse, PullImageRequest, PullImageResponse, RemoveImageRequest, RemoveImageResponse,
};

/// Errors about images and the arguments that name them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("credentials can't be empty")]
    EmptyCredentials,
    #[error("username can't be empty")]
    EmptyUsername,
    #[error("image ID cannot be empty")]
    EmptyImageId,
    #[error("no such image {0:?} present")]
    NoSuchImage(String),
}

/// This trait describes the remote image service.
///
/// Every method is a single request/response round trip. Implementations do
/// not retry.
#[async_trait::async_trait]
pub trait ImageService: Send {
    async fn pull_image(&mut self, request: PullImageRequest) -> Result<PullImageResponse>;
    async fn list_images(&mut self, request: ListImagesRequest) -> Result<ListImagesResponse>;
    async fn image_status(&mut self, request: ImageStatusRequest) -> Result<ImageStatusResponse>;
    async fn remove_image(&mut self, request: RemoveImageRequest) -> Result<RemoveImageResponse>;
}

/// Where the image service listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAddress {
    Unix(PathBuf),
    Tcp(String),
}

pub fn parse_endpoint(endpoint: &str) -> Result<ServiceAddress> {
    let url = url::Url::parse(endpoint).with_context(|| format!("invalid image endpoint {:?}", endpoint))?;

    match url.scheme() {
        "unix" => {
            if url.path().is_empty() {
                bail!("image endpoint {:?} is missing a socket path", endpoint);
            }

            Ok(ServiceAddress::Unix(PathBuf::from(url.path())))
        }
        "tcp" | "http" => {
            let host = url
                .host_str()
                .filter(|h| !h.is_empty())
                .ok_or_else(|| anyhow!("image endpoint {:?} is missing a host", endpoint))?;
            let port = url
                .port_or_known_default()
                .ok_or_else(|| anyhow!("image endpoint {:?} is missing a port", endpoint))?;

            Ok(ServiceAddress::Tcp(format!("http://{}:{}", host, port)))
        }
        scheme => Err(anyhow!("protocol {:?} not supported", scheme)),
    }
}

/// An image service reached over gRPC.
pub struct RemoteImageService {
    client: ImageServiceClient,
    logger: slog::Logger,
}

impl RemoteImageService {
    /// Dial the image service at `endpoint`.
    ///
    /// `timeout` bounds both the connection attempt and every request made
    /// on the resulting channel.
    pub async fn connect(endpoint: &str, timeout: Duration, logger: slog::Logger) -> Result<Self> {
        let address = parse_endpoint(endpoint)?;
        slog::debug!(logger, "connecting to image service"; "endpoint" => endpoint, "timeout" => ?timeout);

        let channel = match address {
            ServiceAddress::Unix(path) => connect_unix(path, timeout).await,
            ServiceAddress::Tcp(uri) => connect_tcp(uri, timeout).await,
        }
        .with_context(|| format!("connecting to image service at {} failed", endpoint))?;

        Ok(RemoteImageService {
            client: ImageServiceClient::new(channel),
            logger,
        })
    }
}

async fn connect_tcp(uri: String, timeout: Duration) -> Result<Channel> {
    let channel = Endpoint::from_shared(uri)?
        .connect_timeout(timeout)
        .timeout(timeout)
        .connect()
        .await?;

    Ok(channel)
}

#[cfg(unix)]
async fn connect_unix(path: PathBuf, timeout: Duration) -> Result<Channel> {
    // The authority is never dialed, the connector opens the socket instead.
    let channel = Endpoint::from_static("http://[::]:50051")
        .connect_timeout(timeout)
        .timeout(timeout)
        .connect_with_connector(tower::service_fn(move |_: tonic::transport::Uri| {
            let path = path.clone();
            async move {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok::<_, std::io::Error>(hyper_util::rt::TokioIo::new(stream))
            }
        }))
        .await?;

    Ok(channel)
}

#[cfg(not(unix))]
async fn connect_unix(_path: PathBuf, _timeout: Duration) -> Result<Channel> {
    Err(anyhow!("unix socket endpoints are not supported on this platform"))
}

#[async_trait::async_trait]
impl ImageService for RemoteImageService {
    async fn pull_image(&mut self, request: PullImageRequest) -> Result<PullImageResponse> {
        // Never log the credentials.
        slog::debug!(self.logger, "PullImageRequest";
            "image" => ?request.image, "auth" => request.auth.is_some());
        let response = self.client.pull_image(request).await?;
        slog::debug!(self.logger, "PullImageResponse"; "response" => ?response);
        Ok(response)
    }

    async fn list_images(&mut self, request: ListImagesRequest) -> Result<ListImagesResponse> {
        slog::debug!(self.logger, "ListImagesRequest"; "request" => ?request);
        let response = self.client.list_images(request).await?;
        slog::debug!(self.logger, "ListImagesResponse"; "response" => ?response);
        Ok(response)
    }

    async fn image_status(&mut self, request: ImageStatusRequest) -> Result<ImageStatusResponse> {
        slog::debug!(self.logger, "ImageStatusRequest"; "request" => ?request);
        let response = self.client.image_status(request).await?;
        slog::debug!(self.logger, "ImageStatusResponse"; "response" => ?response);
        Ok(response)
    }

    async fn remove_image(&mut self, request: RemoveImageRequest) -> Result<RemoveImageResponse> {
        slog::debug!(self.logger, "RemoveImageRequest"; "request" => ?request);
        let response = self.client.remove_image(request).await?;
        slog::debug!(self.logger, "RemoveImageResponse"; "response" => ?response);
        Ok(response)
    }
}

fn image_spec(image: &str) -> Option<ImageSpec> {
    Some(ImageSpec {
        image: image.to_string(),
        annotations: Default::default(),
    })
}

pub fn pull_image_request(image: &str, auth: Option<AuthConfig>) -> PullImageRequest {
    PullImageRequest {
        image: image_spec(image),
        auth,
    }
}

/// An empty `filter` lists every image.
pub fn list_images_request(filter: &str) -> ListImagesRequest {
    ListImagesRequest {
        filter: Some(ImageFilter {
            image: image_spec(filter),
        }),
    }
}

pub fn image_status_request(image: &str, verbose: bool) -> ImageStatusRequest {
    ImageStatusRequest {
        image: image_spec(image),
        verbose,
    }
}

pub fn remove_image_request(image: &str) -> Result<RemoveImageRequest, ImageError> {
    if image.is_empty() {
        return Err(ImageError::EmptyImageId);
    }

    Ok(RemoveImageRequest {
        image: image_spec(image),
    })
}

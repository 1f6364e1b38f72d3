//! Messages and client for the `runtime.v1.ImageService` gRPC API.
//!
//! These mirror the subset of the CRI protobuf definitions that imgctl speaks.
//! Field tags must stay in sync with the upstream `api.proto`.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tonic::{codegen::http, transport::Channel};

const PULL_IMAGE: &str = "/runtime.v1.ImageService/PullImage";
const LIST_IMAGES: &str = "/runtime.v1.ImageService/ListImages";
const IMAGE_STATUS: &str = "/runtime.v1.ImageService/ImageStatus";
const REMOVE_IMAGE: &str = "/runtime.v1.ImageService/RemoveImage";

/// An image reference, optionally annotated.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    #[prost(string, tag = "1")]
    pub image: String,
    #[prost(map = "string, string", tag = "2")]
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
}

/// Credentials handed to the image service for a registry pull.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
    #[prost(string, tag = "3")]
    pub auth: String,
    #[prost(string, tag = "4")]
    pub server_address: String,
    #[prost(string, tag = "5")]
    pub identity_token: String,
    #[prost(string, tag = "6")]
    pub registry_token: String,
}

/// Wrapper for an optional int64, as in `google.protobuf.Int64Value`.
#[derive(Clone, Copy, PartialEq, Serialize, prost::Message)]
pub struct Int64Value {
    #[prost(int64, tag = "1")]
    pub value: i64,
}

/// A single image known to the image service.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, repeated, tag = "2")]
    pub repo_tags: Vec<String>,
    #[prost(string, repeated, tag = "3")]
    pub repo_digests: Vec<String>,
    #[prost(uint64, tag = "4")]
    pub size: u64,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<Int64Value>,
    #[prost(string, tag = "6")]
    pub username: String,
    #[prost(bool, tag = "8")]
    pub pinned: bool,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct PullImageRequest {
    #[prost(message, optional, tag = "1")]
    pub image: Option<ImageSpec>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip)]
    pub auth: Option<AuthConfig>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct PullImageResponse {
    #[prost(string, tag = "1")]
    pub image_ref: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct ImageFilter {
    #[prost(message, optional, tag = "1")]
    pub image: Option<ImageSpec>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct ListImagesRequest {
    #[prost(message, optional, tag = "1")]
    pub filter: Option<ImageFilter>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct ListImagesResponse {
    #[prost(message, repeated, tag = "1")]
    pub images: Vec<Image>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct ImageStatusRequest {
    #[prost(message, optional, tag = "1")]
    pub image: Option<ImageSpec>,
    #[prost(bool, tag = "2")]
    pub verbose: bool,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct ImageStatusResponse {
    #[prost(message, optional, tag = "1")]
    pub image: Option<Image>,
    /// Free-form, runtime specific details; only filled in verbose mode.
    #[prost(btree_map = "string, string", tag = "2")]
    pub info: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct RemoveImageRequest {
    #[prost(message, optional, tag = "1")]
    pub image: Option<ImageSpec>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct RemoveImageResponse {}

/// A unary client for `runtime.v1.ImageService`.
#[derive(Debug, Clone)]
pub struct ImageServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl ImageServiceClient {
    pub fn new(channel: Channel) -> Self {
        ImageServiceClient {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn pull_image(&mut self, request: PullImageRequest) -> Result<PullImageResponse, tonic::Status> {
        self.unary(request, PULL_IMAGE).await
    }

    pub async fn list_images(&mut self, request: ListImagesRequest) -> Result<ListImagesResponse, tonic::Status> {
        self.unary(request, LIST_IMAGES).await
    }

    pub async fn image_status(&mut self, request: ImageStatusRequest) -> Result<ImageStatusResponse, tonic::Status> {
        self.unary(request, IMAGE_STATUS).await
    }

    pub async fn remove_image(&mut self, request: RemoveImageRequest) -> Result<RemoveImageResponse, tonic::Status> {
        self.unary(request, REMOVE_IMAGE).await
    }

    async fn unary<Req, Resp>(&mut self, request: Req, path: &'static str) -> Result<Resp, tonic::Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("service was not ready: {}", e)))?;

        let codec = tonic::codec::ProstCodec::<Req, Resp>::default();
        let path = http::uri::PathAndQuery::from_static(path);
        let response = self.inner.unary(tonic::Request::new(request), path, codec).await?;

        Ok(response.into_inner())
    }
}

use std::{cmp::Ordering, collections::BTreeMap, io::Write};

use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    image_service::{image_status_request, list_images_request, pull_image_request, remove_image_request, ImageError},
    proto::{AuthConfig, Image},
    types::FormatOutput,
};

const TRUNCATED_ID_LEN: usize = 12;
const NONE: &str = "<none>";

/// Pull an image from a registry.
///
/// The image service does the pull and stores the result, imgctl only waits
/// for it to finish.
///
///     $ imgctl pull busybox:latest
///     $ imgctl pull --creds me:hunter2 registry.example.com/private/app@sha256:...
#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct CmdImagePull {
    /// The image to pull.
    #[clap(name = "image", value_name = "NAME[:TAG|@DIGEST]")]
    pub image: Option<String>,

    /// Use `USERNAME[:PASSWORD]` for accessing the registry.
    #[clap(long, value_name = "USERNAME[:PASSWORD]")]
    pub creds: Option<String>,
}

#[async_trait::async_trait]
impl crate::cmd::Command for CmdImagePull {
    async fn run(&self, ctx: &mut crate::context::Context) -> Result<()> {
        let image = match self.image.as_deref() {
            Some(image) if !image.is_empty() => image,
            _ => return crate::cmd::show_subcommand_help(ctx, "pull"),
        };

        // Bad credentials fail before anything is dialed.
        let auth = self.creds.as_deref().map(get_auth).transpose()?;

        let response = ctx
            .image_service()
            .await?
            .pull_image(pull_image_request(image, auth))
            .await
            .context("pulling image failed")?;

        writeln!(ctx.io.out, "Image is up to date for {}", response.image_ref)?;

        Ok(())
    }
}

/// List images.
///
/// Images are sorted by their first tag, then by their first digest, then by
/// their ID.
#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct CmdImageList {
    /// Only list images matching this reference.
    #[clap(name = "repository", value_name = "REPOSITORY[:TAG]")]
    pub repository: Option<String>,

    /// Show verbose info for images.
    #[clap(short, long)]
    pub verbose: bool,

    /// Only show image IDs.
    #[clap(short, long)]
    pub quiet: bool,

    /// Output format. Overrides --quiet and --verbose.
    #[clap(short, long, possible_values = FormatOutput::VARIANTS)]
    pub output: Option<FormatOutput>,

    /// Show digests.
    #[clap(long)]
    pub digests: bool,

    /// Show image IDs without truncating them.
    #[clap(long)]
    pub no_trunc: bool,
}

#[async_trait::async_trait]
impl crate::cmd::Command for CmdImageList {
    async fn run(&self, ctx: &mut crate::context::Context) -> Result<()> {
        let filter = self.repository.as_deref().unwrap_or_default();

        let mut response = ctx
            .image_service()
            .await?
            .list_images(list_images_request(filter))
            .await
            .context("listing images failed")?;

        sort_images(&mut response.images);

        match self.output.unwrap_or_default() {
            FormatOutput::Json => return ctx.io.write_json(&serde_json::to_value(&response)?),
            FormatOutput::Yaml => return ctx.io.write_yaml(&serde_json::to_value(&response)?),
            FormatOutput::Table => (),
        }

        if self.quiet {
            for image in &response.images {
                writeln!(ctx.io.out, "{}", image.id)?;
            }
            return Ok(());
        }

        if self.verbose {
            for image in &response.images {
                write_verbose_image(&mut ctx.io.out, image)?;
            }
            return Ok(());
        }

        let table = image_table(&response.images, self.digests, self.no_trunc)?;
        write!(ctx.io.out, "{}", table)?;

        Ok(())
    }
}

/// Return the status of one or more images.
#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct CmdImageStatus {
    /// The IDs or references of the images to inspect.
    #[clap(name = "image", value_name = "IMAGEID")]
    pub images: Vec<String>,

    /// Output format.
    #[clap(short, long, default_value = "json", possible_values = FormatOutput::VARIANTS)]
    pub output: FormatOutput,

    /// Do not show verbose information.
    #[clap(short, long)]
    pub quiet: bool,
}

#[async_trait::async_trait]
impl crate::cmd::Command for CmdImageStatus {
    async fn run(&self, ctx: &mut crate::context::Context) -> Result<()> {
        if self.images.is_empty() {
            return crate::cmd::show_subcommand_help(ctx, "inspecti");
        }

        let verbose = !self.quiet;

        for id in &self.images {
            let response = ctx
                .image_service()
                .await?
                .image_status(image_status_request(id, verbose))
                .await
                .with_context(|| format!("image status for {:?} request failed", id))?;

            let image = response
                .image
                .as_ref()
                .ok_or_else(|| ImageError::NoSuchImage(id.to_string()))?;

            match self.output {
                FormatOutput::Json => ctx.io.write_json(&crate::format::status_with_info(image, &response.info)?)?,
                FormatOutput::Yaml => ctx.io.write_yaml(&crate::format::status_with_info(image, &response.info)?)?,
                FormatOutput::Table => {
                    let info = if verbose { Some(&response.info) } else { None };
                    write_image_status(&mut ctx.io.out, image, info)?;
                }
            }
        }

        Ok(())
    }
}

/// Remove one or more images.
#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct CmdImageRemove {
    /// The IDs or references of the images to remove.
    #[clap(name = "image", value_name = "IMAGEID")]
    pub images: Vec<String>,
}

#[async_trait::async_trait]
impl crate::cmd::Command for CmdImageRemove {
    async fn run(&self, ctx: &mut crate::context::Context) -> Result<()> {
        if self.images.is_empty() {
            return crate::cmd::show_subcommand_help(ctx, "rmi");
        }

        for id in &self.images {
            // The tags are gone once the image is, so look them up first.
            let status = ctx
                .image_service()
                .await?
                .image_status(image_status_request(id, false))
                .await
                .with_context(|| format!("image status request for {:?} failed", id))?;

            let image = status.image.ok_or_else(|| ImageError::NoSuchImage(id.to_string()))?;

            let request = remove_image_request(id)?;
            ctx.image_service()
                .await?
                .remove_image(request)
                .await
                .with_context(|| format!("error of removing image {:?}", id))?;

            for tag in &image.repo_tags {
                writeln!(ctx.io.out, "Deleted: {}", tag)?;
            }
        }

        Ok(())
    }
}

/// Split `USERNAME[:PASSWORD]` at the first colon.
pub fn parse_creds(creds: &str) -> Result<(String, String), ImageError> {
    if creds.is_empty() {
        return Err(ImageError::EmptyCredentials);
    }

    match creds.split_once(':') {
        None => Ok((creds.to_string(), String::new())),
        Some(("", _)) => Err(ImageError::EmptyUsername),
        Some((username, password)) => Ok((username.to_string(), password.to_string())),
    }
}

/// Build the registry auth for a pull from `USERNAME[:PASSWORD]`.
pub fn get_auth(creds: &str) -> Result<AuthConfig, ImageError> {
    let (username, password) = parse_creds(creds)?;

    Ok(AuthConfig {
        username,
        password,
        ..Default::default()
    })
}

/// Split each repo tag into a (name, tag) pair for display.
///
/// An untagged image gets a single pair named after its digest.
pub fn normalize_repo_tag_pairs(repo_tags: &[String], image_name: &str) -> Vec<(String, String)> {
    if repo_tags.is_empty() {
        return vec![(image_name.to_string(), NONE.to_string())];
    }

    repo_tags
        .iter()
        .map(|repo_tag| match repo_tag.rsplit_once(':') {
            Some((name, tag)) => (name.to_string(), tag.to_string()),
            None => ("errorRepoTag".to_string(), "errorRepoTag".to_string()),
        })
        .collect()
}

/// Split the first repo digest into (name, digest) for display.
pub fn normalize_repo_digest(repo_digests: &[String]) -> (String, String) {
    let repo_digest = match repo_digests.first() {
        Some(repo_digest) => repo_digest,
        None => return (NONE.to_string(), NONE.to_string()),
    };

    let parts: Vec<&str> = repo_digest.split('@').collect();
    match parts.as_slice() {
        [name, digest] => (name.to_string(), digest.to_string()),
        _ => ("errorName".to_string(), "errorRepoDigest".to_string()),
    }
}

/// Strip the `sha256:` prefix from an image ID and shorten it.
pub fn truncate_id(id: &str) -> String {
    let id = id.strip_prefix("sha256:").unwrap_or(id);

    id.chars().take(TRUNCATED_ID_LEN).collect()
}

/// Sort images for display.
///
/// Tagged images come first, ordered by their first tag. Then untagged images
/// with a digest, ordered by their first digest. Then the rest. Ties are
/// broken by ID.
pub fn sort_images(images: &mut [Image]) {
    images.sort_by(compare_images);
}

fn compare_images(a: &Image, b: &Image) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

fn sort_key(image: &Image) -> (bool, Option<&String>, bool, Option<&String>, &str) {
    let tag = image.repo_tags.first();
    let digest = image.repo_digests.first();

    (tag.is_none(), tag, digest.is_none(), digest, &image.id)
}

fn image_table(images: &[Image], show_digests: bool, no_trunc: bool) -> Result<String> {
    // Columns end up max(20, cell + 3) wide.
    let mut tw = tabwriter::TabWriter::new(vec![]).minwidth(17).padding(3);

    if show_digests {
        writeln!(tw, "IMAGE\tTAG\tDIGEST\tIMAGE ID\tSIZE")?;
    } else {
        writeln!(tw, "IMAGE\tTAG\tIMAGE ID\tSIZE")?;
    }

    for image in images {
        let (image_name, digest) = normalize_repo_digest(&image.repo_digests);
        let id = if no_trunc { image.id.to_string() } else { truncate_id(&image.id) };
        let size = crate::format::human_size(image.size);

        for (name, tag) in normalize_repo_tag_pairs(&image.repo_tags, &image_name) {
            if show_digests {
                writeln!(tw, "{}\t{}\t{}\t{}\t{}", name, tag, digest, id, size)?;
            } else {
                writeln!(tw, "{}\t{}\t{}\t{}", name, tag, id, size)?;
            }
        }
    }

    tw.flush()?;

    Ok(String::from_utf8(tw.into_inner()?)?)
}

fn write_verbose_image(w: &mut dyn Write, image: &Image) -> Result<()> {
    writeln!(w, "ID: {}", image.id)?;
    for tag in &image.repo_tags {
        writeln!(w, "RepoTags: {}", tag)?;
    }
    for digest in &image.repo_digests {
        writeln!(w, "RepoDigests: {}", digest)?;
    }
    if image.size != 0 {
        writeln!(w, "Size: {}", image.size)?;
    }
    if let Some(uid) = &image.uid {
        writeln!(w, "Uid: {}", uid.value)?;
    }
    if !image.username.is_empty() {
        writeln!(w, "Username: {}\n", image.username)?;
    }

    Ok(())
}

fn write_image_status(w: &mut dyn Write, image: &Image, info: Option<&BTreeMap<String, String>>) -> Result<()> {
    writeln!(w, "ID: {}", image.id)?;
    for tag in &image.repo_tags {
        writeln!(w, "Tag: {}", tag)?;
    }
    for digest in &image.repo_digests {
        writeln!(w, "Digest: {}", digest)?;
    }
    writeln!(w, "Size: {}", crate::format::human_size(image.size))?;
    if let Some(info) = info {
        writeln!(w, "Info: {:?}", info)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn image(id: &str, tags: &[&str], digests: &[&str]) -> Image {
        Image {
            id: id.to_string(),
            repo_tags: tags.iter().map(|t| t.to_string()).collect(),
            repo_digests: digests.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    pub struct TestItem {
        name: String,
        creds: String,
        want: Option<(String, String)>,
        want_err: Option<ImageError>,
    }

    #[test]
    fn test_parse_creds() {
        let tests = vec![
            TestItem {
                name: "username and password".to_string(),
                creds: "me:hunter2".to_string(),
                want: Some(("me".to_string(), "hunter2".to_string())),
                want_err: None,
            },
            TestItem {
                name: "username only".to_string(),
                creds: "me".to_string(),
                want: Some(("me".to_string(), "".to_string())),
                want_err: None,
            },
            TestItem {
                name: "password keeps later colons".to_string(),
                creds: "me:a:b".to_string(),
                want: Some(("me".to_string(), "a:b".to_string())),
                want_err: None,
            },
            TestItem {
                name: "empty password".to_string(),
                creds: "me:".to_string(),
                want: Some(("me".to_string(), "".to_string())),
                want_err: None,
            },
            TestItem {
                name: "empty".to_string(),
                creds: "".to_string(),
                want: None,
                want_err: Some(ImageError::EmptyCredentials),
            },
            TestItem {
                name: "no username".to_string(),
                creds: ":hunter2".to_string(),
                want: None,
                want_err: Some(ImageError::EmptyUsername),
            },
        ];

        for t in tests {
            let result = parse_creds(&t.creds);
            assert_eq!(result.clone().ok(), t.want, "test {}", t.name);
            assert_eq!(result.err(), t.want_err, "test {}", t.name);
        }
    }

    #[test]
    fn test_get_auth() {
        let auth = get_auth("me:hunter2").unwrap();
        assert_eq!(auth.username, "me");
        assert_eq!(auth.password, "hunter2");
        assert_eq!(auth.auth, "");

        assert_eq!(get_auth(":x").unwrap_err().to_string(), "username can't be empty");
    }

    #[test]
    fn test_normalize_repo_tag_pairs() {
        assert_eq!(
            normalize_repo_tag_pairs(&[], "docker.io/library/busybox"),
            vec![("docker.io/library/busybox".to_string(), "<none>".to_string())]
        );

        let tags = vec![
            "localhost:5000/app:v1".to_string(),
            "busybox:latest".to_string(),
            "notag".to_string(),
        ];
        assert_eq!(
            normalize_repo_tag_pairs(&tags, "ignored"),
            vec![
                ("localhost:5000/app".to_string(), "v1".to_string()),
                ("busybox".to_string(), "latest".to_string()),
                ("errorRepoTag".to_string(), "errorRepoTag".to_string()),
            ]
        );
    }

    #[test]
    fn test_normalize_repo_digest() {
        assert_eq!(normalize_repo_digest(&[]), ("<none>".to_string(), "<none>".to_string()));

        assert_eq!(
            normalize_repo_digest(&[
                "docker.io/library/busybox@sha256:abc".to_string(),
                "other@sha256:def".to_string(),
            ]),
            ("docker.io/library/busybox".to_string(), "sha256:abc".to_string())
        );

        assert_eq!(
            normalize_repo_digest(&["nodigest".to_string()]),
            ("errorName".to_string(), "errorRepoDigest".to_string())
        );
        assert_eq!(
            normalize_repo_digest(&["a@b@c".to_string()]),
            ("errorName".to_string(), "errorRepoDigest".to_string())
        );
    }

    #[test]
    fn test_truncate_id() {
        assert_eq!(truncate_id("sha256:abcdef0123456789abcdef0123456789"), "abcdef012345");
        assert_eq!(truncate_id("abcdef0123456789"), "abcdef012345");
        assert_eq!(truncate_id("sha256:abc"), "abc");
        assert_eq!(truncate_id(""), "");
    }

    #[test]
    fn test_sort_images() {
        let mut images = vec![
            image("sha256:5", &[], &[]),
            image("sha256:4", &[], &["redis@sha256:1"]),
            image("sha256:3", &["nginx:latest"], &[]),
            image("sha256:2", &["busybox:latest"], &[]),
            image("sha256:1", &[], &["alpine@sha256:9"]),
            image("sha256:0", &[], &[]),
            image("sha256:6", &["busybox:latest"], &[]),
        ];

        sort_images(&mut images);

        let ids: Vec<&str> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["sha256:2", "sha256:6", "sha256:3", "sha256:1", "sha256:4", "sha256:0", "sha256:5"]
        );
    }

    #[test]
    fn test_sort_images_is_deterministic() {
        let a = image("sha256:a", &["z:1"], &[]);
        let b = image("sha256:b", &[], &[]);
        let c = image("sha256:c", &["a:1"], &[]);

        let mut forward = vec![a.clone(), b.clone(), c.clone()];
        let mut backward = vec![c, b, a];
        sort_images(&mut forward);
        sort_images(&mut backward);

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_image_table_empty() {
        let table = image_table(&[], false, false).unwrap();
        assert_eq!(table.lines().count(), 1, "table {}", table);
        assert_eq!(
            table.split_whitespace().collect::<Vec<_>>(),
            vec!["IMAGE", "TAG", "IMAGE", "ID", "SIZE"]
        );
        // Short headings are padded out to the minimum cell width.
        assert!(table.starts_with(&format!("{:<20}TAG", "IMAGE")), "table {}", table);

        let table = image_table(&[], true, false).unwrap();
        assert_eq!(
            table.split_whitespace().collect::<Vec<_>>(),
            vec!["IMAGE", "TAG", "DIGEST", "IMAGE", "ID", "SIZE"]
        );
    }

    #[test]
    fn test_image_table_rows() {
        let mut busybox = image(
            "sha256:abcdef0123456789abcdef0123456789",
            &["docker.io/library/busybox:latest", "docker.io/library/busybox:1.35"],
            &["docker.io/library/busybox@sha256:fedcba"],
        );
        busybox.size = 5_592_405;
        let untagged = image("sha256:0123456789abcdef", &[], &["docker.io/library/redis@sha256:beef"]);

        let table = image_table(&[busybox, untagged], true, false).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with(&format!("{:<28}TAG", "IMAGE")), "table {}", table);
        assert!(
            lines[1].starts_with(&format!("{:<28}{:<20}sha256:fedcba", "docker.io/library/busybox", "latest")),
            "table {}",
            table
        );

        let rows: Vec<Vec<&str>> = table.lines().map(|l| l.split_whitespace().collect()).collect();

        assert_eq!(
            rows,
            vec![
                vec!["IMAGE", "TAG", "DIGEST", "IMAGE", "ID", "SIZE"],
                vec!["docker.io/library/busybox", "latest", "sha256:fedcba", "abcdef012345", "5.59MB"],
                vec!["docker.io/library/busybox", "1.35", "sha256:fedcba", "abcdef012345", "5.59MB"],
                vec!["docker.io/library/redis", "<none>", "sha256:beef", "0123456789ab", "0B"],
            ]
        );

        let table = image_table(&[image("sha256:0123456789abcdef", &["a:b"], &[])], false, true).unwrap();
        assert!(table.contains("sha256:0123456789abcdef"), "table {}", table);
    }

    #[test]
    fn test_write_verbose_image() {
        let mut busybox = image("sha256:abc", &["busybox:latest"], &["busybox@sha256:def"]);
        busybox.size = 42;
        busybox.uid = Some(crate::proto::Int64Value { value: 0 });

        let mut out = vec![];
        write_verbose_image(&mut out, &busybox).unwrap();
        write_verbose_image(&mut out, &image("sha256:bare", &[], &[])).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ID: sha256:abc\nRepoTags: busybox:latest\nRepoDigests: busybox@sha256:def\nSize: 42\nUid: 0\nID: sha256:bare\n"
        );

        // Only a username line is followed by a blank line.
        let mut owned = image("sha256:owned", &[], &[]);
        owned.size = 1;
        owned.username = "root".to_string();

        let mut out = vec![];
        write_verbose_image(&mut out, &owned).unwrap();
        write_verbose_image(&mut out, &image("sha256:a", &[], &[])).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ID: sha256:owned\nSize: 1\nUsername: root\n\nID: sha256:a\n"
        );
    }

    #[test]
    fn test_write_image_status() {
        let mut busybox = image("sha256:abc", &["busybox:latest"], &["busybox@sha256:def"]);
        busybox.size = 120_000;

        let mut info = BTreeMap::new();
        info.insert("info".to_string(), "{}".to_string());

        let mut out = vec![];
        write_image_status(&mut out, &busybox, Some(&info)).unwrap();
        write_image_status(&mut out, &busybox, None).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ID: sha256:abc\nTag: busybox:latest\nDigest: busybox@sha256:def\nSize: 120kB\nInfo: {\"info\": \"{}\"}\n\
             ID: sha256:abc\nTag: busybox:latest\nDigest: busybox@sha256:def\nSize: 120kB\n"
        );
    }
}

use std::path::Path;

use anyhow::{Context, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use tokio::io::AsyncWriteExt;

use crate::{request::FetchOptions, transfer::Transfer};

const DOWNLOAD_BAR_COLOR_HEX: &str = "#FFB5E8";

/// Streaming HTTP(S) download
#[derive(Debug, Default)]
pub struct HttpTransfer;

impl HttpTransfer {
    fn client() -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build reqwest client")
    }
}

#[async_trait::async_trait]
impl Transfer for HttpTransfer {
    async fn transfer(
        &self,
        locator: &str,
        target: &Path,
        _options: &FetchOptions,
        bar: &ProgressBar,
    ) -> anyhow::Result<u64> {
        let mut response = Self::client()?
            .get(locator)
            .send()
            .await
            .with_context(|| format!("failed to send GET '{locator}'"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("GET '{locator}' failed with status {status}"));
        }

        let total_size = response.content_length();
        debug!("GET '{locator}' answered {status}, content length {total_size:?}");
        style_bar(bar, total_size);

        let mut file = tokio::fs::File::create(target)
            .await
            .with_context(|| format!("failed to create '{target:?}'"))?;

        let mut downloaded: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .context("failed to read download stream")?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("failed to write '{target:?}'"))?;
            downloaded = downloaded.saturating_add(chunk.len() as u64);
            bar.set_position(downloaded);
        }

        file.flush()
            .await
            .with_context(|| format!("failed to flush '{target:?}'"))?;

        Ok(downloaded)
    }
}

/// Switch the bar to byte counting once the size is known
fn style_bar(bar: &ProgressBar, total_size: Option<u64>) {
    let template = if let Some(total) = total_size {
        bar.set_length(total);
        format!(
            "{{spinner:.{DOWNLOAD_BAR_COLOR_HEX}}} {{msg}} [{{elapsed_precise}}] {{bytes}}/{{total_bytes}} ({{eta}})"
        )
    } else {
        format!("{{spinner:.{DOWNLOAD_BAR_COLOR_HEX}}} {{msg}} [{{elapsed_precise}}] {{bytes}}")
    };
    bar.set_style(
        ProgressStyle::with_template(&template).unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_position(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };
    use uuid::Uuid;

    /// Serve a single canned HTTP response and return the URL to request
    async fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/artifact.tar.gz")
    }

    fn scratch_file() -> PathBuf {
        let dir = std::env::temp_dir()
            .join("artifetch-test")
            .join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("out")
    }

    mod transfer {
        use super::*;

        #[tokio::test]
        async fn test_streams_body_to_target() {
            let url = serve_once(
                b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
            )
            .await;
            let target = scratch_file();

            let written = HttpTransfer
                .transfer(
                    &url,
                    &target,
                    &FetchOptions::default(),
                    &ProgressBar::hidden(),
                )
                .await
                .unwrap();

            assert_eq!(written, 5);
            assert_eq!(std::fs::read(&target).unwrap(), b"hello");
        }

        #[tokio::test]
        async fn test_fails_on_short_body() {
            let url = serve_once(
                b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\nhello",
            )
            .await;
            let target = scratch_file();

            let result = HttpTransfer
                .transfer(
                    &url,
                    &target,
                    &FetchOptions::default(),
                    &ProgressBar::hidden(),
                )
                .await;

            assert!(result.is_err(), "{result:?}");
        }

        #[tokio::test]
        async fn test_fails_on_error_status() {
            let url = serve_once(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            )
            .await;
            let target = scratch_file();

            let err = HttpTransfer
                .transfer(
                    &url,
                    &target,
                    &FetchOptions::default(),
                    &ProgressBar::hidden(),
                )
                .await
                .unwrap_err();

            assert!(err.to_string().contains("404"), "{err:#}");
            assert!(!target.exists());
        }

        #[tokio::test]
        async fn test_fails_on_unreachable_host() {
            // Bind then drop to get a port nobody listens on
            let addr = {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                listener.local_addr().unwrap()
            };
            let target = scratch_file();

            let result = HttpTransfer
                .transfer(
                    &format!("http://{addr}/f"),
                    &target,
                    &FetchOptions::default(),
                    &ProgressBar::hidden(),
                )
                .await;

            assert!(result.is_err());
        }
    }
}

use std::path::Path;

use indicatif::ProgressBar;

use crate::request::FetchOptions;

pub mod http;
pub mod object_store;

/// Transfer mechanism selected by the detected source scheme
#[async_trait::async_trait]
pub trait Transfer: Send + Sync {
    /// Check conditions no retry can fix, once before the first attempt
    fn preflight(&self, _options: &FetchOptions) -> anyhow::Result<()> {
        Ok(())
    }

    /// Copy the artifact at `locator` into `target` from byte zero and
    /// return the number of bytes written
    async fn transfer(
        &self,
        locator: &str,
        target: &Path,
        options: &FetchOptions,
        bar: &ProgressBar,
    ) -> anyhow::Result<u64>;
}

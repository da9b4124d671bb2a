use std::{ffi::OsStr, path::Path};

use anyhow::Context;
use indicatif::ProgressBar;
use log::debug;

use crate::{
    cli_command::CliCommand,
    request::FetchOptions,
    transfer::Transfer,
    validate::{validate_command_executable, validate_region},
};

/// Flag telling the object store client to skip credential signing
pub const NO_SIGN_REQUEST_FLAG: &str = "--no-sign-request";

pub const OBJECT_STORE_CLI_INSTALLATION_HINT: &str = "Please install the AWS CLI by following https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html or point --aws-cli at an existing binary.";

/// Object store download through the AWS command line client
///
/// Runs `<cli> s3 cp --region <region> [--no-sign-request] <locator> <target>`.
#[derive(Debug, Default)]
pub struct ObjectStoreTransfer;

/// Build the copy command for one attempt
pub fn copy_command(
    program: impl AsRef<OsStr>,
    locator: &str,
    target: &Path,
    options: &FetchOptions,
) -> anyhow::Result<CliCommand> {
    let region = validate_region(options.region.as_deref())
        .map_err(|err| anyhow::anyhow!(err.message.unwrap_or_default()))?;

    Ok(CliCommand::new(program.as_ref())
        .args(["s3", "cp", "--region", region])
        .arg_if(options.anonymous_access, NO_SIGN_REQUEST_FLAG)
        .arg(locator)
        .arg(target.as_os_str()))
}

#[async_trait::async_trait]
impl Transfer for ObjectStoreTransfer {
    fn preflight(&self, options: &FetchOptions) -> anyhow::Result<()> {
        validate_command_executable(OsStr::new(&options.object_store_cli))
            .map(|_| ())
            .map_err(|_| anyhow::anyhow!(OBJECT_STORE_CLI_INSTALLATION_HINT))
    }

    async fn transfer(
        &self,
        locator: &str,
        target: &Path,
        options: &FetchOptions,
        bar: &ProgressBar,
    ) -> anyhow::Result<u64> {
        let command = copy_command(&options.object_store_cli, locator, target, options)?;
        debug!("Running external CLI: {command:?}");

        bar.set_message(format!("Copying {locator} with the object store client"));
        command.run().await.context("object store copy failed")?;

        let metadata = tokio::fs::metadata(target)
            .await
            .with_context(|| format!("object store client did not create '{target:?}'"))?;
        Ok(metadata.len())
    }
}

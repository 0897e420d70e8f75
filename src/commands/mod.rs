pub mod apply;
pub mod show;
pub mod status;

use anyhow::{Context as _, Result};
use novakit::backend::default_backend;
use novakit::backend::openstack::OpenstackCli;
use novakit::{AuthenticatedExecutor, CredentialStore};
use std::path::PathBuf;

use crate::Context;
use crate::cli::ManifestArgs;
use crate::config::{self, Manifest};
use crate::ui;

/// Build the executor shared by every aggregate in one run
pub fn executor(ctx: &Context) -> Result<AuthenticatedExecutor> {
    let backend = match &ctx.openstack_bin {
        Some(path) => OpenstackCli::with_path(path)?,
        None => default_backend()?,
    };
    log::debug!("Using openstack CLI at {}", backend.path().display());
    log::debug!("Using nova config {}", ctx.nova_conf.display());

    let executor =
        AuthenticatedExecutor::new(Box::new(backend), CredentialStore::new(&ctx.nova_conf));
    if !executor.is_available() {
        let err = novakit::Error::CliNotFound;
        ui::dim(err.category().advice());
        return Err(err.into());
    }
    Ok(executor)
}

/// Load the manifest named on the command line, or the default one
pub fn load_manifest(args: &ManifestArgs) -> Result<(PathBuf, Manifest)> {
    let path = config::manifest_path(args)?;
    let manifest = Manifest::load(&path).context("Could not load aggregate manifest")?;
    log::info!(
        "Loaded {} aggregate(s) from {}",
        manifest.aggregates.len(),
        path.display()
    );
    Ok((path, manifest))
}

/// Print a library error with its category hint
pub fn report(name: &str, err: &novakit::Error) {
    let category = err.category();
    ui::error(&format!("{name}: {err}"));
    ui::dim(&format!("{}. {}", category.description(), category.advice()));
}

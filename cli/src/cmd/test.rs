use anyhow::ensure;
use olympcheck_core::{
    action, locale::Messages, print_success, style, update::UpdateCheck, Config,
};

use crate::util;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {}

pub async fn exec(_args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    style::print_banner("olympcheck", env!("CARGO_PKG_VERSION"));

    let cfg_file = match &global_args.config {
        Some(path) => {
            ensure!(path.is_file(), "Config file not found: {}", path.display());
            path.to_owned()
        }
        None => match Config::find_file_in_ancestors(util::current_dir()) {
            Some(path) => path,
            None => {
                let path = action::init_config(util::current_dir())?;
                let msgs = Messages::load("en", None);
                print_success!("{} ({})", msgs.config_created(), path.to_string_lossy());
                return Ok(());
            }
        },
    };

    let cfg = Config::from_toml_file(cfg_file)?;
    let msgs = Messages::load(&cfg.settings.lang, cfg.source_config_dir());

    let update_check = if global_args.no_update_check {
        None
    } else {
        UpdateCheck::spawn(&cfg.update, env!("CARGO_PKG_VERSION"))
    };

    let res = action::judge(&cfg, &msgs).await;

    if let Some(check) = update_check {
        action::offer_update(check, &cfg, &msgs).await;
    }
    res.map(|_| ())
}

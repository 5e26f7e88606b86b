pub mod init;
pub mod test;

use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Config file to use instead of searching for olympcheck.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub no_update_check: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Init(init::Args),

    #[command(alias("t"))]
    Test(test::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Init(args) => init::exec(args, self),
            Test(args) => test::exec(args, self).await,
        }
    }
}

use std::io::Write as _;

use clap::Parser;
use colored::Colorize;
use olympcheck_cli::cmd::GlobalArgs;
use olympcheck_core::style::ColorTheme;

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format(|buf, record| {
            let level = record.level();
            writeln!(
                buf,
                "[{}] {}",
                level.as_str().color(level.color()),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() {
    init_logger();
    let app = GlobalArgs::parse();
    app.exec_subcmd().await.unwrap_or_else(|e| {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    });
}

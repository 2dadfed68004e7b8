use anyhow::Result;
use env_logger::{Builder, Env};
use log::error;

use QuiverSST::SstConfig;

mod cli;
mod util;
mod cmd_init;
mod cmd_put;
mod cmd_get;
mod cmd_del;
mod cmd_scan;
mod cmd_status;
mod cmd_check;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт: info.
    // Пример: RUST_LOG=debug quiversst get --path ./t.sst --key k
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cfg = SstConfig::from_env();
    cfg.validate()?;

    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Init { path, format, size } =>
            cmd_init::exec(&cfg, path, format.into(), size),

        cli::Cmd::Put { path, key, value, value_file, overwrite, pad } =>
            cmd_put::exec(&cfg, path, key, value, value_file, overwrite, pad),

        cli::Cmd::Get { path, key, out } =>
            cmd_get::exec(&cfg, path, key, out),

        cli::Cmd::Del { path, key } =>
            cmd_del::exec(&cfg, path, key),

        cli::Cmd::Scan { path, prefix, json } =>
            cmd_scan::exec(&cfg, path, prefix, json),

        cli::Cmd::Status { path, json } =>
            cmd_status::exec(&cfg, path, json),

        cli::Cmd::Check { path, json } =>
            cmd_check::exec(&cfg, path, json),
    }
}

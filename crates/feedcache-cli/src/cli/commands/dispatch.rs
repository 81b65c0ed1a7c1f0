use super::super::args::*;
use crate::exit_codes::SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.store.to_config();
    match cli.cmd {
        Command::Show => super::show::run(config).await,
        Command::Put(args) => super::put::run(config, args).await,
        Command::Clear => super::clear::run(config).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}

mod cli;

use anyhow::Result;

fn main() -> Result<()> {
    std::env::set_var("RUST_LOG", "info");
    pretty_env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    cli::run(&args)
}

use colored::Colorize;
use h5fetch::commands::command_argument_builder;
use h5fetch::handlers::handle_fetch;

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();

    if let Err(e) = handle_fetch(&matches).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

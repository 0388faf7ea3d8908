use crate::CLAP_STYLING;
use clap::arg;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("h5fetch")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("h5fetch")
        .about(
            "Crawl h5ai directory listings and download every file they link to. \
            Interrupted runs resume where they left off.",
        )
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress progress bars and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log every request to stderr").required(false))
        .arg(
            arg!(-u --"url" <URL>)
                .required(false)
                .help("The listing URL to crawl")
                .conflicts_with("file"),
        )
        .arg(
            arg!(-f --"file" <PATH>)
                .required(false)
                .help("Path to a .txt file with one '<url> [depth]' per line")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .conflicts_with("url"),
        )
        .arg(
            arg!(-d --"depth" <DEPTH>)
                .required(false)
                .help("Maximum directory depth to crawl (per-line depths in --file win)")
                .value_parser(clap::value_parser!(usize))
                .default_value("4"),
        )
        .arg(
            arg!(-w --"workers" <NUM_WORKERS>)
                .required(false)
                .help("The number of concurrent download workers")
                .value_parser(clap::value_parser!(usize))
                .default_value("4"),
        )
        .arg(
            arg!(--"export-only")
                .required(false)
                .help("Write the discovered URLs to a file instead of downloading them")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"flat")
                .required(false)
                .help("Drop the server's directory structure (file names only)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .help("Download directory (default: ./files) or export file (default: urls.txt)"),
        )
        .arg(
            arg!(--"cache-dir" <PATH>)
                .required(false)
                .help("Where fetched listing pages are cached")
                .default_value("url_cache"),
        )
        .arg(
            arg!(--"ledger-dir" <PATH>)
                .required(false)
                .help("Where completed downloads are recorded for resuming")
                .default_value("downloaded_db"),
        )
        .arg(
            arg!(--"retries" <COUNT>)
                .required(false)
                .help("Retries per page fetch or download, with exponential backoff")
                .value_parser(clap::value_parser!(u32))
                .default_value("0"),
        )
        .arg(
            arg!(--"dedup")
                .required(false)
                .help("Collect a file linked from several listings only once")
                .action(clap::ArgAction::SetTrue),
        )
}

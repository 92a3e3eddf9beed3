use anyhow::Context;
use cloudshelf::config::BrowseConfig;
use cloudshelf::mutations::DiskMutations;
use cloudshelf::retry::RetryPolicy;
use cloudshelf::session::BrowseSession;
use cloudshelf::source::HttpPageSource;
use cloudshelf_api::DiskClient;
use cloudshelf_core::{CollectionKey, Listing, SearchFilter, SortSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliMode {
    Browse(BrowseArgs),
    Help,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BrowseArgs {
    path: Option<String>,
    sort: Option<SortSpec>,
    page_size: Option<u32>,
    all: bool,
    json: bool,
    trash: bool,
    media_type: Option<String>,
}

impl BrowseArgs {
    fn collection(&self) -> CollectionKey {
        if self.trash {
            CollectionKey::Trash
        } else if let Some(media_type) = &self.media_type {
            CollectionKey::Search(SearchFilter::media_type(media_type.clone()))
        } else {
            CollectionKey::folder(self.path.clone().unwrap_or_else(|| "/".to_string()))
        }
    }
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = BrowseArgs::default();
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(CliMode::Help),
            "--all" => parsed.all = true,
            "--json" => parsed.json = true,
            "--trash" => parsed.trash = true,
            "--sort" => {
                let value = args.next().context("--sort needs a value")?;
                parsed.sort = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid sort {value:?}"))?,
                );
            }
            "--page-size" => {
                let value = args.next().context("--page-size needs a value")?;
                let size: u32 = value
                    .parse()
                    .with_context(|| format!("invalid page size {value:?}"))?;
                anyhow::ensure!(size > 0, "page size must be positive");
                parsed.page_size = Some(size);
            }
            "--media-type" => {
                parsed.media_type = Some(args.next().context("--media-type needs a value")?);
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            path => {
                anyhow::ensure!(parsed.path.is_none(), "only one path may be given");
                parsed.path = Some(path.to_string());
            }
        }
    }
    anyhow::ensure!(
        !(parsed.trash && parsed.media_type.is_some()),
        "--trash and --media-type are exclusive"
    );
    Ok(CliMode::Browse(parsed))
}

fn print_help() {
    println!("Usage: cloudshelf [PATH] [options]");
    println!("  --sort FIELD        name, size, created, modified; prefix with - to reverse");
    println!("  --page-size N       items per remote request");
    println!("  --all               fetch every page instead of the first one");
    println!("  --trash             list the trash instead of a folder");
    println!("  --media-type TYPE   list files of this media type across the disk");
    println!("  --json              print the listing as JSON");
}

fn print_listing(listing: &Listing) {
    for node in &listing.items {
        let marker = if node.is_folder() { 'd' } else { '-' };
        let size = node.size.map(|size| size.to_string()).unwrap_or_default();
        println!("{marker} {size:>12} {}", node.name);
    }
    if listing.has_more {
        println!("... more items available (use --all)");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudshelf=info,cloudshelf_core=info".into()),
        )
        .init();

    let args = match parse_cli_mode(std::env::args())? {
        CliMode::Help => {
            print_help();
            return Ok(());
        }
        CliMode::Browse(args) => args,
    };
    let config = BrowseConfig::from_env()?;
    let client =
        DiskClient::with_base_url(&config.api_url, &config.token).context("invalid api url")?;
    let retry = RetryPolicy::new(config.fetch_retries);
    let mut session = BrowseSession::new(
        HttpPageSource::new(client.clone()),
        args.page_size.unwrap_or(config.page_size),
    )
    .with_retry(retry)
    .with_mutations(DiskMutations::new(client).with_retry(retry));

    let sort = args
        .sort
        .map(|sort| sort.with_folders_first(config.sort.folders_first))
        .unwrap_or(config.sort);
    let mut listing = session
        .open(args.collection(), sort)
        .await
        .context("failed to load listing")?;
    if args.all {
        listing = session
            .load_all()
            .await
            .context("failed to load remaining pages")?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print_listing(&listing);
    }
    Ok(())
}

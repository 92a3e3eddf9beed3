use anyhow::Context;
use cloudshelf_core::SortSpec;

pub const DEFAULT_API_URL: &str = "https://cloud-api.yandex.net";
const DEFAULT_PAGE_SIZE: u64 = 20;
const DEFAULT_FETCH_RETRIES: u64 = 3;
const MAX_PAGE_SIZE: u64 = 1000;

#[derive(Debug, Clone)]
pub struct BrowseConfig {
    pub token: String,
    pub api_url: String,
    pub page_size: u32,
    pub sort: SortSpec,
    pub fetch_retries: u32,
}

impl BrowseConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let token = std::env::var("CLOUDSHELF_TOKEN").context("CLOUDSHELF_TOKEN is not set")?;
        let api_url =
            std::env::var("CLOUDSHELF_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let page_size = read_u64_env("CLOUDSHELF_PAGE_SIZE", DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let sort = match std::env::var("CLOUDSHELF_SORT") {
            Ok(value) => value
                .parse::<SortSpec>()
                .with_context(|| format!("invalid CLOUDSHELF_SORT {value:?}"))?,
            Err(_) => SortSpec::default(),
        };
        let folders_first = read_bool_env("CLOUDSHELF_FOLDERS_FIRST", sort.folders_first);
        let fetch_retries = read_u64_env("CLOUDSHELF_FETCH_RETRIES", DEFAULT_FETCH_RETRIES);

        Ok(Self {
            token,
            api_url,
            page_size: page_size as u32,
            sort: sort.with_folders_first(folders_first),
            fetch_retries: u32::try_from(fetch_retries).unwrap_or(u32::MAX),
        })
    }
}

fn read_u64_env(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn read_bool_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| parse_bool(&value))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

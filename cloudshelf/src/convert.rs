use cloudshelf_api::{Resource, ResourceType};
use cloudshelf_core::{Node, NodeId, NodeKind};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const DISK_PREFIX: &str = "disk:";
const TRASH_PREFIX: &str = "trash:";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: time::error::Parse,
    },
}

/// Maps a remote resource onto the engine's node record.
///
/// The id is the remote `resource_id` so renames and moves keep identity;
/// resources without one fall back to their path.
pub fn node_from_resource(resource: &Resource) -> Result<Node, ConvertError> {
    let path = normalize_path(&resource.path);
    let parent_path = match &resource.origin_path {
        Some(origin) => parent_of(&normalize_path(origin)),
        None => parent_of(&path),
    };
    Ok(Node {
        id: NodeId::new(
            resource
                .resource_id
                .clone()
                .unwrap_or_else(|| path.clone()),
        ),
        kind: match resource.resource_type {
            ResourceType::File => NodeKind::File,
            ResourceType::Dir => NodeKind::Folder,
        },
        name: resource.name.clone(),
        parent_path,
        path,
        size: resource.size,
        created_at: parse_timestamp(resource.created.as_deref())?,
        updated_at: parse_timestamp(resource.modified.as_deref())?,
        media_type: resource.media_type.clone(),
    })
}

/// `disk:/Docs/` and `/Docs` both become `/Docs`; trash paths are kept.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with(TRASH_PREFIX) {
        return path.to_string();
    }
    let rest = path.strip_prefix(DISK_PREFIX).unwrap_or(path);
    let trimmed = rest.trim_matches('/');
    format!("/{trimmed}")
}

pub fn parent_of(path: &str) -> Option<String> {
    if path.starts_with(TRASH_PREFIX) || path == "/" {
        return None;
    }
    let (parent, _) = path.rsplit_once('/')?;
    if parent.is_empty() {
        Some("/".to_string())
    } else {
        Some(parent.to_string())
    }
}

pub fn join_path(folder: &str, name: &str) -> String {
    let folder = normalize_path(folder);
    if folder == "/" {
        format!("/{name}")
    } else {
        format!("{folder}/{name}")
    }
}

fn parse_timestamp(value: Option<&str>) -> Result<Option<i64>, ConvertError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let parsed = OffsetDateTime::parse(value, &Rfc3339).map_err(|source| ConvertError::Timestamp {
        value: value.to_string(),
        source,
    })?;
    Ok(Some(parsed.unix_timestamp()))
}

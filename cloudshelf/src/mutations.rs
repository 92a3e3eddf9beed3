use cloudshelf_api::{ApiError, DiskClient, Link, OperationStatus};
use cloudshelf_core::{CollectionKey, MutationEvent, Node};
use thiserror::Error;
use tracing::debug;

use crate::convert::{ConvertError, join_path, node_from_resource};
use crate::retry::{Pacing, RetryPolicy};

const TRASH_ROOT: &str = "trash:/";
const OPERATION_POLLS: u32 = 10;

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),
    #[error("remote operation failed")]
    OperationFailed,
    #[error("{0} has no parent folder")]
    NoParent(String),
}

/// Remote changes issued by this client, each answered with the mutation
/// events that describe its outcome.
#[derive(Clone)]
pub struct DiskMutations {
    client: DiskClient,
    retry: RetryPolicy,
    poll: Pacing,
}

impl DiskMutations {
    pub fn new(client: DiskClient) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            poll: Pacing::REMOTE,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_poll_pacing(mut self, poll: Pacing) -> Self {
        self.poll = poll;
        self
    }

    pub async fn create_folder(
        &self,
        parent: &str,
        name: &str,
    ) -> Result<Vec<MutationEvent>, MutationError> {
        let path = join_path(parent, name);
        let link = self.client.create_folder(&path).await?;
        self.finish(&link).await?;
        let node = self.fetch_node(&path).await?;
        Ok(vec![MutationEvent::Created {
            collections: folder_of(&node).into_iter().collect(),
            node,
        }])
    }

    pub async fn rename(
        &self,
        node: &Node,
        new_name: &str,
    ) -> Result<Vec<MutationEvent>, MutationError> {
        let parent = parent_folder(node)?;
        let target = join_path(&parent, new_name);
        let link = self
            .client
            .move_resource(&node.path, &target, false)
            .await?;
        self.finish(&link).await?;
        let renamed = self.fetch_node(&target).await?;
        Ok(vec![MutationEvent::Updated {
            node: renamed,
            collections: vec![CollectionKey::Folder(parent)],
        }])
    }

    /// Moves `node` into `folder`; the node leaves its old folder's
    /// listings and enters the new one.
    pub async fn move_to(
        &self,
        node: &Node,
        folder: &str,
    ) -> Result<Vec<MutationEvent>, MutationError> {
        let source = parent_folder(node)?;
        let target = join_path(folder, &node.name);
        let link = self
            .client
            .move_resource(&node.path, &target, false)
            .await?;
        self.finish(&link).await?;
        let moved = self.fetch_node(&target).await?;
        Ok(vec![
            MutationEvent::Removed {
                id: node.id.clone(),
                collections: vec![CollectionKey::Folder(source)],
            },
            MutationEvent::Created {
                collections: folder_of(&moved).into_iter().collect(),
                node: moved,
            },
        ])
    }

    /// Trashed nodes keep their id and their original parent.
    pub async fn trash(&self, node: &Node) -> Result<Vec<MutationEvent>, MutationError> {
        if let Some(link) = self.client.delete_resource(&node.path, false).await? {
            self.finish(&link).await?;
        }
        let trashed = Node {
            path: format!("{TRASH_ROOT}{}", node.name),
            ..node.clone()
        };
        Ok(vec![
            MutationEvent::Removed {
                id: node.id.clone(),
                collections: Vec::new(),
            },
            MutationEvent::Created {
                node: trashed,
                collections: vec![CollectionKey::Trash],
            },
        ])
    }

    pub async fn restore(&self, node: &Node) -> Result<Vec<MutationEvent>, MutationError> {
        let parent = parent_folder(node)?;
        let link = self.client.restore_from_trash(&node.path, None).await?;
        self.finish(&link).await?;
        let restored = self.fetch_node(&join_path(&parent, &node.name)).await?;
        Ok(vec![
            MutationEvent::Removed {
                id: node.id.clone(),
                collections: vec![CollectionKey::Trash],
            },
            MutationEvent::Created {
                node: restored,
                collections: vec![CollectionKey::Folder(parent)],
            },
        ])
    }

    pub async fn delete_permanently(
        &self,
        node: &Node,
    ) -> Result<Vec<MutationEvent>, MutationError> {
        let link = if node.path.starts_with(TRASH_ROOT) {
            self.client.delete_from_trash(&node.path).await?
        } else {
            self.client.delete_resource(&node.path, true).await?
        };
        if let Some(link) = link {
            self.finish(&link).await?;
        }
        Ok(vec![MutationEvent::Removed {
            id: node.id.clone(),
            collections: Vec::new(),
        }])
    }

    async fn fetch_node(&self, path: &str) -> Result<Node, MutationError> {
        let client = &self.client;
        let resource = self
            .retry
            .run("get resource", || client.get_resource(path))
            .await?;
        Ok(node_from_resource(&resource)?)
    }

    async fn finish(&self, link: &Link) -> Result<(), MutationError> {
        if link.is_operation() {
            self.wait_for_operation(link.href.as_str()).await?;
        }
        Ok(())
    }

    async fn wait_for_operation(&self, operation_url: &str) -> Result<(), MutationError> {
        for attempt in 0..OPERATION_POLLS {
            match self.client.get_operation_status(operation_url).await? {
                OperationStatus::Success => return Ok(()),
                OperationStatus::Failure => return Err(MutationError::OperationFailed),
                OperationStatus::InProgress => {
                    debug!(operation_url, attempt, "remote operation in progress");
                    let wait = self.poll.wait(attempt, &mut rand::thread_rng());
                    tokio::time::sleep(wait).await;
                }
            }
        }
        Err(MutationError::OperationFailed)
    }
}

/// A finished upload: the node appears in its folder's listings.
pub fn upload_completed(node: Node) -> Vec<MutationEvent> {
    vec![MutationEvent::Created {
        collections: folder_of(&node).into_iter().collect(),
        node,
    }]
}

fn folder_of(node: &Node) -> Option<CollectionKey> {
    node.parent_path.clone().map(CollectionKey::Folder)
}

fn parent_folder(node: &Node) -> Result<String, MutationError> {
    node.parent_path
        .clone()
        .ok_or_else(|| MutationError::NoParent(node.path.clone()))
}

use crate::array::ZarrArray;
use crate::error::{ZarrError, ZarrResult};
use crate::metadata::v2::ZarrGroupMetadata;
use crate::store::StoreRef;
use crate::v2::open_node;

// ---------------------------------------------------------------------------
// ZarrNode
// ---------------------------------------------------------------------------

/// Either kind of node a V2 hierarchy can hold.
#[derive(Debug, Clone)]
pub enum ZarrNode {
    Array(ZarrArray),
    Group(ZarrGroup),
}

impl ZarrNode {
    pub fn path(&self) -> &str {
        match self {
            ZarrNode::Array(a) => a.path(),
            ZarrNode::Group(g) => g.path(),
        }
    }
}

// ---------------------------------------------------------------------------
// ZarrGroup
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ZarrGroup {
    pub metadata: ZarrGroupMetadata,
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
    store: StoreRef,
    path: String,
}

impl std::fmt::Debug for ZarrGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZarrGroup")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl ZarrGroup {
    pub fn new(
        store: StoreRef,
        path: impl Into<String>,
        metadata: ZarrGroupMetadata,
        attributes: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Self {
        Self {
            metadata,
            attributes,
            store,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Immediate children that are arrays or groups, sorted by name.
    /// Other entries (chunk-less directories, stray files) are skipped.
    pub async fn members(&self) -> ZarrResult<Vec<(String, ZarrNode)>> {
        let mut members = Vec::new();
        for name in self.store.list(&self.path).await? {
            if name.starts_with('.') {
                continue;
            }
            let child = self.store.join(&self.path, &name);
            match open_node(self.store.clone(), &child).await {
                Ok(node) => members.push((name, node)),
                Err(ZarrError::NotFound(_)) => {
                    log::debug!("skipping non-zarr entry '{child}'");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(members)
    }
}

use std::collections::{HashMap, HashSet};

use super::TaxonomyService;
use crate::{
    error::ServiceError,
    models::{Level, ParentKeys, Taxon, TaxonNode, TaxonRequest, Updated},
};

/// normalize
///
/// Folds the level's own parent key into `parent_id`. A parent key that names another
/// level's column is rejected. A root-level payload never carries a parent; any other
/// level must.
fn normalize(level: Level, mut request: TaxonRequest) -> Result<TaxonRequest, ServiceError> {
    let own_column = level.parent_column();
    let mut own_key = None;
    for (column, value) in request.parent_keys.entries() {
        let Some(value) = value else { continue };
        if own_column != Some(column) {
            tracing::info!(level = level.slug(), key = column, "parent key of another level");
            return Err(ServiceError::NotFound);
        }
        own_key = Some(value);
    }
    request.parent_keys = ParentKeys::default();

    match own_column {
        None => {
            request.parent_id = None;
            Ok(request)
        }
        Some(_) => {
            request.parent_id = own_key.or(request.parent_id);
            if request.parent_id.is_some() {
                Ok(request)
            } else {
                Err(ServiceError::NotFound)
            }
        }
    }
}

impl TaxonomyService {
    /// Admin only. The parent reference is not checked here; the store's foreign keys are.
    pub async fn create_taxon(
        &self,
        level: Level,
        token: Option<&str>,
        request: TaxonRequest,
    ) -> Result<TaxonNode, ServiceError> {
        self.require_admin(token).await?;
        let request = normalize(level, request)?;
        let taxon = self.repo.insert_taxon(level, &request).await?;
        tracing::info!(level = level.slug(), id = taxon.id, "taxon created");
        Ok(TaxonNode::leaf(level, taxon))
    }

    /// Admin only. Full-field overwrite, `is_deleted` included.
    pub async fn update_taxon(
        &self,
        level: Level,
        id: i64,
        token: Option<&str>,
        request: TaxonRequest,
    ) -> Result<Updated, ServiceError> {
        self.require_admin(token).await?;
        let request = normalize(level, request)?;
        if !self.repo.update_taxon(level, id, &request).await? {
            return Err(ServiceError::NotFound);
        }
        tracing::info!(level = level.slug(), id, "taxon updated");
        Ok(Updated { updated: true })
    }

    /// list_taxa
    ///
    /// Admin only. Live taxa of `level`, id descending and unique by id, each carrying its
    /// complete subtree down to families. Soft-deleted descendants stay in the subtree with
    /// their own `is_deleted` flag.
    pub async fn list_taxa(
        &self,
        level: Level,
        token: Option<&str>,
    ) -> Result<Vec<TaxonNode>, ServiceError> {
        self.require_admin(token).await?;

        let mut roots = self.repo.list_taxa(level).await?;
        roots.sort_by(|a, b| b.id.cmp(&a.id));
        roots.dedup_by_key(|t| t.id);

        self.load_subtrees(level, roots).await
    }

    /// Admin only. One live taxon with its subtree.
    pub async fn get_taxon(
        &self,
        level: Level,
        id: i64,
        token: Option<&str>,
    ) -> Result<TaxonNode, ServiceError> {
        self.require_admin(token).await?;
        let taxon = self
            .repo
            .get_taxon(level, id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        self.load_subtrees(level, vec![taxon])
            .await?
            .pop()
            .ok_or(ServiceError::NotFound)
    }

    /// Admin only. Soft delete (or restore); the row stays in storage.
    pub async fn set_taxon_deleted(
        &self,
        level: Level,
        id: i64,
        token: Option<&str>,
        is_deleted: bool,
    ) -> Result<bool, ServiceError> {
        self.require_admin(token).await?;
        if !self.repo.set_taxon_deleted(level, id, is_deleted).await? {
            return Err(ServiceError::NotFound);
        }
        tracing::info!(level = level.slug(), id, is_deleted, "taxon delete flag set");
        Ok(is_deleted)
    }

    /// Admin only. Departments are the one level removed physically. Children are not
    /// touched, so a department that still has classes is refused by the store.
    pub async fn delete_department(&self, id: i64, token: Option<&str>) -> Result<(), ServiceError> {
        self.require_admin(token).await?;
        if !self.repo.delete_taxon(Level::Department, id).await? {
            return Err(ServiceError::NotFound);
        }
        tracing::info!(id, "department removed");
        Ok(())
    }

    /// load_subtrees
    ///
    /// Fetches every level below `level` with one "children of these ids" query per level,
    /// then assembles the trees bottom-up. Root order is preserved.
    async fn load_subtrees(
        &self,
        level: Level,
        roots: Vec<Taxon>,
    ) -> Result<Vec<TaxonNode>, ServiceError> {
        let mut layers: Vec<(Level, Vec<Taxon>)> = vec![(level, roots)];
        for child in level.descendants() {
            let parent_ids: Vec<i64> = layers
                .last()
                .map(|(_, rows)| rows.iter().map(|t| t.id).collect())
                .unwrap_or_default();
            let rows = if parent_ids.is_empty() {
                Vec::new()
            } else {
                self.repo.list_children(child, &parent_ids).await?
            };
            layers.push((child, rows));
        }

        // Nodes of the layer below, grouped by parent id.
        let mut below: HashMap<i64, Vec<TaxonNode>> = HashMap::new();
        let mut top = Vec::new();
        while let Some((layer_level, rows)) = layers.pop() {
            let has_children = layer_level.child().is_some();
            let mut seen = HashSet::new();
            let nodes: Vec<TaxonNode> = rows
                .into_iter()
                .filter(|t| seen.insert(t.id))
                .map(|taxon| {
                    let children = has_children
                        .then(|| below.remove(&taxon.id).unwrap_or_default());
                    TaxonNode {
                        level: layer_level,
                        taxon,
                        children,
                    }
                })
                .collect();

            if layers.is_empty() {
                top = nodes;
            } else {
                below.clear();
                for node in nodes {
                    let Some(parent_id) = node.taxon.parent_id else {
                        continue;
                    };
                    below.entry(parent_id).or_default().push(node);
                }
            }
        }
        Ok(top)
    }
}

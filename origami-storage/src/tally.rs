//! Split-service vote tally.
//!
//! When the catalogue and the voting service run separately, votes live in
//! their own document: `{"origamis": {"<id>": <count>, ...}}`.

use crate::fs::{read_optional, write_json_atomic};
use origami_core::{validate_product_id, OrigamiError, OrigamiResult, ProductId, VoteCount};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TallyDocument {
    origamis: BTreeMap<String, VoteCount>,
}

/// File-backed vote counters keyed by product id.
#[derive(Debug)]
pub struct VoteTally {
    path: PathBuf,
    document: Mutex<TallyDocument>,
}

impl VoteTally {
    /// Read the tally from `path`. A missing file is an empty tally; a file
    /// that is not a tally document is a persistence failure.
    pub async fn load(path: impl Into<PathBuf>) -> OrigamiResult<Self> {
        let path = path.into();
        let document = match read_optional(&path).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "Invalid votes document");
                OrigamiError::persistence("load votes", format!("{}: {}", path.display(), e))
            })?,
            Ok(None) => {
                tracing::debug!(path = %path.display(), "Votes file absent, starting empty");
                TallyDocument::default()
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read votes");
                return Err(OrigamiError::persistence(
                    "load votes",
                    format!("{}: {}", path.display(), e),
                ));
            }
        };

        if let Some((key, votes)) = document.origamis.iter().find(|(_, v)| **v < 0) {
            tracing::error!(path = %path.display(), key = %key, votes, "Negative vote count");
            return Err(OrigamiError::persistence(
                "load votes",
                format!("{}: origami {} has negative votes {}", path.display(), key, votes),
            ));
        }

        tracing::info!(
            path = %path.display(),
            origamis = document.origamis.len(),
            "Loaded vote tally"
        );
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Votes recorded for `id`; zero when none were.
    pub async fn votes_for(&self, id: ProductId) -> VoteCount {
        let document = self.document.lock().await;
        document.origamis.get(&id.to_string()).copied().unwrap_or(0)
    }

    /// Every recorded counter. Keys that are not product ids are skipped.
    pub async fn all_votes(&self) -> HashMap<ProductId, VoteCount> {
        let document = self.document.lock().await;
        document
            .origamis
            .iter()
            .filter_map(|(key, votes)| key.parse().ok().map(|id| (id, *votes)))
            .collect()
    }

    /// Add one vote and persist the whole document. On a failed write the
    /// previous counter is restored.
    pub async fn increment(&self, id: ProductId) -> OrigamiResult<VoteCount> {
        let id = validate_product_id(id)?;
        let key = id.to_string();
        let mut document = self.document.lock().await;

        let previous = document.origamis.get(&key).copied();
        let new_count = previous
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| OrigamiError::persistence("add vote", "vote counter overflow"))?;
        document.origamis.insert(key.clone(), new_count);

        if let Err(e) = write_json_atomic(&self.path, &*document).await {
            match previous {
                Some(votes) => document.origamis.insert(key, votes),
                None => document.origamis.remove(&key),
            };
            tracing::error!(path = %self.path.display(), product_id = id, error = %e, "Failed to save votes");
            return Err(OrigamiError::persistence(
                "save votes",
                format!("{}: {}", self.path.display(), e),
            ));
        }

        tracing::info!(product_id = id, new_count, "Incremented votes");
        Ok(new_count)
    }
}

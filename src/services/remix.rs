//! Remix/duet chain traversal
//!
//! Remix ancestry is a parent-pointer chain on clips. The walk is
//! iterative with an explicit depth cap and a visited set; the schema
//! forbids cycles but the guard stands anyway.

use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::db::ClipsRepo;
use crate::error::Result;

pub const MAX_CHAIN_DEPTH: usize = 10;

#[derive(Clone)]
pub struct RemixChainService {
    clips: ClipsRepo,
}

impl RemixChainService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            clips: ClipsRepo::new(pool),
        }
    }

    /// Ancestors of a clip, nearest first, at most `MAX_CHAIN_DEPTH`
    /// hops. A clip with no parent (or no row at all) yields an empty
    /// chain.
    pub async fn ancestry(&self, clip_id: Uuid) -> Result<Vec<Uuid>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([clip_id]);
        let mut current = clip_id;

        while chain.len() < MAX_CHAIN_DEPTH {
            let Some(parent) = self.clips.parent_of(current).await? else {
                break;
            };

            if !visited.insert(parent) {
                tracing::warn!(clip_id = %clip_id, at = %parent, "Cycle in remix chain");
                break;
            }

            chain.push(parent);
            current = parent;
        }

        Ok(chain)
    }
}

//! On-demand view over an artifact's prior content versions.
//!
//! A [`LazyContentList`] holds the ordered content ids of an artifact and
//! fetches each blob the first time its position is read. Fetched content is
//! cached by position for the lifetime of the list, which is one rule
//! application call. Several rules walking the same history therefore cost at
//! most one storage read per position.
//!
//! The cache uses a `RefCell`, so the list is `!Sync`: keep one instance on
//! one thread, scoped to one request.

use std::cell::RefCell;
use std::fmt;

use registry_storage::{ContentHandle, ContentId, RegistryStorage};

use crate::error::{RulesError, RulesResult};
use crate::obs::emit_content_fetched;

/// Lazily fetched, position-cached content history.
pub struct LazyContentList<'s> {
    storage: &'s dyn RegistryStorage,
    content_ids: Vec<ContentId>,
    cache: RefCell<Vec<Option<ContentHandle>>>,
}

impl<'s> LazyContentList<'s> {
    /// Wrap `content_ids` (oldest first). Nothing is fetched yet.
    pub fn new(storage: &'s dyn RegistryStorage, content_ids: Vec<ContentId>) -> Self {
        let cache = RefCell::new(vec![None; content_ids.len()]);
        Self {
            storage,
            content_ids,
            cache,
        }
    }

    /// An empty history (no prior content).
    pub fn empty(storage: &'s dyn RegistryStorage) -> Self {
        Self::new(storage, Vec::new())
    }

    /// Number of versions in the history. Never touches storage.
    pub fn len(&self) -> usize {
        self.content_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content_ids.is_empty()
    }

    pub fn content_ids(&self) -> &[ContentId] {
        &self.content_ids
    }

    /// Whether `index` has already been fetched.
    pub fn is_cached(&self, index: usize) -> bool {
        matches!(self.cache.borrow().get(index), Some(Some(_)))
    }

    /// Content at `index`, fetching it on first access.
    ///
    /// A failed fetch is returned to the caller and leaves the slot empty, so
    /// a later call for the same index tries again. Other slots are untouched.
    pub fn get(&self, index: usize) -> RulesResult<ContentHandle> {
        if let Some(Some(content)) = self.cache.borrow().get(index) {
            return Ok(content.clone());
        }

        let content_id = *self
            .content_ids
            .get(index)
            .ok_or(RulesError::HistoryIndexOutOfRange {
                index,
                len: self.content_ids.len(),
            })?;

        // No borrow is held across the fetch.
        let content = self.storage.content_by_id(content_id)?;
        emit_content_fetched(content_id, index);
        self.cache.borrow_mut()[index] = Some(content.clone());
        Ok(content)
    }

    /// Most recent content, if any.
    pub fn last(&self) -> Option<RulesResult<ContentHandle>> {
        self.len().checked_sub(1).map(|index| self.get(index))
    }

    /// Iterate oldest to newest, fetching as needed.
    pub fn iter(&self) -> impl Iterator<Item = RulesResult<ContentHandle>> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }
}

impl fmt::Debug for LazyContentList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.cache.borrow().iter().filter(|c| c.is_some()).count();
        f.debug_struct("LazyContentList")
            .field("content_ids", &self.content_ids)
            .field("cached", &cached)
            .finish()
    }
}

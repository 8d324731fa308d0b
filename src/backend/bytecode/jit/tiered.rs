//! Tiered Dispatch and Block Cache
//!
//! Blocks run in one of two tiers:
//!
//! ```text
//! Tier 0: Bytecode interpreter (every block, always available)
//! Tier 1: Native code (blocks the policy compiles, once, on first request)
//! ```
//!
//! The cache maps block identity to compiled native code. Identity is the
//! address of the shared `Arc<Block>`, so two structurally equal blocks are
//! compiled independently. Each entry keeps its `Arc` alive so the address
//! cannot be reused while the entry exists.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use super::engine::CompiledBlock;
use super::profile::{BlockProfile, CompileState};
use super::types::{JitError, JitResult};
use crate::backend::bytecode::block::Block;

/// Execution tier of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Tier {
    Interpreter = 0,
    Native = 1,
}

impl Tier {
    #[inline]
    pub fn is_jit(&self) -> bool {
        matches!(self, Tier::Native)
    }
}

/// Identity of a shared block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

impl BlockId {
    pub fn of(block: &Arc<Block>) -> Self {
        BlockId(Arc::as_ptr(block) as usize)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Entry in the block cache
struct CacheEntry<R> {
    /// Keeps the block, and with it the key, alive
    block: Arc<Block>,

    profile: Arc<BlockProfile>,

    /// Present once the profile is `Compiled`
    compiled: Option<Arc<CompiledBlock<R>>>,
}

/// Concurrent cache of compiled blocks
///
/// Compilation happens under the map's entry lock, so one block is compiled
/// at most once even with concurrent callers.
pub struct BlockCache<R> {
    entries: DashMap<BlockId, CacheEntry<R>>,
}

impl<R> BlockCache<R> {
    pub fn new() -> Self {
        BlockCache {
            entries: DashMap::new(),
        }
    }

    /// Cached native code for `block`, if any
    pub fn get(&self, block: &Arc<Block>) -> Option<Arc<CompiledBlock<R>>> {
        self.entries
            .get(&BlockId::of(block))
            .and_then(|entry| entry.compiled.clone())
    }

    /// Profile of `block`, if the cache has seen it
    pub fn profile(&self, block: &Arc<Block>) -> Option<Arc<BlockProfile>> {
        self.entries
            .get(&BlockId::of(block))
            .map(|entry| Arc::clone(&entry.profile))
    }

    /// Count a run of a block the cache has seen
    pub fn record_run(&self, block: &Arc<Block>, native: bool) {
        if let Some(entry) = self.entries.get(&BlockId::of(block)) {
            entry.profile.record_run(native);
        }
    }

    pub fn state(&self, block: &Arc<Block>) -> CompileState {
        self.entries
            .get(&BlockId::of(block))
            .map_or(CompileState::Uncompiled, |entry| entry.profile.state())
    }

    pub fn is_compiled(&self, block: &Arc<Block>) -> bool {
        self.state(block) == CompileState::Compiled
    }

    pub fn is_failed(&self, block: &Arc<Block>) -> bool {
        self.state(block) == CompileState::Failed
    }

    /// Return the cached code for `block`, compiling it on a miss
    ///
    /// `compile` runs at most once per block. A failure is not cached as
    /// code; the block is marked failed and later calls return
    /// `NotCompilable` without compiling again.
    pub fn get_or_compile<F>(
        &self,
        block: &Arc<Block>,
        compile: F,
    ) -> JitResult<Arc<CompiledBlock<R>>>
    where
        F: FnOnce(&Block) -> JitResult<CompiledBlock<R>>,
    {
        let id = BlockId::of(block);
        if let Some(compiled) = self.entries.get(&id).and_then(|e| e.compiled.clone()) {
            return Ok(compiled);
        }

        let mut entry = match self.entries.entry(id) {
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => vacant.insert(CacheEntry::new(block)),
        };

        if let Some(compiled) = &entry.compiled {
            return Ok(Arc::clone(compiled));
        }
        if !entry.profile.try_start_compiling() {
            return Err(JitError::NotCompilable(format!(
                "block '{}' previously failed to compile",
                block.name()
            )));
        }

        match compile(block) {
            Ok(compiled) => {
                let compiled = Arc::new(compiled);
                entry.compiled = Some(Arc::clone(&compiled));
                entry.profile.set_compiled();
                debug!(
                    target: "dspjit::jit::tiered",
                    block = block.name(),
                    block_id = id.as_usize(),
                    "Cached compiled block"
                );
                Ok(compiled)
            }
            Err(e) => {
                entry.profile.set_failed();
                warn!(
                    target: "dspjit::jit::tiered",
                    block = block.name(),
                    error = %e,
                    "Block compilation failed"
                );
                Err(e)
            }
        }
    }

    /// Number of blocks with cached native code
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.compiled.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and the code memory it owns
    ///
    /// Callers holding an `Arc<CompiledBlock>` keep that block alive.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<R> CacheEntry<R> {
    fn new(block: &Arc<Block>) -> Self {
        CacheEntry {
            block: Arc::clone(block),
            profile: Arc::new(BlockProfile::new()),
            compiled: None,
        }
    }
}

impl<R> Default for BlockCache<R> {
    fn default() -> Self {
        BlockCache::new()
    }
}

impl<R> std::fmt::Debug for BlockCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let blocks: Vec<String> = self.entries.iter().map(|e| e.block.name().to_string()).collect();
        f.debug_struct("BlockCache").field("blocks", &blocks).finish()
    }
}

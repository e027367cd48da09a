//! Content-addressed cache of immutable programs.
//!
//! Every distinct byte sequence is represented by exactly one [`Program`] while it stays cached.
//! The jump-destination bitmap is built once, before the program is published. Programs evicted
//! from the cache that nobody references anymore are recycled into a bounded free list and reused
//! as construction scratch for the next miss.

use std::{
    collections::VecDeque,
    hash::Hasher,
    sync::{Arc, Mutex, OnceLock, RwLock},
};

use bitvec::vec::BitVec;
use ethereum_types::H256;
use lazy_static::lazy_static;
use rustc_hash::{FxHashMap, FxHasher};
use tracing::trace;

use crate::{opcodes::Opcode, utils::keccak};

/// Programs kept cached by the process-wide cache.
pub const DEFAULT_CODE_CACHE_CAPACITY: usize = 4096;

/// Upper bound on recycled wrappers waiting for reuse.
const MAX_FREE_PROGRAMS: usize = 64;

lazy_static! {
    /// Process-wide cache shared by every VM that is not given its own.
    pub static ref CODE_CACHE: Arc<BytecodeCache> =
        Arc::new(BytecodeCache::with_capacity(DEFAULT_CODE_CACHE_CAPACITY));
}

/// Immutable bytecode plus its precomputed jump-destination bitmap.
#[derive(Debug, Default)]
pub struct Program {
    code: Vec<u8>,
    jump_targets: BitVec,
    content_hash: u64,
    code_hash: OnceLock<H256>,
}

impl Program {
    /// Builds a standalone program that is not interned anywhere.
    pub fn new(code: &[u8]) -> Self {
        let mut program = Self::default();
        program.populate(code, content_hash(code));
        program
    }

    /// Refills this wrapper with `code`, reusing its allocations.
    fn populate(&mut self, code: &[u8], hash: u64) {
        self.code.clear();
        self.code.extend_from_slice(code);
        compute_jump_targets(&self.code, &mut self.jump_targets);
        self.content_hash = hash;
        self.code_hash = OnceLock::new();
    }

    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Opcode at `pc`; reading past the end yields STOP.
    #[inline(always)]
    pub fn opcode_at(&self, pc: usize) -> u8 {
        self.code.get(pc).copied().unwrap_or(u8::from(Opcode::STOP))
    }

    /// Whether `offset` is a JUMPDEST outside of any push immediate.
    #[inline]
    pub fn jump_valid(&self, offset: usize) -> bool {
        self.jump_targets.get(offset).is_some_and(|bit| *bit)
    }

    /// Cheap non-cryptographic hash of the content.
    #[inline]
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    /// Keccak-256 of the code, computed on first use.
    pub fn code_hash(&self) -> H256 {
        *self.code_hash.get_or_init(|| keccak(&self.code))
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.content_hash == other.content_hash && self.code == other.code
    }
}

impl Eq for Program {}

fn content_hash(code: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(code);
    hasher.finish()
}

/// Number of immediate bytes following `opcode`.
#[inline]
pub fn push_size(opcode: u8) -> usize {
    if (u8::from(Opcode::PUSH1)..=u8::from(Opcode::PUSH32)).contains(&opcode) {
        usize::from(opcode.wrapping_sub(u8::from(Opcode::PUSH0)))
    } else {
        0
    }
}

fn compute_jump_targets(code: &[u8], targets: &mut BitVec) {
    targets.clear();
    targets.resize(code.len(), false);
    let mut pc = 0usize;
    while let Some(&opcode) = code.get(pc) {
        if opcode == u8::from(Opcode::JUMPDEST) {
            targets.set(pc, true);
        }
        pc = pc.saturating_add(1).saturating_add(push_size(opcode));
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    /// Content hash to every cached program with that hash.
    entries: FxHashMap<u64, Vec<Arc<Program>>>,
    insertion_order: VecDeque<Arc<Program>>,
}

impl CacheInner {
    fn find(&self, hash: u64, code: &[u8]) -> Option<Arc<Program>> {
        self.entries
            .get(&hash)?
            .iter()
            .find(|program| program.code() == code)
            .cloned()
    }

    fn remove(&mut self, program: &Arc<Program>) {
        let hash = program.content_hash();
        if let Some(bucket) = self.entries.get_mut(&hash) {
            bucket.retain(|cached| !Arc::ptr_eq(cached, program));
            if bucket.is_empty() {
                self.entries.remove(&hash);
            }
        }
    }
}

/// Thread-safe content-keyed program cache with FIFO eviction.
#[derive(Debug)]
pub struct BytecodeCache {
    inner: RwLock<CacheInner>,
    free: Mutex<Vec<Program>>,
    capacity: usize,
}

impl Default for BytecodeCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CODE_CACHE_CAPACITY)
    }
}

impl BytecodeCache {
    /// A cache holding at most `capacity` programs; zero means unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            free: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Returns the cached program for `code`, building and publishing it on a miss.
    ///
    /// Equal content always resolves to the same instance. The copy and the jump scan run
    /// outside any lock; if another thread publishes the same content first, its program wins
    /// and ours is recycled.
    pub fn make(&self, code: &[u8]) -> Arc<Program> {
        let hash = content_hash(code);

        if let Some(hit) = self.lookup(hash, code) {
            trace!(hash, len = code.len(), "bytecode cache hit");
            return hit;
        }

        let mut program = self.take_free();
        program.populate(code, hash);
        let program = Arc::new(program);

        let mut evicted = Vec::new();
        let winner = {
            #[expect(clippy::unwrap_used, reason = "RwLock poisoning is unrecoverable")]
            let mut inner = self.inner.write().unwrap();
            if let Some(existing) = inner.find(hash, code) {
                Some(existing)
            } else {
                while self.capacity > 0 && inner.insertion_order.len() >= self.capacity {
                    let Some(oldest) = inner.insertion_order.pop_front() else {
                        break;
                    };
                    inner.remove(&oldest);
                    evicted.push(oldest);
                }
                inner
                    .entries
                    .entry(hash)
                    .or_default()
                    .push(Arc::clone(&program));
                inner.insertion_order.push_back(Arc::clone(&program));
                None
            }
        };

        for old in evicted {
            self.recycle(old);
        }

        match winner {
            Some(existing) => {
                trace!(hash, "bytecode cache race lost, recycling");
                self.recycle(program);
                existing
            }
            None => {
                trace!(hash, len = code.len(), "bytecode cache miss");
                program
            }
        }
    }

    fn lookup(&self, hash: u64, code: &[u8]) -> Option<Arc<Program>> {
        #[expect(clippy::unwrap_used, reason = "RwLock poisoning is unrecoverable")]
        let inner = self.inner.read().unwrap();
        inner.find(hash, code)
    }

    fn take_free(&self) -> Program {
        #[expect(clippy::unwrap_used, reason = "Mutex poisoning is unrecoverable")]
        let mut free = self.free.lock().unwrap();
        free.pop().unwrap_or_default()
    }

    /// Returns `program` to the free list if nothing else references it.
    fn recycle(&self, program: Arc<Program>) {
        let Ok(program) = Arc::try_unwrap(program) else {
            return;
        };
        #[expect(clippy::unwrap_used, reason = "Mutex poisoning is unrecoverable")]
        let mut free = self.free.lock().unwrap();
        if free.len() < MAX_FREE_PROGRAMS {
            free.push(program);
        }
    }

    /// Number of cached programs.
    pub fn len(&self) -> usize {
        #[expect(clippy::unwrap_used, reason = "RwLock poisoning is unrecoverable")]
        let inner = self.inner.read().unwrap();
        inner.insertion_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of recycled wrappers waiting for reuse.
    pub fn free_len(&self) -> usize {
        #[expect(clippy::unwrap_used, reason = "Mutex poisoning is unrecoverable")]
        let free = self.free.lock().unwrap();
        free.len()
    }

    /// Drops every cached program.
    pub fn clear(&self) {
        let drained: Vec<Arc<Program>> = {
            #[expect(clippy::unwrap_used, reason = "RwLock poisoning is unrecoverable")]
            let mut inner = self.inner.write().unwrap();
            inner.entries.clear();
            inner.insertion_order.drain(..).collect()
        };
        for program in drained {
            self.recycle(program);
        }
    }
}

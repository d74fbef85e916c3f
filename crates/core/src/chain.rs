//! Chain nodes and the append-only composition of chains.
//!
//! A chain is a singly linked, acyclic list of decorations. The head is the
//! outermost wrapper: decorations declared D1, D2, D3 run as D1 around D2 around
//! D3 around the original operation. Appending always walks to the terminal
//! node, existing links are never rewritten.

use crate::arguments::DeclarationContext;
use crate::definition::{Behavior, DecoratorDefinition};
use crate::error::DecorateError;
use once_cell::sync::OnceCell;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

const FREE: u8 = 0;
const QUEUED: u8 = 1;
const BOUND: u8 = 2;

/// Where a node currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// instantiated, not part of any chain yet
    Free,
    /// waiting in a pending chain for the next method definition
    Queued,
    /// owned by the chain of a dispatch shim
    Bound,
}

impl Linkage {
    fn from_u8(raw: u8) -> Self {
        match raw {
            FREE => Linkage::Free,
            QUEUED => Linkage::Queued,
            _ => Linkage::Bound,
        }
    }
}

/// One application of a decorator definition.
pub struct ChainNode<V> {
    definition: Arc<DecoratorDefinition<V>>,
    context: DeclarationContext<V>,
    behavior: Behavior<V>,
    follows_definition: bool,
    next: OnceCell<Arc<ChainNode<V>>>,
    linkage: AtomicU8,
    has_predecessor: AtomicBool,
}

impl<V> ChainNode<V> {
    pub(crate) fn new(
        definition: Arc<DecoratorDefinition<V>>,
        context: DeclarationContext<V>,
        behavior: Behavior<V>,
        follows_definition: bool,
    ) -> Self {
        Self {
            definition,
            context,
            behavior,
            follows_definition,
            next: OnceCell::new(),
            linkage: AtomicU8::new(FREE),
            has_predecessor: AtomicBool::new(false),
        }
    }

    pub fn definition(&self) -> &Arc<DecoratorDefinition<V>> {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn context(&self) -> &DeclarationContext<V> {
        &self.context
    }

    pub fn next(&self) -> Option<&Arc<ChainNode<V>>> {
        self.next.get()
    }

    pub fn is_terminal(&self) -> bool {
        self.next.get().is_none()
    }

    /// True unless another node links to this one.
    pub fn is_head(&self) -> bool {
        !self.has_predecessor.load(Ordering::Acquire)
    }

    pub fn linkage(&self) -> Linkage {
        Linkage::from_u8(self.linkage.load(Ordering::Acquire))
    }

    /// The behavior to run for this node right now.
    ///
    /// Context-free nodes follow redefinitions of their definition, factory nodes
    /// keep what their factory produced.
    pub(crate) fn behavior(&self) -> Behavior<V> {
        if self.follows_definition
            && let Some(behavior) = self.definition.fixed_behavior()
        {
            return behavior;
        }
        Arc::clone(&self.behavior)
    }

    /// Iterate from this node to the terminal node.
    pub fn iter(&self) -> ChainIter<'_, V> {
        ChainIter { cursor: Some(self) }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Names of the decorators from this node to the end, outermost first.
    pub fn names(&self) -> Vec<String> {
        self.iter().map(|node| node.name().to_owned()).collect()
    }

    pub(crate) fn mark_queued(&self) {
        self.linkage.store(QUEUED, Ordering::Release);
    }

    /// Move every node of a queued chain to bound.
    pub(crate) fn mark_bound(&self) {
        for node in self.iter() {
            node.linkage.store(BOUND, Ordering::Release);
        }
    }

    /// Claim every node of a free chain, all or nothing.
    pub(crate) fn claim_free(&self) -> Result<(), DecorateError> {
        if !self.is_head() {
            return Err(DecorateError::already_linked(self.name()));
        }

        let mut claimed: Vec<&ChainNode<V>> = Vec::new();
        for node in self.iter() {
            if node.linkage.compare_exchange(FREE, BOUND, Ordering::AcqRel, Ordering::Acquire).is_err() {
                for previous in claimed {
                    previous.linkage.store(FREE, Ordering::Release);
                }
                return Err(DecorateError::already_linked(node.name()));
            }
            claimed.push(node);
        }
        Ok(())
    }
}

impl<V> Debug for ChainNode<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainNode")
            .field("decorator", &self.definition.name())
            .field("linkage", &Linkage::from_u8(self.linkage.load(Ordering::Acquire)))
            .field("next", &self.next.get().map(|next| next.definition.name()))
            .finish_non_exhaustive()
    }
}

/// Walks a chain from a node to the terminal node.
#[derive(Debug)]
pub struct ChainIter<'a, V> {
    cursor: Option<&'a ChainNode<V>>,
}

impl<'a, V> Iterator for ChainIter<'a, V> {
    type Item = &'a ChainNode<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        self.cursor = current.next.get().map(Arc::as_ref);
        Some(current)
    }
}

/// Attach `node` after the terminal node of `head`.
///
/// With no head, `node` becomes the head. Returns the head of the combined chain.
/// Every node of `node`'s chain must be free, `node` must be the head of its own
/// chain and must not already be part of `head`, otherwise nothing is linked and
/// [`DecorateError::AlreadyLinked`] is returned.
pub fn append<V>(head: Option<Arc<ChainNode<V>>>, node: Arc<ChainNode<V>>) -> Result<Arc<ChainNode<V>>, DecorateError> {
    if let Some(taken) = node.iter().find(|taken| taken.linkage() != Linkage::Free) {
        return Err(DecorateError::already_linked(taken.name()));
    }
    link(head, node)
}

/// [`append`] without the linkage check, for chains the injector moves between
/// its pending and bound states.
pub(crate) fn link<V>(head: Option<Arc<ChainNode<V>>>, node: Arc<ChainNode<V>>) -> Result<Arc<ChainNode<V>>, DecorateError> {
    let Some(head) = head else {
        if !node.is_head() {
            return Err(DecorateError::already_linked(node.name()));
        }
        return Ok(node);
    };

    let mut cursor = Arc::clone(&head);
    while let Some(next) = cursor.next.get().map(Arc::clone) {
        cursor = next;
    }

    if node.has_predecessor.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
        return Err(DecorateError::already_linked(node.name()));
    }

    let mut node = node;
    loop {
        // linking the terminal node to a chain that reaches it would close a cycle
        if node.iter().any(|member| std::ptr::eq(member, Arc::as_ptr(&cursor))) {
            node.has_predecessor.store(false, Ordering::Release);
            return Err(DecorateError::already_linked(node.name()));
        }

        match cursor.next.set(node) {
            Ok(()) => return Ok(head),
            Err(rejected) => {
                // lost a race against another append, walk to the new terminal node
                node = rejected;
                while let Some(next) = cursor.next.get().map(Arc::clone) {
                    cursor = next;
                }
            }
        }
    }
}

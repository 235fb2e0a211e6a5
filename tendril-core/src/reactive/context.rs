//! Reactive Context
//!
//! The reactive context records which effect is currently collecting
//! dependencies and which owner newly created nodes belong to.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Running an effect, entering an
//! owner scope or calling [`untrack`] pushes a frame; the guard returned by
//! [`ReactiveContext::enter`] pops it when dropped, including when the code
//! in between panics. Nested evaluations therefore never clobber the
//! enclosing one's dependency collection.

use std::cell::RefCell;

use crate::graph::{EffectId, OwnerId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextFrame>> = const { RefCell::new(Vec::new()) };
}

/// One level of the reactive context stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextFrame {
    /// The effect that signal reads subscribe, if any.
    pub effect: Option<EffectId>,

    /// The owner that new signals and effects attach to, if any.
    pub owner: Option<OwnerId>,
}

/// Guard that pops its frame when dropped.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ReactiveContext {
    frame: ContextFrame,
    depth: usize,
}

impl ReactiveContext {
    /// Push `frame` onto the context stack.
    pub fn enter(frame: ContextFrame) -> Self {
        let depth = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(frame);
            stack.len()
        });
        Self { frame, depth }
    }

    /// Enter a frame that keeps the current owner but tracks `effect`.
    pub fn tracking(effect: Option<EffectId>) -> Self {
        let current = Self::current();
        Self::enter(ContextFrame {
            effect,
            owner: current.owner,
        })
    }

    /// Enter a frame that keeps the current tracking effect but installs
    /// `owner`.
    pub fn owned_by(owner: Option<OwnerId>) -> Self {
        let current = Self::current();
        Self::enter(ContextFrame {
            effect: current.effect,
            owner,
        })
    }

    /// The innermost frame, or an empty one outside of any context.
    pub fn current() -> ContextFrame {
        CONTEXT_STACK.with(|stack| stack.borrow().last().copied().unwrap_or_default())
    }

    /// The effect currently collecting dependencies.
    pub fn current_effect() -> Option<EffectId> {
        Self::current().effect
    }

    /// The owner new nodes attach to.
    pub fn current_owner() -> Option<OwnerId> {
        Self::current().owner
    }

    /// Whether a signal read right now would be tracked.
    pub fn is_tracking() -> bool {
        Self::current_effect().is_some()
    }

    /// Number of frames on the stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        // The stack is gone during thread teardown.
        let _ = CONTEXT_STACK.try_with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(
                stack.len(),
                self.depth,
                "ReactiveContext guards dropped out of order"
            );
            let popped = stack.pop();
            debug_assert_eq!(
                popped,
                Some(self.frame),
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.frame,
                popped
            );
        });
    }
}

/// Run `f` without collecting dependencies.
///
/// Signals read inside `f` do not subscribe the enclosing effect. The ambient
/// owner is kept.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::tracking(None);
    f()
}

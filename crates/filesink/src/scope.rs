// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging scopes.
//!
//! A scope is a piece of ambient context ("request 42", "job nightly")
//! attached to every record written while it is active.

use std::cell::RefCell;

/// Source of the scopes active on the calling thread.
pub trait ScopeLookup: Send + Sync {
    /// Visit active scopes, outermost first.
    fn for_each_scope(&self, visit: &mut dyn FnMut(&str));

    /// Collect active scopes, outermost first.
    fn collect(&self) -> Vec<String> {
        let mut scopes = Vec::new();
        self.for_each_scope(&mut |scope| scopes.push(scope.to_string()));
        scopes
    }
}

/// Lookup that never has any scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScopes;

impl ScopeLookup for NoScopes {
    fn for_each_scope(&self, _visit: &mut dyn FnMut(&str)) {}
}

thread_local! {
    static SCOPES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Thread-local scope stack.
///
/// ```rust,ignore
/// let _request = ScopeStack::push(format!("request {}", id));
/// logger.log(&record); // carries "=> request 42"
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopeStack;

impl ScopeStack {
    /// Push a scope; it stays active until the guard drops.
    #[must_use = "the scope is popped when the guard is dropped"]
    pub fn push(scope: impl Into<String>) -> ScopeGuard {
        let depth = SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            scopes.push(scope.into());
            scopes.len()
        });
        ScopeGuard {
            depth,
            _not_send: std::marker::PhantomData,
        }
    }

    /// Number of scopes active on this thread.
    pub fn depth() -> usize {
        SCOPES.with(|scopes| scopes.borrow().len())
    }
}

impl ScopeLookup for ScopeStack {
    fn for_each_scope(&self, visit: &mut dyn FnMut(&str)) {
        SCOPES.with(|scopes| {
            for scope in scopes.borrow().iter() {
                visit(scope);
            }
        });
    }
}

/// Pops its scope (and anything pushed after it) on drop.
#[derive(Debug)]
pub struct ScopeGuard {
    depth: usize,
    // Guards must drop on the thread that pushed them.
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPES.with(|scopes| scopes.borrow_mut().truncate(self.depth - 1));
    }
}

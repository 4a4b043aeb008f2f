//! # Recursion Guard
//!
//! Per-execution stack of active contracts. A contract may appear at most
//! once, so direct and indirect self-calls fail instead of recursing.
//! Callers push only names that resolve to a registered contract.

use crate::errors::RuntimeError;

/// Call stack scoped to one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<String>,
}

impl CallStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters `name`.
    ///
    /// # Errors
    ///
    /// `ContractLoop` when `name` is already on the stack.
    pub fn push(&mut self, name: &str) -> Result<(), RuntimeError> {
        if self.contains(name) {
            return Err(RuntimeError::ContractLoop(name.to_string()));
        }
        self.frames.push(name.to_string());
        Ok(())
    }

    /// Leaves the most recent frame if it belongs to `name`.
    pub fn pop(&mut self, name: &str) -> bool {
        if self.frames.last().is_some_and(|top| top == name) {
            self.frames.pop();
            return true;
        }
        false
    }

    /// Returns true if `name` is active.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame == name)
    }

    /// Current depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Active names, outermost first.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.frames
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_loop_detected() {
        let mut stack = CallStack::new();
        stack.push("@1A").unwrap();
        let err = stack.push("@1A").unwrap_err();
        assert_eq!(err, RuntimeError::ContractLoop("@1A".into()));
    }

    #[test]
    fn test_indirect_loop_detected() {
        let mut stack = CallStack::new();
        stack.push("@1A").unwrap();
        stack.push("@1B").unwrap();
        assert!(stack.push("@1A").is_err());
        assert_eq!(stack.names(), ["@1A", "@1B"]);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_pop_allows_reentry() {
        let mut stack = CallStack::new();
        stack.push("@1A").unwrap();
        assert!(!stack.pop("@1B"));
        assert!(stack.pop("@1A"));
        assert!(!stack.pop("@1A"));
        assert!(stack.push("@1A").is_ok());
    }
}

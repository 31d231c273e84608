//! Label and macro symbol tables.
//!
//! Labels live in one map keyed by fully-qualified name. A main label is
//! keyed by its bare name and becomes the scope for the sublabels that
//! follow it, keyed `main/sub`. Labels keep a by-name back-reference to
//! the scope they were declared under so reference counts bubble upward;
//! the back-reference is never followed for address resolution.
//!
//! Macros are saved scanner cursors pointing at the first byte of their
//! body. The layout pass records them; the emit pass jumps into them.

use std::collections::HashMap;

use crate::diagnostics::DiagnosticKind;
use crate::scanner::Cursor;

/// A declared label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Address fixed at declaration time.
    pub address: u16,
    /// Number of references resolved against this label.
    pub usage_count: u32,
    /// Key of the main label in scope at declaration time.
    pub parent: Option<String>,
}

/// A recorded macro body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Macro {
    /// Cursor at the first byte after the opening `{`.
    pub body: Cursor,
}

/// Labels and macros discovered by the layout pass.
#[derive(Debug, Default)]
pub struct SymbolTable {
    labels: HashMap<String, Label>,
    macros: HashMap<String, Macro>,
    last_main: Option<String>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Qualifies `name` against the main label currently in scope.
    #[must_use]
    pub fn resolve_label_name(&self, name: &str) -> String {
        match &self.last_main {
            Some(main) => format!("{main}/{name}"),
            None => name.to_string(),
        }
    }

    /// Declares a label at `address`.
    ///
    /// A main label is keyed by its bare name and becomes the new scope; a
    /// sublabel is keyed by its qualified name. Either way the label's
    /// parent is the scope that was current when it was declared.
    ///
    /// # Errors
    ///
    /// `DuplicateLabel` when the key is already taken.
    pub fn add_label(
        &mut self,
        name: &str,
        is_sub: bool,
        address: u16,
    ) -> Result<(), DiagnosticKind> {
        let key = if is_sub {
            self.resolve_label_name(name)
        } else {
            name.to_string()
        };
        if self.labels.contains_key(&key) {
            return Err(DiagnosticKind::DuplicateLabel(key));
        }
        self.labels.insert(
            key,
            Label {
                address,
                usage_count: 0,
                parent: self.last_main.clone(),
            },
        );
        if !is_sub {
            self.last_main = Some(name.to_string());
        }
        Ok(())
    }

    /// Resolves a reference to an address, bumping usage counts.
    ///
    /// A written-out sublabel form (`&sub`) drops its sigil first. The bare
    /// name is tried directly, then qualified against the current scope. A
    /// hit bumps the label's usage count and its parent's.
    ///
    /// # Errors
    ///
    /// `UndefinedLabel` when neither form is declared.
    pub fn get_label_addr(&mut self, name: &str) -> Result<u16, DiagnosticKind> {
        let bare = name.strip_prefix('&').unwrap_or(name);
        let key = if self.labels.contains_key(bare) {
            bare.to_string()
        } else {
            let scoped = self.resolve_label_name(bare);
            if !self.labels.contains_key(&scoped) {
                return Err(DiagnosticKind::UndefinedLabel(bare.to_string()));
            }
            scoped
        };
        let (address, parent) = {
            let label = self
                .labels
                .get_mut(&key)
                .ok_or_else(|| DiagnosticKind::UndefinedLabel(bare.to_string()))?;
            label.usage_count += 1;
            (label.address, label.parent.clone())
        };
        if let Some(parent_key) = parent {
            if let Some(parent_label) = self.labels.get_mut(&parent_key) {
                parent_label.usage_count += 1;
            }
        }
        Ok(address)
    }

    /// True when `name` resolves directly or against the current scope.
    #[must_use]
    pub fn label_exists(&self, name: &str) -> bool {
        let bare = name.strip_prefix('&').unwrap_or(name);
        self.labels.contains_key(bare) || self.labels.contains_key(&self.resolve_label_name(bare))
    }

    /// Looks up a label by fully-qualified key.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&Label> {
        self.labels.get(key)
    }

    /// Number of declared labels.
    #[must_use]
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Makes `name` the scope for subsequent sublabel resolution.
    ///
    /// The emit pass calls this when it walks past a main-label declaration,
    /// keeping reference resolution in step with the text.
    pub fn set_scope(&mut self, name: &str) {
        self.last_main = Some(name.to_string());
    }

    /// Clears the scope, as at the start of a pass.
    pub fn reset_scope(&mut self) {
        self.last_main = None;
    }

    /// Records a macro body, silently replacing any prior definition.
    pub fn add_macro(&mut self, name: &str, body: Cursor) {
        self.macros.insert(name.to_string(), Macro { body });
    }

    /// Looks up a macro by name.
    #[must_use]
    pub fn get_macro(&self, name: &str) -> Option<Macro> {
        self.macros.get(name).copied()
    }

    /// Number of recorded macros.
    #[must_use]
    pub fn macro_count(&self) -> usize {
        self.macros.len()
    }
}

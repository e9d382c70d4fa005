//! # Command Registry
//!
//! Pure dispatch table from command names to closures. The registry never
//! interprets a command: it looks the name up and hands the surface to
//! whatever was registered.
//!
//! ```rust,ignore
//! let mut registry = CommandRegistry::<MemorySurface>::new();
//! registry.register_defaults();
//!
//! registry.execute("bold", &mut surface, &[])?;
//! assert!(registry.query_state("bold", &surface));
//! ```

use crate::table::{create_table, MAX_NEW_TABLE_DIMENSION};
use crate::EditorError;
use resume_dom::RenderingSurface;
use std::collections::BTreeMap;
use tracing::debug;

pub type ExecuteFn<S> = Box<dyn Fn(&mut S, &[&str])>;
pub type StateQueryFn<S> = Box<dyn Fn(&S) -> bool>;
pub type ValueQueryFn<S> = Box<dyn Fn(&S) -> String>;

/// Toggle formats: state query reports whether the format is active
const TOGGLE_COMMANDS: &[&str] = &[
    "bold",
    "italic",
    "underline",
    "strikeThrough",
    "subscript",
    "superscript",
    "justifyLeft",
    "justifyCenter",
    "justifyRight",
    "justifyFull",
    "insertOrderedList",
    "insertUnorderedList",
];

/// Valued formats: take one argument, value query reports the current value
const VALUE_COMMANDS: &[&str] = &["fontName", "fontSize", "foreColor", "hiliteColor", "createLink"];

/// Plain actions with neither state nor value
const ACTION_COMMANDS: &[&str] = &["unlink", "indent", "outdent", "removeFormat", "insertText", "delete"];

/// A registered command
pub struct Command<S> {
    pub name: String,
    execute: ExecuteFn<S>,
    state_query: Option<StateQueryFn<S>>,
    value_query: Option<ValueQueryFn<S>>,
}

impl<S> Command<S> {
    pub fn new(name: impl Into<String>, execute: impl Fn(&mut S, &[&str]) + 'static) -> Self {
        Self {
            name: name.into(),
            execute: Box::new(execute),
            state_query: None,
            value_query: None,
        }
    }

    pub fn with_state(mut self, query: impl Fn(&S) -> bool + 'static) -> Self {
        self.state_query = Some(Box::new(query));
        self
    }

    pub fn with_value(mut self, query: impl Fn(&S) -> String + 'static) -> Self {
        self.value_query = Some(Box::new(query));
        self
    }
}

impl<S> std::fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("state_query", &self.state_query.is_some())
            .field("value_query", &self.value_query.is_some())
            .finish()
    }
}

/// Name → command dispatch table for one editing session
pub struct CommandRegistry<S> {
    commands: BTreeMap<String, Command<S>>,
}

impl<S> CommandRegistry<S> {
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// Register a command, replacing any command of the same name
    pub fn register(&mut self, command: Command<S>) {
        if self.commands.contains_key(&command.name) {
            debug!(command = %command.name, "Replacing registered command");
        }
        self.commands.insert(command.name.clone(), command);
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.commands.remove(name).is_some()
    }

    pub fn has(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted
    pub fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Run a command against `surface`
    pub fn execute(&self, name: &str, surface: &mut S, args: &[&str]) -> Result<(), EditorError> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| EditorError::CommandNotFound(name.to_string()))?;
        debug!(command = name, args = ?args, "Executing command");
        (command.execute)(surface, args);
        Ok(())
    }

    /// `true` for registered commands without a state query; `false` for unknown names
    pub fn query_state(&self, name: &str, surface: &S) -> bool {
        match self.commands.get(name) {
            Some(Command {
                state_query: Some(query),
                ..
            }) => query(surface),
            Some(_) => true,
            None => false,
        }
    }

    /// Current value, or empty when unknown or valueless
    pub fn query_value(&self, name: &str, surface: &S) -> String {
        match self.commands.get(name) {
            Some(Command {
                value_query: Some(query),
                ..
            }) => query(surface),
            _ => String::new(),
        }
    }
}

impl<S: RenderingSurface + 'static> CommandRegistry<S> {
    /// Register the standard formatting vocabulary, each forwarding to the surface's native command
    pub fn register_defaults(&mut self) {
        for name in TOGGLE_COMMANDS {
            self.register(
                Command::new(*name, move |surface: &mut S, _args: &[&str]| {
                    surface.exec_native(name, None);
                })
                .with_state(move |surface: &S| surface.query_native_state(name)),
            );
        }

        for name in VALUE_COMMANDS {
            let mut command = Command::new(*name, move |surface: &mut S, args: &[&str]| {
                surface.exec_native(name, args.first().copied());
            })
            .with_value(move |surface: &S| surface.query_native_value(name));
            if *name == "createLink" {
                command = command.with_state(|surface: &S| surface.query_native_state("createLink"));
            }
            self.register(command);
        }

        for name in ACTION_COMMANDS {
            self.register(Command::new(*name, move |surface: &mut S, args: &[&str]| {
                surface.exec_native(name, args.first().copied());
            }));
        }

        self.register(Command::new("insertTable", insert_table::<S>));
    }
}

impl<S> Default for CommandRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// `insertTable [rows] [cols]`: new table after the block holding the selection.
/// Dimensions are capped at `MAX_NEW_TABLE_DIMENSION`.
fn insert_table<S: RenderingSurface>(surface: &mut S, args: &[&str]) {
    let dimension = |arg: Option<&&str>| {
        arg.and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(2)
            .clamp(1, MAX_NEW_TABLE_DIMENSION)
    };
    let rows = dimension(args.first());
    let cols = dimension(args.get(1));

    let anchor = surface.selection().map(|r| r.start.node);
    let doc = surface.document_mut();
    let root = doc.root();

    // Top-level block containing the selection, if any
    let mut block = anchor.filter(|n| doc.is_attached(*n) && *n != root);
    while let Some(node) = block {
        if doc.parent(node) == Some(root) {
            break;
        }
        block = doc.parent(node);
    }

    let table = create_table(doc, root, rows, cols);
    if let Some(block) = block {
        doc.insert_after(block, table);
    }
}

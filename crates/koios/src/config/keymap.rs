//! Key names and the key-to-operation dispatch table.

use std::collections::HashMap;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use super::schema::KeyConfig;
use crate::error::Error;
use crate::operation::{Operation, OperationRegistry};

/// Built-in bindings, applied before any configuration.
const DEFAULT_BINDINGS: &[(&str, Operation)] = &[
    ("Ctrl+A", Operation::AddDb),
    ("Ctrl+D", Operation::DownloadResult),
    ("Tab", Operation::GotoQueryInput),
    ("Ctrl+N", Operation::NextQueryTab),
    ("Ctrl+Q", Operation::Quit),
    ("Ctrl+P", Operation::PrevQueryTab),
    ("Ctrl+R", Operation::GotoResult),
    ("Ctrl+S", Operation::SetCurrentDb),
    ("Ctrl+T", Operation::GotoTree),
    ("Ctrl+X", Operation::CloseTab),
    ("Ctrl+Y", Operation::CloseDb),
    ("Ctrl+Space", Operation::ExecQuery),
    ("Rune[?]", Operation::ShowHelp),
];

/// A key press (key + modifiers), named like `Ctrl+S`, `Tab` or `Rune[?]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Parse a key name such as "Ctrl+S", "ctrl+space", "Tab", "F5" or "Rune[?]".
    ///
    /// Named keys and modifiers are case-insensitive; the character inside `Rune[..]`
    /// keeps its case.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(c) = parse_rune(s) {
            return Some(Self::new(KeyCode::Char(c), KeyModifiers::NONE));
        }

        let (mods, key_part) = match s.rsplit_once('+') {
            Some((mods, key)) if !key.is_empty() => (mods, key),
            _ => ("", s),
        };

        let mut modifiers = KeyModifiers::NONE;
        for part in mods.split('+').filter(|p| !p.is_empty()) {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "alt" | "meta" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                _ => return None,
            }
        }

        let code = if let Some(c) = parse_rune(key_part) {
            KeyCode::Char(c)
        } else {
            match key_part.to_lowercase().as_str() {
                "enter" | "return" => KeyCode::Enter,
                "tab" => KeyCode::Tab,
                "backtab" => KeyCode::BackTab,
                "backspace" | "bs" => KeyCode::Backspace,
                "delete" | "del" => KeyCode::Delete,
                "esc" | "escape" => KeyCode::Esc,
                "space" => KeyCode::Char(' '),
                "up" => KeyCode::Up,
                "down" => KeyCode::Down,
                "left" => KeyCode::Left,
                "right" => KeyCode::Right,
                "home" => KeyCode::Home,
                "end" => KeyCode::End,
                "pgup" | "pageup" => KeyCode::PageUp,
                "pgdn" | "pagedown" => KeyCode::PageDown,
                "insert" | "ins" => KeyCode::Insert,
                f if f.len() > 1 && f.starts_with('f') => match f[1..].parse::<u8>() {
                    Ok(n) if (1..=12).contains(&n) => KeyCode::F(n),
                    _ => return None,
                },
                _ => {
                    let mut chars = key_part.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => KeyCode::Char(c),
                        _ => return None,
                    }
                }
            }
        };

        Some(Self::from(KeyEvent::new(code, modifiers)))
    }
}

fn parse_rune(s: &str) -> Option<char> {
    let inner = s.strip_prefix("Rune[")?.strip_suffix(']')?;
    let mut chars = inner.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();

        if self.modifiers.contains(KeyModifiers::CONTROL) {
            parts.push("Ctrl".to_string());
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            parts.push("Alt".to_string());
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            parts.push("Shift".to_string());
        }

        let ctrl = self.modifiers.contains(KeyModifiers::CONTROL);
        let key = match self.code {
            KeyCode::Enter => "Enter".to_string(),
            KeyCode::Tab => "Tab".to_string(),
            KeyCode::BackTab => "Backtab".to_string(),
            KeyCode::Backspace => "Backspace".to_string(),
            KeyCode::Delete => "Delete".to_string(),
            KeyCode::Esc => "Esc".to_string(),
            KeyCode::Up => "Up".to_string(),
            KeyCode::Down => "Down".to_string(),
            KeyCode::Left => "Left".to_string(),
            KeyCode::Right => "Right".to_string(),
            KeyCode::Home => "Home".to_string(),
            KeyCode::End => "End".to_string(),
            KeyCode::PageUp => "PgUp".to_string(),
            KeyCode::PageDown => "PgDn".to_string(),
            KeyCode::Insert => "Insert".to_string(),
            KeyCode::F(n) => format!("F{}", n),
            KeyCode::Char(' ') if ctrl => "Space".to_string(),
            KeyCode::Char(c) if ctrl => c.to_uppercase().to_string(),
            KeyCode::Char(c) => format!("Rune[{}]", c),
            _ => "?".to_string(),
        };

        parts.push(key);
        write!(f, "{}", parts.join("+"))
    }
}

impl From<KeyEvent> for KeyBinding {
    /// Drops modifiers that are already encoded in the character, so that `?` typed with
    /// Shift and `Rune[?]` from config compare equal.
    fn from(event: KeyEvent) -> Self {
        let mut modifiers =
            event.modifiers & (KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SHIFT);

        let code = match event.code {
            KeyCode::Char(c) if modifiers.contains(KeyModifiers::CONTROL) => {
                KeyCode::Char(c.to_ascii_lowercase())
            }
            KeyCode::Char(c) => {
                modifiers.remove(KeyModifiers::SHIFT);
                KeyCode::Char(c)
            }
            KeyCode::BackTab => {
                modifiers.remove(KeyModifiers::SHIFT);
                KeyCode::BackTab
            }
            other => other,
        };

        Self { code, modifiers }
    }
}

/// Canonical form of a key name, or the trimmed input when it cannot be parsed.
fn normalize(key: &str) -> String {
    KeyBinding::parse(key)
        .map(|binding| binding.to_string())
        .unwrap_or_else(|| key.trim().to_string())
}

/// Maps key names to operation names.
///
/// Bindings are not checked when added; call [`Keymap::validate`] once every binding is
/// in place.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<String, String>,
}

impl Keymap {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// The built-in bindings.
    pub fn with_defaults() -> Self {
        let mut km = Self::new();
        for (key, op) in DEFAULT_BINDINGS {
            km.bind(key, op.name());
        }
        km
    }

    /// Defaults overridden by the configured keys.
    pub fn from_config(keys: &[KeyConfig]) -> Self {
        let mut km = Self::with_defaults();
        km.apply(keys);
        km
    }

    /// Binds each configured key, replacing any existing binding for it.
    pub fn apply(&mut self, keys: &[KeyConfig]) {
        for entry in keys {
            if KeyBinding::parse(&entry.key).is_none() {
                warn!(key = %entry.key, "unrecognized key name; binding will never fire");
            }
            self.bind(&entry.key, &entry.operation);
        }
    }

    /// Add or replace a binding
    pub fn bind(&mut self, key: &str, operation: &str) {
        self.bindings.insert(normalize(key), operation.to_string());
    }

    /// Operation name bound to a key name
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.bindings.get(&normalize(key)).map(String::as_str)
    }

    /// Operation name bound to a key event
    pub fn resolve_event(&self, event: &KeyEvent) -> Option<&str> {
        let name = KeyBinding::from(*event).to_string();
        self.bindings.get(&name).map(String::as_str)
    }

    /// Key names bound to `operation`, sorted.
    pub fn keys_for(&self, operation: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .bindings
            .iter()
            .filter(|(_, op)| op.as_str() == operation)
            .map(|(key, _)| key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Every binding whose operation is not registered, sorted by key.
    pub fn unresolved(&self, operations: &OperationRegistry) -> Vec<Error> {
        let mut errors: Vec<Error> = self
            .bindings
            .iter()
            .filter(|(_, op)| !operations.contains(op))
            .map(|(key, op)| Error::UnknownOperation {
                key: key.clone(),
                operation: op.clone(),
            })
            .collect();
        errors.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        errors
    }

    /// Fails with the first unresolved binding (by key) if any operation is unknown.
    pub fn validate(&self, operations: &OperationRegistry) -> Result<(), Error> {
        match self.unresolved(operations).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> KeyBinding {
        KeyBinding::parse(s).unwrap()
    }

    #[test]
    fn test_parse_ctrl_key() {
        let kb = key("Ctrl+S");
        assert_eq!(kb.code, KeyCode::Char('s'));
        assert_eq!(kb.modifiers, KeyModifiers::CONTROL);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(key("CTRL+A"), key("ctrl+a"));
        assert_eq!(key("tab"), key("Tab"));
        assert_eq!(key("ctrl+space").to_string(), "Ctrl+Space");
    }

    #[test]
    fn test_parse_special_keys() {
        assert_eq!(key("Enter").code, KeyCode::Enter);
        assert_eq!(key("Esc").code, KeyCode::Esc);
        assert_eq!(key("F5").code, KeyCode::F(5));
        assert_eq!(key("PgUp").code, KeyCode::PageUp);
        assert_eq!(key("Backtab").code, KeyCode::BackTab);
        assert!(KeyBinding::parse("F13").is_none());
        assert!(KeyBinding::parse("Hyper+A").is_none());
        assert!(KeyBinding::parse("Ctrl+Nope").is_none());
    }

    #[test]
    fn test_parse_rune() {
        assert_eq!(key("Rune[?]"), KeyBinding::new(KeyCode::Char('?'), KeyModifiers::NONE));
        assert_eq!(key("Rune[Q]").code, KeyCode::Char('Q'));
        assert_eq!(key("Alt+Rune[x]").to_string(), "Alt+Rune[x]");
        assert!(KeyBinding::parse("Rune[ab]").is_none());
    }

    #[test]
    fn test_key_binding_display() {
        let kb = KeyBinding::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        assert_eq!(kb.to_string(), "Ctrl+S");

        let kb = KeyBinding::new(KeyCode::Char(' '), KeyModifiers::CONTROL);
        assert_eq!(kb.to_string(), "Ctrl+Space");

        let kb = KeyBinding::new(KeyCode::Char('?'), KeyModifiers::NONE);
        assert_eq!(kb.to_string(), "Rune[?]");

        let kb = KeyBinding::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(kb.to_string(), "Enter");
    }

    #[test]
    fn test_from_key_event_drops_shift_on_chars() {
        let ev = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert_eq!(KeyBinding::from(ev).to_string(), "Rune[?]");

        let ev = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        assert_eq!(KeyBinding::from(ev).to_string(), "Backtab");

        let ev = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        assert_eq!(KeyBinding::from(ev).to_string(), "Ctrl+Shift+A");
    }

    #[test]
    fn test_default_bindings() {
        let km = Keymap::with_defaults();
        assert_eq!(km.resolve("Ctrl+A"), Some("add-db"));
        assert_eq!(km.resolve("Tab"), Some("goto-queryinput"));
        assert_eq!(km.resolve("Rune[?]"), Some("show-help"));
        assert_eq!(km.resolve("Ctrl+Space"), Some("exec-query"));
        assert_eq!(km.resolve("Ctrl+Z"), None);
        assert!(km.validate(&OperationRegistry::new()).is_ok());
        assert_eq!(km.bindings.len(), DEFAULT_BINDINGS.len());
    }

    #[test]
    fn test_resolve_event() {
        let km = Keymap::with_defaults();
        let ev = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert_eq!(km.resolve_event(&ev), Some("quit"));

        let ev = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::CONTROL);
        assert_eq!(km.resolve_event(&ev), Some("exec-query"));

        let ev = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(km.resolve_event(&ev), None);
    }

    #[test]
    fn test_config_overrides_whole_key() {
        let km = Keymap::from_config(&[
            KeyConfig::new("ctrl+e", "exec-query"),
            KeyConfig::new("Ctrl+Q", "close-db"),
        ]);
        assert_eq!(km.resolve("Ctrl+E"), Some("exec-query"));
        // Default binding for the same operation is kept.
        assert_eq!(km.resolve("Ctrl+Space"), Some("exec-query"));
        assert_eq!(km.resolve("Ctrl+Q"), Some("close-db"));
        assert_eq!(km.keys_for("exec-query"), vec!["Ctrl+E", "Ctrl+Space"]);
    }

    #[test]
    fn test_last_binding_wins() {
        let mut km = Keymap::new();
        km.bind("Ctrl+E", "quit");
        km.bind("ctrl+e", "exec-query");
        assert_eq!(km.resolve("Ctrl+E"), Some("exec-query"));
        assert_eq!(km.bindings.len(), 1);
    }

    #[test]
    fn test_validate_rejects_unknown_operation() {
        let km = Keymap::from_config(&[KeyConfig::new("Ctrl+Z", "frobnicate")]);
        let err = km.validate(&OperationRegistry::new()).unwrap_err();
        assert_eq!(
            err,
            Error::UnknownOperation {
                key: "Ctrl+Z".to_string(),
                operation: "frobnicate".to_string()
            }
        );
    }

    #[test]
    fn test_validate_independent_of_binding_order() {
        let registry = OperationRegistry::with_operations([Operation::Quit, Operation::ExecQuery]);

        let mut forward = Keymap::new();
        forward.bind("Ctrl+Q", "quit");
        forward.bind("Ctrl+B", "bogus");
        forward.bind("Ctrl+E", "exec-query");

        let mut backward = Keymap::new();
        backward.bind("Ctrl+E", "exec-query");
        backward.bind("Ctrl+B", "bogus");
        backward.bind("Ctrl+Q", "quit");

        assert_eq!(
            forward.validate(&registry).unwrap_err(),
            backward.validate(&registry).unwrap_err()
        );

        forward.bind("Ctrl+B", "quit");
        assert!(forward.validate(&registry).is_ok());
    }

    #[test]
    fn test_validate_against_subset_registry() {
        let km = Keymap::with_defaults();
        let registry = OperationRegistry::with_operations([Operation::Quit]);
        let unresolved = km.unresolved(&registry);
        assert_eq!(unresolved.len(), DEFAULT_BINDINGS.len() - 1);
        assert!(km.validate(&registry).is_err());
    }
}

//! Command Codec
//!
//! Renders typed commands into the cluster's flat request template:
//!
//! ```text
//! {type:AddLun,category:VirtualDiskManagement,params:{virtualDisks:['d1'],targets:['ctrl-a']},sessionId:'...'}
//! ```
//!
//! The template has no escape syntax. String values are interpolated between
//! single quotes and symbols are interpolated bare, so any value carrying a
//! reserved character is refused when it is added to a [`Params`] set rather
//! than being mis-encoded on the wire.

use crate::cluster::session::SessionToken;
use crate::error::{Error, Result};
use std::fmt::Write;

/// Characters that terminate or restructure a template value
pub const RESERVED_CHARS: [char; 6] = ['\'', '{', '}', ',', '[', ']'];

// =============================================================================
// Operations
// =============================================================================

/// Command category understood by the REST endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    UserManagement,
    VirtualDiskManagement,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::UserManagement => "UserManagement",
            Category::VirtualDiskManagement => "VirtualDiskManagement",
        }
    }
}

/// Remote operations used by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    AddVirtualDisk,
    VirtualDiskDetails,
    ResizeDisks,
    DeleteVDisk,
    AddLun,
    UnmapLun,
    Mount,
    Unmount,
    ListExportedTargets,
    PersistACLAccess,
    GetACLInformation,
    RemoveACLAccess,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Login => "Login",
            Operation::AddVirtualDisk => "AddVirtualDisk",
            Operation::VirtualDiskDetails => "VirtualDiskDetails",
            Operation::ResizeDisks => "ResizeDisks",
            Operation::DeleteVDisk => "DeleteVDisk",
            Operation::AddLun => "AddLun",
            Operation::UnmapLun => "UnmapLun",
            Operation::Mount => "Mount",
            Operation::Unmount => "Unmount",
            Operation::ListExportedTargets => "ListExportedTargets",
            Operation::PersistACLAccess => "PersistACLAccess",
            Operation::GetACLInformation => "GetACLInformation",
            Operation::RemoveACLAccess => "RemoveACLAccess",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Operation::Login => Category::UserManagement,
            _ => Category::VirtualDiskManagement,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Values
// =============================================================================

/// A single template value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Quoted string: `'value'`
    Str(String),
    /// Bare enum-like token: `BLOCK`
    Symbol(String),
    Int(u64),
    Bool(bool),
    List(Vec<Value>),
    Object(Params),
}

impl Value {
    fn render(&self, out: &mut String) {
        match self {
            Value::Str(s) => {
                out.push('\'');
                out.push_str(s);
                out.push('\'');
            }
            Value::Symbol(s) => out.push_str(s),
            Value::Int(n) => {
                let _ = write!(out, "{}", n);
            }
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.render(out);
                }
                out.push(']');
            }
            Value::Object(params) => params.render(out),
        }
    }
}

/// Ordered parameter set; keys render in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(&'static str, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a quoted string value
    pub fn string(mut self, key: &'static str, value: &str) -> Result<Self> {
        check_string(key, value)?;
        self.entries.push((key, Value::Str(value.to_string())));
        Ok(self)
    }

    /// Add a bare symbol value
    pub fn symbol(mut self, key: &'static str, value: &str) -> Result<Self> {
        check_symbol(key, value)?;
        self.entries.push((key, Value::Symbol(value.to_string())));
        Ok(self)
    }

    /// Add a list of quoted strings
    pub fn strings<'a, I>(mut self, key: &'static str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut items = Vec::new();
        for value in values {
            check_string(key, value)?;
            items.push(Value::Str(value.to_string()));
        }
        self.entries.push((key, Value::List(items)));
        Ok(self)
    }

    pub fn int(mut self, key: &'static str, value: u64) -> Self {
        self.entries.push((key, Value::Int(value)));
        self
    }

    pub fn boolean(mut self, key: &'static str, value: bool) -> Self {
        self.entries.push((key, Value::Bool(value)));
        self
    }

    pub fn object(mut self, key: &'static str, value: Params) -> Self {
        self.entries.push((key, Value::Object(value)));
        self
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    fn render(&self, out: &mut String) {
        out.push('{');
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(key);
            out.push(':');
            value.render(out);
        }
        out.push('}');
    }
}

fn check_string(key: &str, value: &str) -> Result<()> {
    if let Some(c) = value.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(Error::UnencodableValue {
            field: key.to_string(),
            reason: format!("contains reserved character '{}'", c),
        });
    }
    if value.chars().any(char::is_control) {
        return Err(Error::UnencodableValue {
            field: key.to_string(),
            reason: "contains a control character".into(),
        });
    }
    Ok(())
}

fn check_symbol(key: &str, value: &str) -> Result<()> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::UnencodableValue {
            field: key.to_string(),
            reason: format!("'{}' is not a bare symbol", value),
        });
    }
    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

/// A typed remote request, ready to render
#[derive(Debug, Clone)]
pub struct Command {
    operation: Operation,
    params: Params,
    session: Option<SessionToken>,
}

impl Command {
    pub fn new(operation: Operation, params: Params) -> Self {
        Self {
            operation,
            params,
            session: None,
        }
    }

    /// Attach the session the command runs under
    pub fn with_session(mut self, session: &SessionToken) -> Self {
        self.session = Some(session.clone());
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Render the wire form carried in the `request` query parameter
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(128);
        out.push_str("{type:");
        out.push_str(self.operation.as_str());
        out.push_str(",category:");
        out.push_str(self.operation.category().as_str());
        out.push_str(",params:");
        self.params.render(&mut out);
        if let Some(session) = &self.session {
            out.push_str(",sessionId:'");
            out.push_str(session.expose());
            out.push('\'');
        }
        out.push('}');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_encode_add_lun() {
        let params = Params::new()
            .strings("virtualDisks", ["d1"])
            .unwrap()
            .strings("targets", ["ctrl-a"])
            .unwrap()
            .boolean("readonly", false);
        let session = SessionToken::new("abc123");
        let command = Command::new(Operation::AddLun, params).with_session(&session);

        assert_eq!(
            command.encode(),
            "{type:AddLun,category:VirtualDiskManagement,params:{virtualDisks:['d1'],targets:['ctrl-a'],readonly:false},sessionId:'abc123'}"
        );
    }

    #[test]
    fn test_encode_nested_object() {
        let size = Params::new().string("unit", "GB").unwrap().int("value", 9);
        let params = Params::new()
            .string("name", "d1")
            .unwrap()
            .object("size", size)
            .symbol("diskType", "BLOCK")
            .unwrap();
        let command = Command::new(Operation::AddVirtualDisk, params);

        assert_eq!(
            command.encode(),
            "{type:AddVirtualDisk,category:VirtualDiskManagement,params:{name:'d1',size:{unit:'GB',value:9},diskType:BLOCK}}"
        );
    }

    #[test]
    fn test_login_category() {
        let command = Command::new(Operation::Login, Params::new());
        assert!(command.encode().starts_with("{type:Login,category:UserManagement,"));
        assert!(!command.encode().contains("sessionId"));
    }

    #[test]
    fn test_reserved_characters_refused() {
        for bad in ["it's", "a{b", "a}b", "a,b", "[x]"] {
            let err = Params::new().string("description", bad).unwrap_err();
            assert_matches!(err, Error::UnencodableValue { ref field, .. } if field == "description");
        }

        assert_matches!(
            Params::new().strings("targets", ["ok", "not,ok"]),
            Err(Error::UnencodableValue { .. })
        );
    }

    #[test]
    fn test_colons_and_dots_allowed() {
        let params = Params::new()
            .string("address", "iqn.1994-05.com.redhat:host1")
            .unwrap()
            .string("host", "10.0.0.5")
            .unwrap();
        assert_eq!(
            params.get("address"),
            Some(&Value::Str("iqn.1994-05.com.redhat:host1".into()))
        );
    }

    #[test]
    fn test_symbol_must_be_bare() {
        assert_matches!(
            Params::new().symbol("diskType", "BLOCK disk"),
            Err(Error::UnencodableValue { .. })
        );
        assert!(Params::new().symbol("diskType", "NFS_MASTER_DISK").is_ok());
    }
}

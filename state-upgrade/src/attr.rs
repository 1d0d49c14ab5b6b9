//! Names of persisted attributes that upgrade steps report on.

/// A list-shaped attribute whose cardinality an upgrade step checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attr {
    Protocols,
    Tcp,
    Udp,
    Access,
    AccessGroup,
    AccessPolicy,
}

impl Attr {
    pub const fn name(self) -> &'static str {
        match self {
            Attr::Protocols => "protocols",
            Attr::Tcp => "tcp",
            Attr::Udp => "udp",
            Attr::Access => "access",
            Attr::AccessGroup => "access_group",
            Attr::AccessPolicy => "access_policy",
        }
    }

    /// Dotted path of a nested attribute, e.g. `access_group.access_policy`.
    pub fn nested(self, child: Attr) -> String {
        format!("{}.{}", self.name(), child.name())
    }
}

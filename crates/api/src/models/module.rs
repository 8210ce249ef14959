use serde::{Deserialize, Serialize};
use std::fmt;

/// A `module-info` declaration, from source or from a `Module` attribute.
///
/// Package and type names are dotted (`com.acme.api`, `com.acme.spi.Codec`)
/// whichever front produced the record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleInfo {
    pub name: String,
    pub open: bool,
    pub requires: Vec<Requires>,
    pub exports: Vec<PackageGrant>,
    pub opens: Vec<PackageGrant>,
    pub uses: Vec<String>,
    pub provides: Vec<Provides>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Requires {
    pub module: String,
    pub transitive: bool,
    #[serde(rename = "static")]
    pub is_static: bool,
}

/// An `exports` or `opens` directive; `to` is empty when unqualified.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PackageGrant {
    pub package: String,
    pub to: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Provides {
    pub service: String,
    pub with: Vec<String>,
}

impl ModuleInfo {
    /// Whether `package` is visible to `module`, through `exports`.
    pub fn exports_to(&self, package: &str, module: &str) -> bool {
        self.exports
            .iter()
            .any(|e| e.package == package && (e.to.is_empty() || e.to.iter().any(|m| m == module)))
    }

    pub fn requires(&self, module: &str) -> Option<&Requires> {
        self.requires.iter().find(|r| r.module == module)
    }
}

fn grant(f: &mut fmt::Formatter<'_>, keyword: &str, g: &PackageGrant) -> fmt::Result {
    write!(f, "    {keyword} {}", g.package)?;
    if !g.to.is_empty() {
        write!(f, " to {}", g.to.join(", "))?;
    }
    writeln!(f, ";")
}

impl fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.open {
            write!(f, "open ")?;
        }
        writeln!(f, "module {} {{", self.name)?;
        for r in &self.requires {
            write!(f, "    requires ")?;
            if r.transitive {
                write!(f, "transitive ")?;
            }
            if r.is_static {
                write!(f, "static ")?;
            }
            writeln!(f, "{};", r.module)?;
        }
        for e in &self.exports {
            grant(f, "exports", e)?;
        }
        for o in &self.opens {
            grant(f, "opens", o)?;
        }
        for u in &self.uses {
            writeln!(f, "    uses {u};")?;
        }
        for p in &self.provides {
            writeln!(f, "    provides {} with {};", p.service, p.with.join(", "))?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_exports_only_reach_their_targets() {
        let info = ModuleInfo {
            name: "com.acme.app".into(),
            exports: vec![
                PackageGrant {
                    package: "com.acme.api".into(),
                    to: vec![],
                },
                PackageGrant {
                    package: "com.acme.spi".into(),
                    to: vec!["com.acme.plugins".into()],
                },
            ],
            ..Default::default()
        };
        assert!(info.exports_to("com.acme.api", "anyone"));
        assert!(info.exports_to("com.acme.spi", "com.acme.plugins"));
        assert!(!info.exports_to("com.acme.spi", "anyone"));
        assert!(!info.exports_to("com.acme.internal", "com.acme.plugins"));
    }

    #[test]
    fn modules_print_as_declarations() {
        let info = ModuleInfo {
            name: "m".into(),
            open: true,
            requires: vec![Requires {
                module: "java.sql".into(),
                transitive: true,
                is_static: false,
            }],
            uses: vec!["p.S".into()],
            provides: vec![Provides {
                service: "p.S".into(),
                with: vec!["p.A".into(), "p.B".into()],
            }],
            ..Default::default()
        };
        assert_eq!(
            info.to_string(),
            "open module m {\n    requires transitive java.sql;\n    uses p.S;\n    provides p.S with p.A, p.B;\n}"
        );
    }
}

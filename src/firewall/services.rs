// Zonekeeper - Service Definitions
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Lookup and parsing of firewalld service definition files.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{validate_zone_name, Port, ServiceInfo};

/// Directories searched for `<name>.xml`, most specific first.
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    dirs: Vec<PathBuf>,
}

impl ServiceCatalog {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Read and parse the definition of `name`; user overrides win.
    pub fn lookup(&self, name: &str) -> Result<ServiceInfo> {
        validate_zone_name(name)?;
        for dir in &self.dirs {
            let path = dir.join(format!("{name}.xml"));
            match fs::read_to_string(&path) {
                Ok(xml) => {
                    debug!("Loaded service {} from {}", name, path.display());
                    return parse_service_definition(name, &xml);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => warn!("Failed to read {}: {}", path.display(), e),
            }
        }
        Err(Error::NotFound(format!("service definition '{name}'")))
    }
}

/// Parse a `<service>` definition document.
pub fn parse_service_definition(name: &str, xml: &str) -> Result<ServiceInfo> {
    if !xml.contains("<service") {
        return Err(Error::Decode {
            field: format!("service definition '{name}'"),
            found: "document without <service> element".to_string(),
        });
    }

    let mut info = ServiceInfo::new(name);
    let mut rest = xml;

    while let Some(start) = rest.find('<') {
        rest = &rest[start + 1..];
        if let Some(body) = rest.strip_prefix("!--") {
            let Some(end) = body.find("-->") else { break };
            rest = &body[end + 3..];
            continue;
        }
        if let Some(body) = rest.strip_prefix("![CDATA[") {
            let Some(end) = body.find("]]>") else { break };
            rest = &body[end + 3..];
            continue;
        }
        let Some(end) = rest.find('>') else { break };
        let tag = &rest[..end];
        rest = &rest[end + 1..];

        if tag.starts_with('?') || tag.starts_with('!') || tag.starts_with('/') {
            continue;
        }

        let tag = tag.trim_end_matches('/');
        let (element, attrs) = match tag.split_once(char::is_whitespace) {
            Some((e, a)) => (e, a),
            None => (tag, ""),
        };

        match element {
            "short" | "description" => {
                let close = format!("</{element}>");
                if let Some(text_end) = rest.find(&close) {
                    let text = text_content(&rest[..text_end]);
                    if element == "short" {
                        info.short = text.trim().to_string();
                    } else {
                        info.description = collapse_whitespace(&text);
                    }
                    rest = &rest[text_end + close.len()..];
                }
            }
            "port" | "source-port" => {
                let (Some(port), Some(proto)) = (attr(attrs, "port"), attr(attrs, "protocol")) else {
                    warn!("Service {}: <{}> without port or protocol", name, element);
                    continue;
                };
                match Port::from_wire(&port, &proto) {
                    Ok(p) if element == "port" => info.ports.push(p),
                    Ok(p) => info.source_ports.push(p),
                    Err(e) => warn!("Service {}: skipping {}: {}", name, element, e),
                }
            }
            "protocol" => info.protocols.extend(attr(attrs, "value")),
            "module" | "helper" => info.modules.extend(attr(attrs, "name")),
            "include" => info.includes.extend(attr(attrs, "service")),
            "destination" => {
                for family in ["ipv4", "ipv6"] {
                    if let Some(addr) = attr(attrs, family) {
                        info.destinations.push((family.to_string(), addr));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(info)
}

/// Value of `key="..."` (or single-quoted) inside a tag's attribute text.
fn attr(attrs: &str, key: &str) -> Option<String> {
    let mut rest = attrs;
    while let Some(pos) = rest.find(key) {
        let before_ok = pos == 0 || rest[..pos].ends_with(char::is_whitespace);
        let after = rest[pos + key.len()..].trim_start();
        if before_ok {
            if let Some(after_eq) = after.strip_prefix('=') {
                let after_eq = after_eq.trim_start();
                let quote = after_eq.chars().next()?;
                if quote == '"' || quote == '\'' {
                    let value = &after_eq[1..];
                    let close = value.find(quote)?;
                    return Some(unescape(&value[..close]));
                }
            }
        }
        rest = &rest[pos + key.len()..];
    }
    None
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Character data of an element: entities decoded, CDATA unwrapped, comments dropped.
fn text_content(raw: &str) -> String {
    let mut out = String::new();
    let mut rest = raw;
    while let Some(start) = rest.find("<!") {
        out.push_str(&unescape(&rest[..start]));
        let tail = &rest[start..];
        if let Some(body) = tail.strip_prefix("<![CDATA[") {
            let end = body.find("]]>").unwrap_or(body.len());
            out.push_str(&body[..end]);
            rest = body.get(end + 3..).unwrap_or("");
        } else if let Some(body) = tail.strip_prefix("<!--") {
            rest = body.find("-->").map_or("", |end| &body[end + 3..]);
        } else {
            out.push_str("<!");
            rest = &tail[2..];
        }
    }
    out.push_str(&unescape(rest));
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::Protocol;

    const MDNS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<service>
  <short>mDNS</short>
  <description>mDNS provides the ability to use DNS programming interfaces
  and packet formats on a local link &amp; network.</description>
  <port port="5353" protocol="udp"/>
  <destination ipv4="224.0.0.251" ipv6="ff02::fb"/>
</service>
"#;

    #[test]
    fn test_parse_mdns() {
        let info = parse_service_definition("mdns", MDNS).unwrap();
        assert_eq!(info.short, "mDNS");
        assert!(info.description.starts_with("mDNS provides"));
        assert!(info.description.ends_with("local link & network."));
        assert_eq!(info.ports, vec![Port::new("5353", Protocol::Udp)]);
        assert_eq!(
            info.destinations,
            vec![
                ("ipv4".to_string(), "224.0.0.251".to_string()),
                ("ipv6".to_string(), "ff02::fb".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_helpers_and_includes() {
        let xml = r#"<service>
  <short>FTP</short>
  <port protocol="tcp" port="21"/>
  <source-port protocol='udp' port='68'/>
  <protocol value="gre"/>
  <helper name="ftp"/>
  <include service="ftp-data"/>
</service>"#;
        let info = parse_service_definition("ftp", xml).unwrap();
        assert_eq!(info.ports, vec![Port::new("21", Protocol::Tcp)]);
        assert_eq!(info.source_ports, vec![Port::new("68", Protocol::Udp)]);
        assert_eq!(info.protocols, vec!["gre"]);
        assert_eq!(info.modules, vec!["ftp"]);
        assert_eq!(info.includes, vec!["ftp-data"]);
    }

    #[test]
    fn test_comments_and_cdata() {
        let xml = r#"<service>
  <!-- a > b <port port="9" protocol="tcp"/> -->
  <short>Demo<!-- old name --></short>
  <description><![CDATA[Serves <port> & more]]> plus &amp; text<!-- x > y --></description>
  <port port="8080" protocol="tcp"/>
</service>"#;
        let info = parse_service_definition("demo", xml).unwrap();
        assert_eq!(info.short, "Demo");
        assert_eq!(info.description, "Serves <port> & more plus & text");
        assert_eq!(info.ports, vec![Port::new("8080", Protocol::Tcp)]);
    }

    #[test]
    fn test_rejects_non_service_document() {
        assert!(parse_service_definition("x", "<zone><short>x</short></zone>").is_err());
    }

    #[test]
    fn test_lookup_prefers_first_directory() {
        let user = tempfile::tempdir().unwrap();
        let system = tempfile::tempdir().unwrap();
        fs::write(system.path().join("mdns.xml"), MDNS).unwrap();
        fs::write(
            user.path().join("mdns.xml"),
            "<service><short>Local mDNS</short></service>",
        )
        .unwrap();

        let catalog = ServiceCatalog::new(vec![user.path().into(), system.path().into()]);
        assert_eq!(catalog.lookup("mdns").unwrap().short, "Local mDNS");

        fs::remove_file(user.path().join("mdns.xml")).unwrap();
        assert_eq!(catalog.lookup("mdns").unwrap().short, "mDNS");
        assert!(matches!(catalog.lookup("nope"), Err(Error::NotFound(_))));
        assert!(catalog.lookup("../etc/passwd").is_err());
    }
}

//! git-config style text, the payload format of every blob the sync writes.
//!
//! ```text
//! [account]
//! 	fullName = Jane Doe
//! 	preferredEmail = jane@example.com
//! ```
//!
//! Only the subset needed here is supported: sections with an optional
//! quoted subsection, `key = value` lines, `#`/`;` comments and quoted or
//! escaped values. Output is deterministic, so equal content always encodes
//! to equal bytes.

use std::fmt::Write as _;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// Section headers are single lines; a subsection holding a newline or
    /// NUL has no encoding.
    #[error("subsection {0:?} contains a newline or NUL")]
    InvalidSubsection(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub subsection: Option<String>,
    pub entries: Vec<(String, String)>,
}

impl Section {
    fn matches(&self, name: &str, subsection: Option<&str>) -> bool {
        self.name.eq_ignore_ascii_case(name) && self.subsection.as_deref() == subsection
    }
}

/// An ordered collection of sections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigFile {
    sections: Vec<Section>,
}

impl ConfigFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Set `key` in the given section, creating the section on first use and
    /// replacing an earlier value of the same key.
    pub fn set(
        &mut self,
        section: &str,
        subsection: Option<&str>,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        if let Some(sub) = subsection.filter(|s| s.contains(['\n', '\0'])) {
            return Err(ConfigError::InvalidSubsection(sub.to_string()));
        }
        let index = match self.sections.iter().position(|s| s.matches(section, subsection)) {
            Some(index) => index,
            None => {
                self.sections.push(Section {
                    name: section.to_string(),
                    subsection: subsection.map(str::to_string),
                    entries: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        let entries = &mut self.sections[index].entries;
        match entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Last value of `key` in the given section. Keys and section names
    /// compare case-insensitively, subsections exactly.
    pub fn get(&self, section: &str, subsection: Option<&str>, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .filter(|s| s.matches(section, subsection))
            .flat_map(|s| s.entries.iter())
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .last()
    }

    /// Subsection names present under `section`, in file order.
    pub fn subsections<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.sections
            .iter()
            .filter(move |s| s.name.eq_ignore_ascii_case(section))
            .filter_map(|s| s.subsection.as_deref())
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            match &section.subsection {
                Some(sub) => {
                    let _ = writeln!(out, "[{} \"{}\"]", section.name, escape_subsection(sub));
                }
                None => {
                    let _ = writeln!(out, "[{}]", section.name);
                }
            }
            for (key, value) in &section.entries {
                let _ = writeln!(out, "\t{key} = {}", escape_value(value));
            }
        }
        out
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = ConfigFile::new();
        let mut current: Option<usize> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let fail = |reason: &str| ConfigError::Parse {
                line: line_no,
                reason: reason.to_string(),
            };
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let header = header
                    .strip_suffix(']')
                    .ok_or_else(|| fail("unterminated section header"))?;
                let (name, subsection) = match header.split_once(char::is_whitespace) {
                    Some((name, rest)) => {
                        let quoted = rest
                            .trim()
                            .strip_prefix('"')
                            .and_then(|r| r.strip_suffix('"'))
                            .ok_or_else(|| fail("subsection must be quoted"))?;
                        (name, Some(unescape_subsection(quoted)))
                    }
                    None => (header, None),
                };
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.') {
                    return Err(fail("invalid section name"));
                }
                config.sections.push(Section {
                    name: name.to_string(),
                    subsection,
                    entries: Vec::new(),
                });
                current = Some(config.sections.len() - 1);
                continue;
            }

            let index = current.ok_or_else(|| fail("entry outside of any section"))?;
            let (key, value) = match line.split_once('=') {
                Some((key, value)) => (key.trim(), parse_value(value).map_err(|r| fail(r))?),
                // A bare key is boolean true.
                None => (line, "true".to_string()),
            };
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(fail("invalid key"));
            }
            config.sections[index].entries.push((key.to_string(), value));
        }
        Ok(config)
    }
}

fn escape_subsection(sub: &str) -> String {
    sub.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unescape_subsection(sub: &str) -> String {
    let mut out = String::with_capacity(sub.len());
    let mut chars = sub.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    let needs_quotes = value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.contains(['#', ';']);
    let mut out = String::with_capacity(value.len() + 2);
    if needs_quotes {
        out.push('"');
    }
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    if needs_quotes {
        out.push('"');
    }
    out
}

fn parse_value(raw: &str) -> Result<String, &'static str> {
    let mut out = String::new();
    let mut in_quotes = false;
    let mut pending_space = String::new();
    let mut chars = raw.trim_start().chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push_str(&pending_space);
                pending_space.clear();
                in_quotes = !in_quotes;
            }
            '\\' => {
                out.push_str(&pending_space);
                pending_space.clear();
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('b') => {
                        out.pop();
                    }
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    _ => return Err("invalid escape sequence"),
                }
            }
            '#' | ';' if !in_quotes => break,
            c if c.is_whitespace() && !in_quotes => pending_space.push(c),
            c => {
                out.push_str(&pending_space);
                pending_space.clear();
                out.push(c);
            }
        }
    }
    if in_quotes {
        return Err("unterminated quoted value");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_account_section() {
        let mut config = ConfigFile::new();
        config.set("account", None, "fullName", "Jane Doe").unwrap();
        config.set("account", None, "preferredEmail", "jane@example.com").unwrap();
        assert_eq!(
            config.encode(),
            "[account]\n\tfullName = Jane Doe\n\tpreferredEmail = jane@example.com\n"
        );
    }

    #[test]
    fn encodes_subsection_with_escapes() {
        let mut config = ConfigFile::new();
        config.set("externalId", Some("gerrit:\"odd\\name\""), "accountId", "7").unwrap();
        assert_eq!(
            config.encode(),
            "[externalId \"gerrit:\\\"odd\\\\name\\\"\"]\n\taccountId = 7\n"
        );
    }

    #[test]
    fn set_replaces_existing_key() {
        let mut config = ConfigFile::new();
        config.set("account", None, "fullName", "A").unwrap();
        config.set("account", None, "fullname", "B").unwrap();
        assert_eq!(config.get("account", None, "fullName"), Some("B"));
        assert_eq!(config.sections()[0].entries.len(), 1);
    }

    #[test]
    fn awkward_values_survive_parse() {
        let values = [
            "plain",
            " leading space",
            "trailing space ",
            "has # hash",
            "semi;colon",
            "quote \" inside",
            "back\\slash",
            "multi\nline\tand tab",
            "",
        ];
        for value in values {
            let mut config = ConfigFile::new();
            config.set("externalId", Some("mailto:a@x"), "email", value).unwrap();
            let parsed = ConfigFile::parse(&config.encode()).unwrap();
            assert_eq!(
                parsed.get("externalId", Some("mailto:a@x"), "email"),
                Some(value),
                "value {value:?}"
            );
        }
    }

    #[test]
    fn parses_handwritten_config() {
        let text = r#"
# comment
[account]
    fullName = Jane   Doe   ; trailing comment
    active
[externalId "username:jane"]
    accountId = 1000096
"#;
        let config = ConfigFile::parse(text).unwrap();
        assert_eq!(config.get("account", None, "fullName"), Some("Jane   Doe"));
        assert_eq!(config.get("account", None, "active"), Some("true"));
        assert_eq!(
            config.get("externalId", Some("username:jane"), "accountId"),
            Some("1000096")
        );
        assert_eq!(
            config.subsections("externalId").collect::<Vec<_>>(),
            vec!["username:jane"]
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            ConfigFile::parse("key = v"),
            Err(ConfigError::Parse { line: 1, .. })
        ));
        assert!(ConfigFile::parse("[account\n").is_err());
        assert!(ConfigFile::parse("[externalId unquoted]\n").is_err());
        assert!(ConfigFile::parse("[a]\n\tk = \"open\n").is_err());
        assert!(ConfigFile::parse("[a]\n\tk = bad\\q\n").is_err());
    }

    #[test]
    fn set_rejects_unencodable_subsection() {
        let mut config = ConfigFile::new();
        assert_eq!(
            config.set("externalId", Some("mailto:a@x\n[account]"), "accountId", "7"),
            Err(ConfigError::InvalidSubsection("mailto:a@x\n[account]".to_string()))
        );
        assert!(config.set("externalId", Some("nul\0key"), "accountId", "7").is_err());
        assert!(config.sections().is_empty());
        assert_eq!(config.encode(), "");
    }

    #[test]
    fn encoding_is_deterministic() {
        let build = || {
            let mut config = ConfigFile::new();
            config.set("externalId", Some("username:a"), "accountId", "7").unwrap();
            config.set("externalId", Some("username:a"), "email", "a@x").unwrap();
            config.encode()
        };
        assert_eq!(build(), build());
    }
}

use std::collections::HashMap;

/// A parsed IRC line, including IRCv3 message tags.
///
/// Format: `[@tags] [:<prefix>] <command> [<params>] [:<trailing>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return None;
        }

        let (tags, rest) = match line.strip_prefix('@') {
            Some(stripped) => {
                let space = stripped.find(' ')?;
                (parse_tags(&stripped[..space]), stripped[space + 1..].trim_start())
            }
            None => (HashMap::new(), line),
        };

        let (prefix, rest) = match rest.strip_prefix(':') {
            Some(stripped) => {
                let space = stripped.find(' ')?;
                (Some(stripped[..space].to_string()), &stripped[space + 1..])
            }
            None => (None, rest),
        };

        let (params_part, trailing) = match rest.find(" :") {
            Some(colon) => (&rest[..colon], Some(&rest[colon + 2..])),
            None => (rest, None),
        };

        let mut parts = params_part.split_whitespace();
        let command = parts.next()?.to_uppercase();
        let mut params: Vec<String> = parts.map(str::to_string).collect();
        if let Some(t) = trailing {
            params.push(t.to_string());
        }

        Some(Self {
            tags,
            prefix,
            command,
            params,
        })
    }

    /// Nickname from the prefix (`nick!user@host` → `nick`).
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        let nick = &prefix[..prefix.find('!').unwrap_or(prefix.len())];
        (!nick.is_empty()).then_some(nick)
    }

    /// Tag value, with empty values treated as absent.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

fn parse_tags(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once('=') {
            Some((k, v)) => (k.to_string(), unescape_tag(v)),
            None => (t.to_string(), String::new()),
        })
        .collect()
}

fn unescape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

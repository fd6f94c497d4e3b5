//! Parsing and rebuilding of the proxy service's `ExecStart=` command line.
//!
//! The command line is tokenized with shell quoting rules. Secret flag pairs
//! (`-S <hex>` / `--secret <hex>`) are lifted out into an ordered list; every
//! other token is preserved verbatim so a rebuild only ever touches the
//! secret set.

use crate::{Error, Result};

const EXEC_START_PREFIX: &str = "ExecStart=";

/// Semantic view of the proxy's command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Every token except secret flag pairs, in original order.
    pub remainder: Vec<String>,
    /// Secret tokens in the order they appear, without duplicates.
    pub secrets: Vec<String>,
    /// Listening port, when the command line carries `-p`/`--port`.
    pub port: Option<u16>,
    /// Fake-TLS domain, when the command line carries `-D`/`--domain`.
    pub tls_domain: Option<String>,
}

/// Split a command line into tokens, honoring single quotes, double quotes
/// and backslash escapes.
pub fn split_tokens(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;
    // Distinguishes an empty pending token ('' or "") from no token at all.
    let mut pending = false;

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if !in_single => {
                pending = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '\'' if !in_double => {
                pending = true;
                in_single = !in_single;
            }
            '"' if !in_single => {
                pending = true;
                in_double = !in_double;
            }
            c if c.is_whitespace() && !in_single && !in_double => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                pending = true;
                current.push(c);
            }
        }
    }

    if in_single || in_double {
        return Err(Error::malformed("unbalanced quote in command line"));
    }

    if pending {
        tokens.push(current);
    }

    Ok(tokens)
}

/// Shell-quote a single token so it survives a round-trip through
/// [`split_tokens`].
pub fn quote(token: &str) -> String {
    if !token.is_empty() && token.chars().all(is_plain_char) {
        return token.to_string();
    }
    // Single-quote, with embedded single quotes spliced out.
    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('\'');
    for ch in token.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

fn is_plain_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/' | ':' | '=' | '@' | '%' | ',' | '+')
}

/// Parse an `ExecStart` command line into its semantic fields.
///
/// Secret flag pairs are consumed into `secrets` (first occurrence wins on
/// duplicates). Port and fake-TLS flags are recorded but their tokens stay in
/// the remainder, so a rebuild does not reorder them.
pub fn parse_exec_line(line: &str) -> Result<ExecConfig> {
    let tokens = split_tokens(line)?;

    let mut remainder = Vec::new();
    let mut secrets: Vec<String> = Vec::new();
    let mut port = None;
    let mut tls_domain = None;

    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        match token.as_str() {
            "-S" | "--secret" => {
                let value = iter
                    .next()
                    .ok_or_else(|| Error::malformed(format!("flag {token} is missing a value")))?;
                if !secrets.contains(&value) {
                    secrets.push(value);
                }
            }
            "-p" | "--port" => {
                if let Some(value) = iter.peek() {
                    port = value.parse::<u16>().ok();
                }
                remainder.push(token);
            }
            "-D" | "--domain" => {
                if let Some(value) = iter.peek() {
                    tls_domain = Some(value.clone());
                }
                remainder.push(token);
            }
            _ => remainder.push(token),
        }
    }

    Ok(ExecConfig {
        remainder,
        secrets,
        port,
        tls_domain,
    })
}

/// Rebuild a command line: remainder tokens first, then one `-S <secret>`
/// pair per secret.
///
/// A port is only appended when `port` is set and the remainder does not
/// already carry a port flag; callers that changed the port must strip the
/// old flag from the remainder first.
pub fn build_exec_line(cfg: &ExecConfig) -> String {
    let mut parts: Vec<String> = cfg.remainder.iter().map(|t| quote(t)).collect();

    if let Some(port) = cfg.port {
        let has_port_flag = cfg
            .remainder
            .iter()
            .any(|t| t == "-p" || t == "--port");
        if !has_port_flag {
            parts.push("-p".to_string());
            parts.push(port.to_string());
        }
    }

    for secret in &cfg.secrets {
        parts.push("-S".to_string());
        parts.push(quote(secret));
    }

    parts.join(" ")
}

/// Extract the command line from a systemd unit's `ExecStart=` line.
pub fn exec_start(unit: &str) -> Result<&str> {
    unit.lines()
        .find_map(|line| line.strip_prefix(EXEC_START_PREFIX))
        .map(str::trim)
        .filter(|cmd| !cmd.is_empty())
        .ok_or_else(|| Error::malformed("no ExecStart line in unit file"))
}

/// Replace the unit's `ExecStart=` line with a new command, passing every
/// other line through unchanged.
pub fn replace_exec_start(unit: &str, new_command: &str) -> Result<String> {
    if exec_start(unit).is_err() {
        return Err(Error::malformed("no ExecStart line in unit file"));
    }

    let trailing_newline = unit.ends_with('\n');
    let mut lines: Vec<String> = Vec::new();
    for line in unit.lines() {
        if line.starts_with(EXEC_START_PREFIX) {
            lines.push(format!("{EXEC_START_PREFIX}{new_command}"));
        } else {
            lines.push(line.to_string());
        }
    }

    let mut out = lines.join("\n");
    if trailing_newline {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: &str = "[Unit]\nDescription=MTProxy\n\n[Service]\nExecStart=/usr/bin/mtproto-proxy -u nobody -p 443 -H 443 -S deadbeef --aes-pwd /etc/proxy-secret\nRestart=on-failure\n";

    #[test]
    fn splits_quoted_tokens() {
        let tokens = split_tokens(r#"/usr/bin/proxy --name 'my proxy' -S "abc def" plain\ arg"#)
            .unwrap();
        assert_eq!(
            tokens,
            vec!["/usr/bin/proxy", "--name", "my proxy", "-S", "abc def", "plain arg"]
        );
    }

    #[test]
    fn split_rejects_unbalanced_quote() {
        let err = split_tokens("/usr/bin/proxy 'oops").unwrap_err();
        assert!(matches!(err, Error::MalformedConfig(_)));
    }

    #[test]
    fn split_keeps_empty_quoted_token() {
        let tokens = split_tokens("cmd '' tail").unwrap();
        assert_eq!(tokens, vec!["cmd", "", "tail"]);
    }

    #[test]
    fn quote_round_trips_special_chars() {
        for raw in ["plain", "has space", "it's", "a\"b", "", "tab\there"] {
            let quoted = quote(raw);
            let tokens = split_tokens(&quoted).unwrap();
            assert_eq!(tokens, vec![raw.to_string()], "token {raw:?}");
        }
    }

    #[test]
    fn parses_secrets_in_order() {
        let cfg = parse_exec_line("/usr/bin/proxy -S aaaa -p 443 -S bbbb --secret cccc").unwrap();
        assert_eq!(cfg.secrets, vec!["aaaa", "bbbb", "cccc"]);
        assert_eq!(cfg.port, Some(443));
        assert_eq!(cfg.remainder, vec!["/usr/bin/proxy", "-p", "443"]);
    }

    #[test]
    fn parse_dedups_secrets() {
        let cfg = parse_exec_line("/usr/bin/proxy -S aaaa -S aaaa -S bbbb").unwrap();
        assert_eq!(cfg.secrets, vec!["aaaa", "bbbb"]);
    }

    #[test]
    fn parse_records_tls_domain() {
        let cfg = parse_exec_line("/usr/bin/proxy -D example.com -S aaaa").unwrap();
        assert_eq!(cfg.tls_domain.as_deref(), Some("example.com"));
        assert_eq!(cfg.remainder, vec!["/usr/bin/proxy", "-D", "example.com"]);
    }

    #[test]
    fn parse_rejects_dangling_secret_flag() {
        let err = parse_exec_line("/usr/bin/proxy -S").unwrap_err();
        assert!(matches!(err, Error::MalformedConfig(_)));
    }

    #[test]
    fn build_does_not_duplicate_port() {
        let cfg = parse_exec_line("/usr/bin/proxy -p 8443 -S aaaa").unwrap();
        let rebuilt = build_exec_line(&cfg);
        assert_eq!(rebuilt.matches("-p").count(), 1);
        assert_eq!(rebuilt, "/usr/bin/proxy -p 8443 -S aaaa");
    }

    #[test]
    fn build_appends_port_when_remainder_lost_it() {
        let cfg = ExecConfig {
            remainder: vec!["/usr/bin/proxy".into()],
            secrets: vec!["aaaa".into()],
            port: Some(9443),
            tls_domain: None,
        };
        assert_eq!(build_exec_line(&cfg), "/usr/bin/proxy -p 9443 -S aaaa");
    }

    #[test]
    fn parse_build_parse_round_trip() {
        let original = "/usr/bin/mtproto-proxy -u nobody -p 443 -H 443 -S aaaa -S bbbb --aes-pwd '/etc/with space/secret'";
        let first = parse_exec_line(original).unwrap();
        let rebuilt = build_exec_line(&first);
        let second = parse_exec_line(&rebuilt).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn extracts_exec_start() {
        let cmd = exec_start(UNIT).unwrap();
        assert!(cmd.starts_with("/usr/bin/mtproto-proxy"));
    }

    #[test]
    fn exec_start_missing_is_malformed() {
        let err = exec_start("[Unit]\nDescription=empty\n").unwrap_err();
        assert!(matches!(err, Error::MalformedConfig(_)));
    }

    #[test]
    fn replaces_only_the_exec_line() {
        let replaced = replace_exec_start(UNIT, "/usr/bin/mtproto-proxy -S ffff").unwrap();
        assert!(replaced.contains("ExecStart=/usr/bin/mtproto-proxy -S ffff"));
        assert!(replaced.contains("Description=MTProxy"));
        assert!(replaced.contains("Restart=on-failure"));
        assert!(replaced.ends_with('\n'));
        assert_eq!(replaced.lines().count(), UNIT.lines().count());
    }
}

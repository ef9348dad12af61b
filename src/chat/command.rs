#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ParsedCommand {
    pub(crate) command: String,
    pub(crate) args: Vec<String>,
}

impl ParsedCommand {
    pub(crate) fn rest(&self) -> String {
        self.args.join(" ")
    }
}

/// Splits `/word rest...` into a command token and whitespace-separated args.
/// Anything not starting with `/` is plain chat text.
pub(crate) fn parse_command(input: &str) -> Option<ParsedCommand> {
    let body = input.strip_prefix('/')?;
    let mut tokens = body.split_whitespace().map(str::to_string);
    let command = tokens.next().unwrap_or_default();
    Some(ParsedCommand {
        command,
        args: tokens.collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command(" /bot leading space"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn extra_whitespace_is_collapsed() {
        let parsed = parse_command("/bot  hello   world").expect("command");
        assert_eq!(parsed.command, "bot");
        assert_eq!(parsed.args, ["hello", "world"]);
        assert_eq!(parsed.rest(), "hello world");
    }

    #[test]
    fn command_case_is_preserved() {
        let parsed = parse_command("/HeLp").expect("command");
        assert_eq!(parsed.command, "HeLp");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn bare_slash_yields_empty_command() {
        let parsed = parse_command("/").expect("command");
        assert_eq!(parsed.command, "");
        assert!(parsed.args.is_empty());
    }
}

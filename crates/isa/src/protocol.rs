//! Handshake text exchanged before a program is accepted.
//!
//! After connecting, the target prints [`GREETING`] in order, then
//! [`LENGTH_PROMPT`]. The client answers with the decimal program length on
//! one line, waits for [`BYTECODE_PROMPT`] and sends the raw program bytes.

/// Banner art printed first on every connection.
pub const BANNER: &str = concat!(
    "Go program your\n",
    "                  __\n",
    "                 /  \\\n",
    "           .-.  |    |\n",
    "   *    _.-'  \\  \\__/\n",
    "    \\.-'       \\\n",
    "   /          _/\n",
    "  |      _  /\"\n",
    "  |     /_\\'\n",
    "   \\    \\_/\n",
    "    \"\"\"\"\n",
);

/// Greeting blocks, each expected verbatim with nothing in between.
pub const GREETING: [&str; 3] = [
    BANNER,
    "Give me your bytecode!\n",
    "I will load the cannon and execute it.\n",
];

pub const LENGTH_PROMPT: &str = "Length:\n";

pub const BYTECODE_PROMPT: &str = "Bytecode:\n";

/// Line printed by `writefile` on success, newline excluded.
pub const FILE_WRITTEN: &str = "file written";

/// Parses a length line the way the target does: leading decimal digits,
/// anything after them ignored, zero when there are none.
pub fn parse_length_line(line: &[u8]) -> usize {
    let text = String::from_utf8_lossy(line);
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_shape() {
        assert!(BANNER.starts_with("Go program your\n"));
        assert!(BANNER.ends_with("\"\"\"\"\n"));
        assert_eq!(BANNER.lines().count(), 11);
    }

    #[test]
    fn test_parse_length_line() {
        assert_eq!(parse_length_line(b"42\n"), 42);
        assert_eq!(parse_length_line(b"  17abc\n"), 17);
        assert_eq!(parse_length_line(b"nope\n"), 0);
    }
}

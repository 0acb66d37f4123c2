pub mod command;
pub mod scan;

pub use command::{parse_command, ParsedCommand};

/// Longest possible well-formed command ("PX 1234 1234 rrggbbaa\n"). Used to
/// size carry buffers with headroom.
pub const PARSER_LOOKAHEAD: usize = "PX 1234 1234 rrggbbaa\n".len();

#[cfg(test)]
mod tests {
    use super::PARSER_LOOKAHEAD;

    #[test]
    fn lookahead_matches_longest_command() {
        assert_eq!(PARSER_LOOKAHEAD, 22);
    }
}

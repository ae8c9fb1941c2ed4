use std::error::Error;
use std::fmt::Write;

const MAX_CHAIN_LINES: usize = 8;

/// Formats an error and its `source()` chain as numbered lines
/// (`0:`, `1:`, ...). Consecutive identical messages are shown once.
pub fn format_error_chain(error: &dyn Error) -> String {
    let mut message = String::new();
    let mut display_count = 0;
    let mut past_message: Option<String> = None;

    let mut maybe_error = Some(error);
    while let Some(current) = maybe_error {
        maybe_error = current.source();

        let current_message = current.to_string();
        if past_message.as_ref() == Some(&current_message) {
            continue;
        }
        if display_count >= MAX_CHAIN_LINES {
            message.push_str("\n    ...");
            break;
        }

        for (index, line) in current_message.lines().enumerate() {
            if index == 0 {
                let _ = write!(message, "\n    {display_count}: {line}");
            } else {
                let _ = write!(message, "\n       {line}");
            }
        }
        past_message = Some(current_message);
        display_count += 1;
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Chained {
        message: &'static str,
        source: Option<Box<Chained>>,
    }

    impl fmt::Display for Chained {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl Error for Chained {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            self.source.as_deref().map(|source| source as &(dyn Error + 'static))
        }
    }

    fn chain(messages: &[&'static str]) -> Chained {
        let mut error: Option<Chained> = None;
        for &message in messages.iter().rev() {
            error = Some(Chained {
                message,
                source: error.map(Box::new),
            });
        }
        error.unwrap_or(Chained {
            message: "",
            source: None,
        })
    }

    #[test]
    fn test_numbers_each_message() {
        let error = chain(&["Cannot find module './a'", "Module not found"]);
        assert_eq!(
            format_error_chain(&error),
            "\n    0: Cannot find module './a'\n    1: Module not found"
        );
    }

    #[test]
    fn test_collapses_repeats() {
        let error = chain(&["boom", "boom", "root"]);
        assert_eq!(format_error_chain(&error), "\n    0: boom\n    1: root");
    }

    #[test]
    fn test_limits_depth() {
        let messages: Vec<&'static str> = vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
        let output = format_error_chain(&chain(&messages));
        assert!(output.ends_with("\n    7: h\n    ..."));
    }

    #[test]
    fn test_indents_multiline_messages() {
        let error = chain(&["first line\nsecond line"]);
        assert_eq!(
            format_error_chain(&error),
            "\n    0: first line\n       second line"
        );
    }
}

//! Interactive confirmation prompts

use console::Term;
use std::io::BufRead;

/// Ask a yes/no question; anything but `y`/`yes` is a no
///
/// The question goes to the terminal and the answer is read from stdin, so
/// answers piped in by scripts are honored.
pub fn confirm(question: &str) -> bool {
    let term = Term::stdout();
    if term.write_str(&format!("{} [y/N] ", question)).is_err() || term.flush().is_err() {
        return false;
    }
    read_answer(&mut std::io::stdin().lock())
}

/// Read one line of input; end of input or a read error is a no
fn read_answer(input: &mut impl BufRead) -> bool {
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => is_yes(&answer),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" Y \n"));
        assert!(is_yes("yes"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("sure"));
    }

    #[test]
    fn test_read_answer_consumes_one_line_per_question() {
        let mut input = Cursor::new(b"y\nno\nYES\n".to_vec());
        assert!(read_answer(&mut input));
        assert!(!read_answer(&mut input));
        assert!(read_answer(&mut input));
        assert!(!read_answer(&mut input));
    }

    #[test]
    fn test_read_answer_without_trailing_newline() {
        assert!(read_answer(&mut Cursor::new(b"y".to_vec())));
        assert!(!read_answer(&mut Cursor::new(Vec::new())));
    }
}

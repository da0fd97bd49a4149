#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    #[error("trailing backslash")]
    TrailingEscape,
}

/// Split a command line into words.
///
/// Words are separated by whitespace. Single or double quotes group a run
///  of characters, spaces included, into one word; a backslash outside
///  single quotes takes the next character literally. `""` is an empty
///  word.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut words = Vec::new();
    let mut current = String::new();
    // whether `current` holds a word, possibly empty
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        None => return Err(TokenizeError::UnterminatedQuote(c)),
                        Some(q) if q == c => break,
                        Some('\\') if c == '"' => match chars.next() {
                            Some(escaped) => current.push(escaped),
                            None => return Err(TokenizeError::UnterminatedQuote(c)),
                        },
                        Some(other) => current.push(other),
                    }
                }
            }
            '\\' => {
                in_word = true;
                current.push(chars.next().ok_or(TokenizeError::TrailingEscape)?);
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

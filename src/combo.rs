use crate::error::{Error, Result};
use crate::keys::{self, KeyStroke};
use std::fmt;

/// A validated key combination: keys held down in order, then one terminal
/// key or wheel action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combo {
    pub held: Vec<String>,
    pub terminal: String,
}

impl Combo {
    /// Splits, resolves aliases and validates a combo string such as
    /// `ctrl+shift+p`, `command++` or `alt+wheelup`.
    pub fn parse(combo: &str) -> Result<Combo> {
        let mut tokens: Vec<String> = split(combo)
            .into_iter()
            .map(|token| keys::resolve(&token).to_string())
            .collect();

        for (idx, token) in tokens.iter().enumerate() {
            let is_terminal = idx + 1 == tokens.len();
            let valid = match keys::stroke(token) {
                Some(KeyStroke::Wheel(_)) => is_terminal,
                Some(_) => true,
                None => false,
            };
            if !valid {
                return Err(Error::InvalidKey {
                    combo: combo.to_string(),
                    key: token.clone(),
                });
            }
        }

        let terminal = tokens.pop().ok_or_else(|| Error::EmptyCombo(combo.to_string()))?;
        Ok(Combo { held: tokens, terminal })
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.held.iter().map(String::as_str).chain(std::iter::once(self.terminal.as_str()))
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.tokens().collect();
        write!(f, "{}", tokens.join("+"))
    }
}

/// Breaks a combo string into lowercase key tokens without resolving them.
///
/// `+` separates keys, except where it can only be the `+` key itself: at the
/// start of the string or right after another separator. That literal `+`
/// always ends the combo, so `ctrl++` and `ctrl++a` are both `ctrl` and `+`.
/// A `+` that completes an alias (`numpad+`) stays part of that token.
pub fn split(combo: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut buffer = String::new();

    for ch in combo.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase) {
        if ch != '+' {
            buffer.push(ch);
            continue;
        }
        if buffer.is_empty() {
            tokens.push("+".to_string());
            return tokens;
        }
        let with_plus = format!("{buffer}+");
        if keys::resolve(&with_plus) != with_plus {
            buffer.push('+');
        } else {
            tokens.push(std::mem::take(&mut buffer));
        }
    }
    if !buffer.is_empty() {
        tokens.push(buffer);
    }
    tokens
}

/// Lowercase, whitespace-free spelling of a combo; aliases are kept.
pub fn normalize(combo: &str) -> String {
    split(combo).join("+")
}

/// Key used to recognise two spellings of the same combo. Falls back to
/// [`normalize`] when the combo does not validate.
pub fn canonical(combo: &str) -> String {
    match Combo::parse(combo) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => normalize(combo),
    }
}
